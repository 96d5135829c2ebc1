// Storefront API endpoint functions.
// Typed calls for the bakery backend's catalogue, banner and order routes.

use crate::error::Result;

use super::cancel::CancelToken;
use super::client::{ApiClient, GetOptions, MutationOptions};
use super::params::Params;
use super::transport::Transport;
use super::types::{
    Banner, Category, ContactNumber, DeliveryLocation, LocationList, Order, Product, ProductStatus,
};

/// Page size used by the search views.
pub const SEARCH_PAGE_SIZE: u32 = 12;

/// Upper bound of the price slider; a max at or above it is not sent.
pub const PRICE_CEILING: u32 = 10_000;

const FEATURED_BANNERS: &str = "/featured-banners";

/// Filters for product search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub text: String,
    pub category_id: Option<u64>,
    pub min_price: u32,
    pub max_price: Option<u32>,
    pub status: Option<ProductStatus>,
    pub offset: usize,
    pub limit: u32,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self {
            limit: SEARCH_PAGE_SIZE,
            ..Self::default()
        }
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn category(mut self, category_id: u64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn price_range(mut self, min: u32, max: u32) -> Self {
        self.min_price = min;
        self.max_price = Some(max);
        self
    }

    pub fn status(mut self, status: ProductStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Continue after the `offset` products already shown.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    fn endpoint(&self) -> String {
        format!("/products/search/{}", self.limit)
    }

    /// Query parameters, omitting filters left at their neutral value.
    pub fn to_params(&self) -> Params {
        let mut params = Params::new().with("offset", self.offset);

        let text = self.text.trim();
        if !text.is_empty() {
            params.insert("q", text);
        }
        if let Some(category_id) = self.category_id {
            params.insert("category_id", category_id);
        }
        if self.min_price > 0 {
            params.insert("min_price", self.min_price);
        }
        if let Some(max) = self.max_price.filter(|max| *max < PRICE_CEILING) {
            params.insert("max_price", max);
        }
        if let Some(status) = self.status {
            params.insert("status", status.as_str());
        }
        params
    }
}

impl<T: Transport> ApiClient<T> {
    /// Hand-picked products for the home page.
    pub async fn featured_products(&self) -> Result<Vec<Product>> {
        self.get_json("/featured", &Params::new(), GetOptions::new())
            .await
    }

    /// Newest products.
    pub async fn new_arrivals(&self, count: u32) -> Result<Vec<Product>> {
        self.get_json(&format!("/products/{}", count), &Params::new(), GetOptions::new())
            .await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.get_json("/categories", &Params::new(), GetOptions::new())
            .await
    }

    /// Products in a category.
    pub async fn category_products(&self, category_id: u64) -> Result<Vec<Product>> {
        self.get_json(
            &format!("/categories/{}", category_id),
            &Params::new(),
            GetOptions::new(),
        )
        .await
    }

    /// Search products. Pass the token from a `LatestRequest` so a newer
    /// search cancels this one.
    ///
    /// Searches always go to the network; the result still refreshes the cache.
    pub async fn search_products(
        &self,
        query: &ProductQuery,
        cancel: Option<CancelToken>,
    ) -> Result<Vec<Product>> {
        let options = GetOptions {
            force_refresh: true,
            cancel,
            ..GetOptions::new()
        };
        self.get_json(&query.endpoint(), &query.to_params(), options)
            .await
    }

    pub async fn featured_banners(&self) -> Result<Vec<Banner>> {
        self.get_json(FEATURED_BANNERS, &Params::new(), GetOptions::new())
            .await
    }

    /// Hero carousel banners.
    pub async fn hero_banners(&self) -> Result<Vec<Banner>> {
        self.get_json("/banner", &Params::new(), GetOptions::new())
            .await
    }

    /// Shop phone numbers, primary first.
    pub async fn contact_numbers(&self) -> Result<Vec<ContactNumber>> {
        self.get_json("/mobile-numbers", &Params::new(), GetOptions::new())
            .await
    }

    /// Cities with delivery and their shipping charge.
    pub async fn delivery_locations(&self) -> Result<Vec<DeliveryLocation>> {
        let list: LocationList = self
            .get_json("/locations", &Params::new(), GetOptions::new())
            .await?;
        Ok(list.locations)
    }

    /// Fetch an order for invoice rendering. Always read fresh.
    pub async fn order(&self, order_id: u64) -> Result<Order> {
        self.get_json(
            &format!("/orders/{}", order_id),
            &Params::new(),
            GetOptions::new().force_refresh(),
        )
        .await
    }

    /// Delete a featured banner and drop the cached banner list.
    pub async fn delete_featured_banner(&self, banner_id: u64) -> Result<()> {
        self.delete(
            &format!("/admin/banner/featured/{}", banner_id),
            MutationOptions::new(),
        )
        .await?;
        self.invalidate(FEATURED_BANNERS, &Params::new());
        Ok(())
    }
}
