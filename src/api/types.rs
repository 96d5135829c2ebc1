// Storefront API response types.
// Defines structs for deserializing the bakery backend's JSON payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Stock status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductStatus {
    InStock,
    #[default]
    OutOfStock,
    Deactive,
    #[serde(other)]
    Unknown,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::InStock => "in_stock",
            ProductStatus::OutOfStock => "out_of_stock",
            ProductStatus::Deactive => "deactive",
            ProductStatus::Unknown => "unknown",
        }
    }
}

/// A product as listed in the storefront.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub price: f64,
    #[serde(default, deserialize_with = "number_or_string")]
    pub discount_percentage: f64,
    #[serde(default, deserialize_with = "one_or_many")]
    pub images: Vec<String>,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: ProductStatus,
    #[serde(default)]
    pub category_id: Option<u64>,
}

impl Product {
    /// Price after the discount, rounded to cents.
    pub fn discounted_price(&self) -> f64 {
        let price = self.price * (1.0 - self.discount_percentage / 100.0);
        (price * 100.0).round() / 100.0
    }
}

/// Product category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub img: Option<String>,
}

/// Promotional banner.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Banner {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image_path: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A line of an order, used for invoices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub product_id: u64,
    #[serde(default)]
    pub name: Option<String>,
    pub quantity: u32,
    #[serde(deserialize_with = "number_or_string")]
    pub price: f64,
}

/// A customer order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: u64,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default, deserialize_with = "number_or_string")]
    pub total_amount: f64,
    pub created_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Sum of line totals.
    pub fn items_total(&self) -> f64 {
        self.items
            .iter()
            .map(|item| item.price * f64::from(item.quantity))
            .sum()
    }
}

/// Shop phone number shown in the header.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactNumber {
    #[serde(default)]
    pub id: Option<u64>,
    pub number: String,
}

/// A city the bakery delivers to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeliveryLocation {
    pub id: u64,
    pub city: String,
    #[serde(default, deserialize_with = "number_or_string")]
    pub shipping_charge: f64,
}

/// Envelope of the delivery locations route.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct LocationList {
    #[serde(default)]
    pub locations: Vec<DeliveryLocation>,
}

fn default_true() -> bool {
    true
}

/// Accept `12.5`, `"12.5"`, `null`; unparsable strings become 0.
fn number_or_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) => n,
        Some(Raw::Text(s)) => s.trim().parse().unwrap_or(0.0),
        None => 0.0,
    })
}

/// Accept a list of strings, a single string, or `null`.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Many(Vec<String>),
        One(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Many(items)) => items,
        Some(Raw::One(item)) if !item.is_empty() => vec![item],
        _ => Vec::new(),
    })
}

/// Missing or empty status means out of stock.
fn status_or_default<'de, D>(deserializer: D) -> Result<ProductStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ProductStatus>::deserialize(deserializer)?.unwrap_or_default())
}
