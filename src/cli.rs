// Command-line interface for storefront-fetch.
// Flags for one cached, retried request; they override STOREFRONT_* variables.

use std::time::Duration;

use clap::Parser;
use serde_json::Value;

use crate::api::{GetOptions, MutationOptions, Params};
use crate::cache::FileStore;
use crate::config::{ClientConfig, ENV_API_URL};
use crate::error::{ApiError, Result};

/// Fetch a storefront API endpoint with retry and response caching
#[derive(Parser, Debug)]
#[command(name = "storefront-fetch")]
#[command(about = "Fetch a storefront API endpoint with retry and response caching")]
#[command(version)]
pub struct Cli {
    /// Endpoint path, e.g. /featured or /categories/3
    #[arg(value_name = "ENDPOINT")]
    pub endpoint: String,

    /// Backend base URL (overrides STOREFRONT_API_URL)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Query parameter, repeatable
    ///
    /// Examples:
    ///   storefront-fetch /products/search/12 --param q=cake --param offset=12
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// POST this JSON body instead of issuing a GET
    #[arg(long, value_name = "JSON", value_parser = parse_json, conflicts_with = "force_refresh")]
    pub post: Option<Value>,

    /// Skip the cache lookup and store the fresh response
    #[arg(long)]
    pub force_refresh: bool,

    /// Retry budget after the first attempt
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Cache responses on disk so they survive between runs
    #[arg(long)]
    pub durable: bool,

    /// Drop every cached response before fetching
    #[arg(long)]
    pub clear_cache: bool,

    /// Debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse a `key=value` pair. The value may be empty; the key may not.
pub fn parse_param(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        Some(_) => Err(format!("empty parameter name in '{}'", s)),
        None => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn parse_json(s: &str) -> std::result::Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON body: {}", e))
}

impl Cli {
    /// Query parameters as given on the command line.
    pub fn query_params(&self) -> Params {
        self.params
            .iter()
            .map(|(key, value)| (key.clone(), value.as_str()))
            .collect()
    }

    /// Build client configuration, letting flags override the lookup.
    pub fn client_config<F>(&self, lookup: F) -> Result<ClientConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = ClientConfig::from_lookup(|name| match name {
            ENV_API_URL => self.base_url.clone().or_else(|| lookup(name)),
            _ => lookup(name),
        })?;

        if self.durable && config.cache_dir.is_none() {
            let store = FileStore::new().ok_or_else(|| {
                ApiError::InvalidConfig("cannot determine a cache directory".to_string())
            })?;
            config.cache_dir = Some(store.dir().to_path_buf());
        }
        Ok(config)
    }

    pub fn get_options(&self) -> GetOptions {
        GetOptions {
            force_refresh: self.force_refresh,
            max_retries: self.max_retries,
            ..GetOptions::new()
        }
    }

    pub fn mutation_options(&self) -> MutationOptions {
        MutationOptions {
            max_retries: self.max_retries,
            ..MutationOptions::new()
        }
    }
}

/// Human-readable form of a backoff delay.
pub fn format_delay(delay: Duration) -> String {
    if delay.as_millis() < 1000 {
        format!("{}ms", delay.as_millis())
    } else {
        format!("{:.1}s", delay.as_secs_f64())
    }
}
