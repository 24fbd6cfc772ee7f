use std::{env, str::FromStr};

use anyhow::Context;
use rust_decimal::Decimal;

use crate::pricing::PricingPolicy;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub max_connections: u32,
    pub jwt_secret: String,
    pub pricing: PricingPolicy,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .ok()
            .and_then(|p| p.parse::<u16>().ok())
            .unwrap_or(3000);
        let max_connections = env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|n| n.parse::<u32>().ok())
            .unwrap_or(10);

        let defaults = PricingPolicy::default();
        let pricing = PricingPolicy {
            tax_rate: decimal_var("TAX_RATE", defaults.tax_rate)?,
            shipping_fee: decimal_var("SHIPPING_FEE", defaults.shipping_fee)?,
            currency: env::var("CURRENCY").unwrap_or(defaults.currency),
            currency_symbol: env::var("CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),
        };
        pricing.validate()?;

        Ok(Self {
            database_url,
            host,
            port,
            max_connections,
            jwt_secret,
            pricing,
        })
    }
}

fn decimal_var(name: &str, default: Decimal) -> anyhow::Result<Decimal> {
    match env::var(name) {
        Ok(raw) => parse_decimal(name, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_decimal(name: &str, raw: &str) -> anyhow::Result<Decimal> {
    Decimal::from_str(raw.trim()).with_context(|| format!("{name} is not a decimal: {raw:?}"))
}
