use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{config::AppConfig, db, middleware::auth::TokenVerifier, pricing::PricingPolicy};

/// Service object shared by every request. Built once at startup and closed on shutdown.
#[derive(Clone)]
pub struct AppState {
    pub orm: DatabaseConnection,
    pub pricing: Arc<PricingPolicy>,
    pub tokens: TokenVerifier,
}

impl AppState {
    pub fn new(orm: DatabaseConnection, pricing: PricingPolicy, jwt_secret: &str) -> Self {
        Self {
            orm,
            pricing: Arc::new(pricing),
            tokens: TokenVerifier::new(jwt_secret),
        }
    }

    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let orm = db::create_orm_conn(&config.database_url, config.max_connections).await?;
        db::run_migrations(&orm).await?;
        Ok(Self::new(orm, config.pricing.clone(), &config.jwt_secret))
    }

    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.orm.close().await?;
        tracing::info!("database pool closed");
        Ok(())
    }
}
