//! Schema tool. `migrate` (or `migrate up`) applies pending migrations,
//! `migrate status` lists what is still pending.

use ecofinds_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    migration::Migrator,
};
use sea_orm_migration::MigratorTrait;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let config = AppConfig::from_env()?;
    let orm = create_orm_conn(&config.database_url, 1).await?;

    match command.as_str() {
        "up" => {
            let pending = Migrator::get_pending_migrations(&orm).await?.len();
            run_migrations(&orm).await?;
            tracing::info!(applied = pending, "schema up to date");
        }
        "status" => {
            let pending = Migrator::get_pending_migrations(&orm).await?;
            if pending.is_empty() {
                tracing::info!("no pending migrations");
            }
            for migration in pending {
                tracing::info!(name = migration.name(), "pending");
            }
        }
        other => anyhow::bail!("unknown command {other:?}, expected `up` or `status`"),
    }

    orm.close().await?;
    Ok(())
}
