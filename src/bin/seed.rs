use chrono::Utc;
use ecofinds_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        Products,
        products::{ActiveModel as ProductActive, Category, Column, ProductStatus},
    },
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url, 1).await?;
    run_migrations(&orm).await?;

    let seller_id = match std::env::var("SEED_SELLER_ID") {
        Ok(raw) => Uuid::parse_str(&raw)?,
        Err(_) => Uuid::new_v4(),
    };
    seed_listings(&orm, seller_id).await?;

    println!("Seed completed. Seller ID: {seller_id}");
    Ok(())
}

async fn seed_listings(orm: &DatabaseConnection, seller_id: Uuid) -> anyhow::Result<()> {
    let listings = vec![
        (
            "Refurbished ThinkPad X230",
            "i5, 8GB RAM, new battery, minor wear on the lid",
            Category::Electronics,
            1_450_000,
        ),
        (
            "Teak coffee table",
            "Solid teak, 90x60cm, one small water mark",
            Category::Furniture,
            620_000,
        ),
        (
            "Harry Potter box set",
            "All seven paperbacks, spines slightly faded",
            Category::Books,
            180_000,
        ),
        (
            "Terracotta planter pair",
            "Two 30cm planters with drainage holes",
            Category::HomeAndGarden,
            45_000,
        ),
    ];

    for (title, description, category, price) in listings {
        let exists = Products::find()
            .filter(Column::SellerId.eq(seller_id))
            .filter(Column::Title.eq(title))
            .one(orm)
            .await?
            .is_some();
        if exists {
            continue;
        }

        let now = Utc::now();
        Products::insert(ProductActive {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            description: Set(description.to_string()),
            category: Set(category),
            price: Set(price),
            images: Set(serde_json::json!([])),
            seller_id: Set(seller_id),
            status: Set(ProductStatus::Available),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        })
        .exec(orm)
        .await?;
    }

    println!("Seeded listings");
    Ok(())
}
