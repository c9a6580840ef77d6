//! `PostgreSQL` implementation of the `CatalogStore` trait.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use storefront_core::error::DomainError;
use storefront_core::identity::ProductId;
use storefront_core::money::Money;
use tracing::debug;

use crate::filter::ProductFilter;
use crate::product::Product;
use crate::store::CatalogStore;

/// PostgreSQL-backed catalog reading the `products` table.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    /// Creates a new `PgCatalogStore`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts products, overwriting rows with the same id. Used to seed a
    /// database from a catalog file.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an invalid product and
    /// `DomainError::Upstream` if the database rejects the write.
    pub async fn upsert_products(&self, products: &[Product]) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| upstream(&e))?;
        for product in products {
            product.validate()?;
            sqlx::query(
                r"
                INSERT INTO products
                    (id, name, price_minor, category, original_price_minor,
                     rating, review_count, image)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name,
                    price_minor = EXCLUDED.price_minor,
                    category = EXCLUDED.category,
                    original_price_minor = EXCLUDED.original_price_minor,
                    rating = EXCLUDED.rating,
                    review_count = EXCLUDED.review_count,
                    image = EXCLUDED.image
                ",
            )
            .bind(product.id.as_str())
            .bind(product.name.trim())
            .bind(product.price.minor_units())
            .bind(product.category.trim())
            .bind(product.original_price.map(Money::minor_units))
            .bind(product.rating)
            .bind(i32::try_from(product.review_count).unwrap_or(i32::MAX))
            .bind(product.image.as_deref())
            .execute(&mut *tx)
            .await
            .map_err(|e| upstream(&e))?;
        }
        tx.commit().await.map_err(|e| upstream(&e))?;
        debug!(count = products.len(), "catalog products upserted");
        Ok(())
    }
}

fn upstream(e: &sqlx::Error) -> DomainError {
    DomainError::Upstream(format!("catalog store: {e}"))
}

fn row_to_product(row: &PgRow) -> Result<Product, DomainError> {
    let read = |e: sqlx::Error| upstream(&e);
    let id: String = row.try_get("id").map_err(read)?;
    let price: i64 = row.try_get("price_minor").map_err(read)?;
    let original_price: Option<i64> = row.try_get("original_price_minor").map_err(read)?;
    let review_count: i32 = row.try_get("review_count").map_err(read)?;
    let corrupt = |what: &str| DomainError::Upstream(format!("catalog row {id}: bad {what}"));
    Ok(Product {
        id: ProductId::parse(&id).map_err(|_| corrupt("id"))?,
        name: row.try_get("name").map_err(read)?,
        price: Money::from_minor(price).map_err(|_| corrupt("price"))?,
        category: row.try_get("category").map_err(read)?,
        original_price: original_price
            .map(Money::from_minor)
            .transpose()
            .map_err(|_| corrupt("original price"))?,
        rating: row.try_get("rating").map_err(read)?,
        review_count: u32::try_from(review_count).map_err(|_| corrupt("review count"))?,
        image: row.try_get("image").map_err(read)?,
    })
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn get_product(&self, product_id: &ProductId) -> Result<Product, DomainError> {
        let row = sqlx::query(
            r"
            SELECT id, name, price_minor, category, original_price_minor,
                   rating, review_count, image
            FROM products
            WHERE id = $1
            ",
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| upstream(&e))?;

        match row {
            Some(row) => row_to_product(&row),
            None => Err(DomainError::NotFound(format!("product {product_id}"))),
        }
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, DomainError> {
        let filter = filter.normalized()?;
        let rows = sqlx::query(
            r"
            SELECT id, name, price_minor, category, original_price_minor,
                   rating, review_count, image
            FROM products
            WHERE ($1::TEXT IS NULL OR LOWER(category) = LOWER($1))
              AND ($2::TEXT IS NULL
                   OR POSITION(LOWER($2) IN LOWER(name)) > 0
                   OR POSITION(LOWER($2) IN LOWER(category)) > 0)
              AND ($3::BIGINT IS NULL OR price_minor >= $3)
              AND ($4::BIGINT IS NULL OR price_minor <= $4)
              AND ($5::REAL IS NULL OR rating >= $5)
            ORDER BY published_at, id
            ",
        )
        .bind(filter.category.as_deref())
        .bind(filter.q.as_deref())
        .bind(filter.min_price.map(Money::minor_units))
        .bind(filter.max_price.map(Money::minor_units))
        .bind(filter.min_rating)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| upstream(&e))?;

        rows.iter().map(row_to_product).collect()
    }
}
