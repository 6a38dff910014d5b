//! Services (consultation offers) domain methods on PgRepository

use uuid::Uuid;

use super::PgRepository;
use crate::{error::AppResult, models::Service};

impl PgRepository {
    /// List services, cheapest first
    pub async fn services_list(&self, doctor_id: Option<Uuid>, active_only: bool) -> AppResult<Vec<Service>> {
        let rows = sqlx::query_as::<_, Service>(
            r#"
            SELECT * FROM services
            WHERE ($1::uuid IS NULL OR doctor_id = $1)
              AND ($2 = FALSE OR is_active)
            ORDER BY price ASC, name
            "#,
        )
        .bind(doctor_id)
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn services_get(&self, id: Uuid) -> AppResult<Option<Service>> {
        let row = sqlx::query_as::<_, Service>("SELECT * FROM services WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
