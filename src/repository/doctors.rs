//! Doctors domain methods on PgRepository

use uuid::Uuid;

use super::PgRepository;
use crate::{error::AppResult, models::Doctor};

impl PgRepository {
    /// List all doctors, oldest first
    pub async fn doctors_list(&self) -> AppResult<Vec<Doctor>> {
        let rows = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors ORDER BY created_at, name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn doctors_get(&self, id: Uuid) -> AppResult<Option<Doctor>> {
        let row = sqlx::query_as::<_, Doctor>("SELECT * FROM doctors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }
}
