use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::Row;

use moldquote_core::domain::quote_request::{QuoteRequest, QuoteRequestId};
use moldquote_core::sinks::{QuoteSink, SinkError};

use super::RepositoryError;
use crate::DbPool;

pub const WAREHOUSE_SINK_NAME: &str = "warehouse";

/// Append-only `quote_request` table standing in for the analytics warehouse.
pub struct SqlQuoteSink {
    pool: DbPool,
}

impl SqlQuoteSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, request: &QuoteRequest) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO quote_request (id, user_id, material, size, quantity, volume, weight_kg,
                                        total_cost, full_name, phone, company, email, submitted_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.id.0)
        .bind(&request.user_id)
        .bind(&request.material)
        .bind(&request.size)
        .bind(i64::from(request.quantity))
        .bind(request.volume)
        .bind(request.weight_kg)
        .bind(request.total_cost)
        .bind(&request.full_name)
        .bind(&request.phone)
        .bind(&request.company)
        .bind(&request.email)
        .bind(request.submitted_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(
        &self,
        id: &QuoteRequestId,
    ) -> Result<Option<QuoteRequest>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, user_id, material, size, quantity, volume, weight_kg, total_cost,
                    full_name, phone, company, email, submitted_at
             FROM quote_request WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_quote_request(r)?)),
            None => Ok(None),
        }
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<QuoteRequest>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, material, size, quantity, volume, weight_kg, total_cost,
                    full_name, phone, company, email, submitted_at
             FROM quote_request WHERE user_id = ? ORDER BY submitted_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_quote_request).collect()
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM quote_request")
            .fetch_one(&self.pool)
            .await?;
        row.try_get::<i64, _>("count").map_err(|e| RepositoryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl QuoteSink for SqlQuoteSink {
    fn name(&self) -> &str {
        WAREHOUSE_SINK_NAME
    }

    async fn submit(&self, request: &QuoteRequest) -> Result<(), SinkError> {
        self.insert(request).await.map_err(|error| match error {
            RepositoryError::Database(sqlx::Error::Database(db_error)) => SinkError::Rejected {
                sink: WAREHOUSE_SINK_NAME.to_string(),
                message: db_error.message().to_string(),
            },
            other => SinkError::Unavailable {
                sink: WAREHOUSE_SINK_NAME.to_string(),
                message: other.to_string(),
            },
        })
    }
}

fn row_to_quote_request(row: &sqlx::sqlite::SqliteRow) -> Result<QuoteRequest, RepositoryError> {
    let decode = |e: sqlx::Error| RepositoryError::Decode(e.to_string());

    let quantity: i64 = row.try_get("quantity").map_err(decode)?;
    let quantity = u32::try_from(quantity)
        .map_err(|_| RepositoryError::Decode(format!("quantity `{quantity}` is out of range")))?;
    let submitted_at_str: String = row.try_get("submitted_at").map_err(decode)?;
    let submitted_at = DateTime::parse_from_rfc3339(&submitted_at_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("submitted_at: {e}")))?;

    Ok(QuoteRequest {
        id: QuoteRequestId(row.try_get("id").map_err(decode)?),
        user_id: row.try_get("user_id").map_err(decode)?,
        material: row.try_get("material").map_err(decode)?,
        size: row.try_get("size").map_err(decode)?,
        quantity,
        volume: row.try_get("volume").map_err(decode)?,
        weight_kg: row.try_get("weight_kg").map_err(decode)?,
        total_cost: row.try_get("total_cost").map_err(decode)?,
        full_name: row.try_get("full_name").map_err(decode)?,
        phone: row.try_get("phone").map_err(decode)?,
        company: row.try_get("company").map_err(decode)?,
        email: row.try_get("email").map_err(decode)?,
        submitted_at,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use moldquote_core::domain::quote_request::{QuoteRequest, QuoteRequestId};
    use moldquote_core::sinks::{QuoteSink, SinkError};

    use super::SqlQuoteSink;
    use crate::{connect_with_settings, migrations::run_pending};

    fn request(user_id: &str) -> QuoteRequest {
        QuoteRequest {
            id: QuoteRequestId::generate(),
            user_id: user_id.to_owned(),
            material: "ABS".to_owned(),
            size: "10x5x2".to_owned(),
            quantity: 50,
            volume: 100.0,
            weight_kg: 0.105,
            total_cost: 630.0,
            full_name: "Jane Doe".to_owned(),
            phone: "0891234567".to_owned(),
            company: "Acme".to_owned(),
            email: "jane@acme.com".to_owned(),
            submitted_at: Utc::now(),
        }
    }

    async fn sink() -> SqlQuoteSink {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("migrate");
        SqlQuoteSink::new(pool)
    }

    #[tokio::test]
    async fn submitted_request_round_trips_through_table() {
        let sink = sink().await;
        let request = request("U-1");

        sink.submit(&request).await.expect("insert");

        let stored = sink.find_by_id(&request.id).await.expect("query").expect("row present");
        assert_eq!(stored.user_id, "U-1");
        assert_eq!(stored.quantity, 50);
        assert_eq!(stored.total_cost, 630.0);
        assert_eq!(stored.email, "jane@acme.com");
        assert_eq!(stored.submitted_at.timestamp(), request.submitted_at.timestamp());
        assert_eq!(sink.count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected_by_constraint() {
        let sink = sink().await;
        let request = request("U-2");
        sink.submit(&request).await.expect("first insert");

        let error = sink.submit(&request).await.expect_err("primary key clash");

        assert!(matches!(error, SinkError::Rejected { ref sink, .. } if sink == "warehouse"));
    }

    #[tokio::test]
    async fn missing_table_reports_sink_failure() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        let sink = SqlQuoteSink::new(pool);

        let error = sink.submit(&request("U-3")).await.expect_err("no schema");

        assert_eq!(error.sink(), "warehouse");
    }

    #[tokio::test]
    async fn requests_are_listed_per_user() {
        let sink = sink().await;
        sink.submit(&request("U-4")).await.expect("insert");
        sink.submit(&request("U-4")).await.expect("insert");
        sink.submit(&request("U-5")).await.expect("insert");

        assert_eq!(sink.list_for_user("U-4").await.expect("list").len(), 2);
        assert_eq!(sink.name(), "warehouse");
    }
}
