use chrono::Utc;
use uuid::Uuid;

use crate::db::AlertDb;
use crate::models::AlertRow;
use crate::{AlertError, AlertInput, AlertStatus, PriceAlert};

const SELECT_ALERTS: &str = "SELECT alert_id, email, stock_symbol, price_point, comparison_mode, \
     alert_status, current_price, created_at, triggered_at, trigger_price FROM alerts";

#[derive(Clone)]
pub struct AlertManager {
    db: AlertDb,
}

impl AlertManager {
    pub fn new(db: AlertDb) -> Self {
        Self { db }
    }

    fn rows_to_alerts(rows: Vec<AlertRow>) -> Result<Vec<PriceAlert>, AlertError> {
        rows.into_iter().map(PriceAlert::try_from).collect()
    }

    /// Validate and store a new active alert. `current_price` is the quote at creation time.
    pub async fn create_alert(
        &self,
        input: &AlertInput,
        current_price: f64,
    ) -> Result<PriceAlert, AlertError> {
        let input = input.validated()?;
        let alert = PriceAlert {
            alert_id: Uuid::new_v4().to_string(),
            email: input.email,
            stock_symbol: input.stock_symbol,
            price_point: input.price_point,
            comparison_mode: input.comparison_mode,
            alert_status: AlertStatus::Active,
            current_price: Some(current_price),
            created_at: Utc::now(),
            triggered_at: None,
            trigger_price: None,
        };

        sqlx::query(
            r#"
            INSERT INTO alerts
            (alert_id, email, stock_symbol, price_point, comparison_mode, alert_status, current_price, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alert.alert_id)
        .bind(&alert.email)
        .bind(&alert.stock_symbol)
        .bind(alert.price_point.to_string())
        .bind(alert.comparison_mode.as_str())
        .bind(alert.alert_status.as_str())
        .bind(current_price)
        .bind(alert.created_at.to_rfc3339())
        .execute(self.db.pool())
        .await?;

        tracing::info!(
            "Created alert {} for {} ({} {})",
            alert.alert_id,
            alert.stock_symbol,
            alert.comparison_mode,
            alert.price_point
        );
        Ok(alert)
    }

    /// Alerts still waiting for their threshold, oldest first.
    pub async fn active_alerts(&self) -> Result<Vec<PriceAlert>, AlertError> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!(
            "{} WHERE alert_status = ? ORDER BY created_at",
            SELECT_ALERTS
        ))
        .bind(AlertStatus::Active.as_str())
        .fetch_all(self.db.pool())
        .await?;

        Self::rows_to_alerts(rows)
    }

    pub async fn all_alerts(&self) -> Result<Vec<PriceAlert>, AlertError> {
        let rows = sqlx::query_as::<_, AlertRow>(&format!("{} ORDER BY created_at", SELECT_ALERTS))
            .fetch_all(self.db.pool())
            .await?;

        Self::rows_to_alerts(rows)
    }

    pub async fn get_alert(&self, alert_id: &str) -> Result<PriceAlert, AlertError> {
        let row = sqlx::query_as::<_, AlertRow>(&format!("{} WHERE alert_id = ?", SELECT_ALERTS))
            .bind(alert_id)
            .fetch_optional(self.db.pool())
            .await?
            .ok_or_else(|| AlertError::NotFound(alert_id.to_string()))?;

        PriceAlert::try_from(row)
    }

    pub async fn delete_alert(&self, alert_id: &str) -> Result<(), AlertError> {
        let result = sqlx::query("DELETE FROM alerts WHERE alert_id = ?")
            .bind(alert_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(AlertError::NotFound(alert_id.to_string()));
        }
        Ok(())
    }

    /// Delete every alert, returning how many were removed.
    pub async fn clear_alerts(&self) -> Result<u64, AlertError> {
        let result = sqlx::query("DELETE FROM alerts").execute(self.db.pool()).await?;
        Ok(result.rows_affected())
    }

    /// Flip an active alert to triggered. Returns false when the alert was not
    /// active any more, so a threshold crossing is only acted on once.
    pub async fn mark_triggered(&self, alert_id: &str, price: f64) -> Result<bool, AlertError> {
        let result = sqlx::query(
            "UPDATE alerts SET alert_status = ?, triggered_at = ?, trigger_price = ? \
             WHERE alert_id = ? AND alert_status = ?",
        )
        .bind(AlertStatus::Triggered.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(price)
        .bind(alert_id)
        .bind(AlertStatus::Active.as_str())
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
