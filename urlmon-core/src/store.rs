//! Persistence gateway for monitors and their health-check history.
//!
//! Monitors are never hard-deleted; deactivation flips `is_active` and the
//! row stays so its history remains queryable. Health checks are append-only.

use chrono::{DateTime, Utc};

use crate::db::DatabasePool;
use crate::error::{Error, Result};
use crate::models::{HealthCheck, Monitor};

#[derive(Clone, Debug)]
pub struct MonitorStore {
    pool: DatabasePool,
}

impl MonitorStore {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub async fn create_monitor(&self, url: &str, check_interval: i64) -> Result<Monitor> {
        let monitor = sqlx::query_as::<_, Monitor>(
            r#"
            INSERT INTO monitors (url, check_interval, is_active, created_at)
            VALUES (?, ?, TRUE, ?)
            RETURNING id, url, check_interval, is_active, created_at
            "#,
        )
        .bind(url)
        .bind(check_interval)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(monitor)
    }

    pub async fn get_monitor(&self, id: i64) -> Result<Monitor> {
        sqlx::query_as::<_, Monitor>("SELECT * FROM monitors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found(format!("monitor {} not found", id)))
    }

    /// All monitors, active and inactive, in creation order.
    pub async fn list_monitors(&self, skip: i64, limit: i64) -> Result<Vec<Monitor>> {
        let monitors =
            sqlx::query_as::<_, Monitor>("SELECT * FROM monitors ORDER BY id LIMIT ? OFFSET ?")
                .bind(limit)
                .bind(skip)
                .fetch_all(&self.pool)
                .await?;

        Ok(monitors)
    }

    pub async fn list_active_monitors(&self) -> Result<Vec<Monitor>> {
        let monitors = sqlx::query_as::<_, Monitor>(
            "SELECT * FROM monitors WHERE is_active = TRUE ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(monitors)
    }

    pub async fn deactivate_monitor(&self, id: i64) -> Result<Monitor> {
        sqlx::query_as::<_, Monitor>(
            r#"
            UPDATE monitors SET is_active = FALSE
            WHERE id = ?
            RETURNING id, url, check_interval, is_active, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| Error::not_found(format!("monitor {} not found", id)))
    }

    /// Timestamp of the most recent health check, None if never checked.
    pub async fn last_checked_at(&self, monitor_id: i64) -> Result<Option<DateTime<Utc>>> {
        let checked_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            SELECT checked_at FROM health_checks
            WHERE monitor_id = ?
            ORDER BY checked_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(monitor_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(checked_at)
    }

    pub async fn append_health_check(
        &self,
        monitor_id: i64,
        status_code: Option<i64>,
        latency: f64,
        is_up: bool,
        error_message: Option<&str>,
        checked_at: DateTime<Utc>,
    ) -> Result<HealthCheck> {
        let check = sqlx::query_as::<_, HealthCheck>(
            r#"
            INSERT INTO health_checks (monitor_id, status_code, latency, is_up, error_message, checked_at)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, monitor_id, status_code, latency, is_up, error_message, checked_at
            "#,
        )
        .bind(monitor_id)
        .bind(status_code)
        .bind(latency)
        .bind(is_up)
        .bind(error_message)
        .bind(checked_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(check)
    }

    /// History for one monitor, ascending by `checked_at`. A limit keeps the
    /// most recent records while preserving ascending order.
    pub async fn list_health_checks(
        &self,
        monitor_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<HealthCheck>> {
        let checks = match limit {
            Some(limit) => {
                sqlx::query_as::<_, HealthCheck>(
                    r#"
                    SELECT * FROM (
                        SELECT * FROM health_checks
                        WHERE monitor_id = ?
                        ORDER BY checked_at DESC, id DESC
                        LIMIT ?
                    ) ORDER BY checked_at ASC, id ASC
                    "#,
                )
                .bind(monitor_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, HealthCheck>(
                    r#"
                    SELECT * FROM health_checks
                    WHERE monitor_id = ?
                    ORDER BY checked_at ASC, id ASC
                    "#,
                )
                .bind(monitor_id)
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(checks)
    }
}
