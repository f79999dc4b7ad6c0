//! Login throttling and the security audit log

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};

use crate::config::SecurityConfig;
use crate::error::AppResult;
use shared::SecurityEvent;

/// Security service
#[derive(Clone)]
pub struct SecurityService {
    db: PgPool,
    max_failed_attempts: i64,
    lockout_window: Duration,
}

/// An audit log entry
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SecurityLogEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub username: Option<String>,
    pub event: String,
    pub ip_address: Option<String>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Whether either counter has reached the limit
pub fn exceeds_limit(by_username: i64, by_ip: i64, max_failed_attempts: i64) -> bool {
    by_username >= max_failed_attempts || by_ip >= max_failed_attempts
}

impl SecurityService {
    pub fn new(db: PgPool, config: &SecurityConfig) -> Self {
        Self {
            db,
            max_failed_attempts: config.max_failed_attempts.max(1),
            lockout_window: Duration::minutes(config.lockout_minutes.max(1)),
        }
    }

    /// Whether logins for `username` or from `ip` are currently refused
    pub async fn is_locked_out(&self, username: &str, ip: &str) -> AppResult<bool> {
        let since = Utc::now() - self.lockout_window;

        let (by_username, by_ip) = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE username = $1),
                COUNT(*) FILTER (WHERE ip_address = $2)
            FROM failed_login_attempts
            WHERE attempted_at > $3
            "#,
        )
        .bind(username)
        .bind(ip)
        .bind(since)
        .fetch_one(&self.db)
        .await?;

        Ok(exceeds_limit(by_username, by_ip, self.max_failed_attempts))
    }

    pub async fn record_failed_attempt(&self, username: &str, ip: &str) -> AppResult<()> {
        sqlx::query("INSERT INTO failed_login_attempts (username, ip_address) VALUES ($1, $2)")
            .bind(username)
            .bind(ip)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Forget failed attempts after a successful login
    pub async fn clear_failed_attempts(&self, username: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM failed_login_attempts WHERE username = $1")
            .bind(username)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    pub async fn log_event(
        &self,
        user_id: Option<i64>,
        username: Option<&str>,
        event: SecurityEvent,
        ip: Option<&str>,
        details: Option<&str>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO security_logs (user_id, username, event, ip_address, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(event.as_str())
        .bind(ip)
        .bind(details)
        .execute(&self.db)
        .await?;

        tracing::info!(event = event.as_str(), ?user_id, ?username, ?ip, "Security event");
        Ok(())
    }

    pub async fn recent_events(&self, limit: i64) -> AppResult<Vec<SecurityLogEntry>> {
        let entries = sqlx::query_as::<_, SecurityLogEntry>(
            r#"
            SELECT id, user_id, username, event, ip_address, details, created_at
            FROM security_logs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_counter_triggers_lockout() {
        assert!(!exceeds_limit(4, 4, 5));
        assert!(exceeds_limit(5, 0, 5));
        assert!(exceeds_limit(0, 5, 5));
    }
}
