//! String values with expiry

use super::Store;
use std::time::Duration;
use tunebox_common::Result;

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

impl Store {
    /// Set `key` to `value`, expiring after `ttl`
    pub async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = now_secs().saturating_add(ttl.as_secs() as i64);
        sqlx::query(
            r#"
            INSERT INTO cache_entries (key, value, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Value of `key`, or None if absent or expired (expired rows are deleted)
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, (String, i64)>(
            "SELECT value, expires_at FROM cache_entries WHERE key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((value, expires_at)) if expires_at > now_secs() => Ok(Some(value)),
            Some(_) => {
                self.del(key).await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Delete `key`, returning whether it existed
    pub async fn del(&self, key: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM cache_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
