//! Named ordered lists
//!
//! Values are opaque strings kept in append order per list key.

use super::Store;
use tunebox_common::Result;

impl Store {
    /// Append `value` to the tail of `key`
    pub async fn rpush(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT INTO list_items (list_key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// All values of `key`, oldest first
    pub async fn lrange(&self, key: &str) -> Result<Vec<String>> {
        let values = sqlx::query_scalar::<_, String>(
            "SELECT value FROM list_items WHERE list_key = ? ORDER BY id ASC",
        )
        .bind(key)
        .fetch_all(&self.pool)
        .await?;
        Ok(values)
    }

    /// Remove every occurrence of `value` from `key`, returning how many were removed
    pub async fn lrem(&self, key: &str, value: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM list_items WHERE list_key = ? AND value = ?")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn llen(&self, key: &str) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM list_items WHERE list_key = ?")
            .bind(key)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    /// Drop the whole list (no-op when already empty)
    pub async fn delete_list(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM list_items WHERE list_key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
