use crate::capabilities::Capabilities;
use crate::error::{StoreError, StoreResult};
use crate::i18n::{normalize_code, Locale};
use crate::model::{ItemRef, TranslatableItem, TranslationKey, TranslationRecord};
use crate::store::TranslationStore;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

const ITEM_COLUMNS: &str =
    "i.translation_key, i.locale, i.title, i.url_path, i.search_engine_index, i.capabilities";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and create tables if they do not exist.
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    async fn migrate(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS locales (
                language_code TEXT PRIMARY KEY,
                display_name TEXT NOT NULL,
                is_default BOOLEAN NOT NULL DEFAULT FALSE,
                position INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create locales table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS translatable_items (
                translation_key TEXT NOT NULL,
                locale TEXT NOT NULL,
                title TEXT NOT NULL,
                url_path TEXT,
                search_engine_index BOOLEAN NOT NULL DEFAULT TRUE,
                capabilities JSONB NOT NULL DEFAULT '{}'::jsonb,
                PRIMARY KEY (translation_key, locale)
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create translatable_items table")?;

        // No foreign keys; dangling records are reported by the resolver.
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS translation_records (
                translation_key TEXT NOT NULL,
                source_locale TEXT NOT NULL,
                target_locale TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (translation_key, target_locale)
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create translation_records table")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_translation_records_source
             ON translation_records (translation_key, source_locale)",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create translation_records index")?;

        Ok(())
    }

    /// Replace the locale table with the configured locales.
    pub async fn sync_locales(&self, locales: &[Locale], default_code: &str) -> Result<()> {
        let default_code = normalize_code(default_code);
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM locales")
            .execute(&mut *tx)
            .await
            .context("Failed to clear locales")?;

        for (position, locale) in locales.iter().enumerate() {
            sqlx::query(
                "INSERT INTO locales (language_code, display_name, is_default, position)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(locale.language_code())
            .bind(locale.display_name())
            .bind(locale.language_code() == default_code)
            .bind(i32::try_from(position).context("Too many locales")?)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert locale {}", locale.language_code()))?;
        }

        tx.commit().await?;
        info!("Synchronised {} locales (default: {})", locales.len(), default_code);
        Ok(())
    }
}

fn item_from_row(row: &PgRow) -> StoreResult<TranslatableItem> {
    let capabilities: serde_json::Value = row.try_get("capabilities")?;
    let capabilities: Capabilities = serde_json::from_value(capabilities)?;

    Ok(TranslatableItem {
        translation_key: TranslationKey::new(row.try_get::<String, _>("translation_key")?),
        locale: row.try_get("locale")?,
        title: row.try_get("title")?,
        url_path: row.try_get("url_path")?,
        search_engine_index: row.try_get("search_engine_index")?,
        capabilities,
    })
}

fn record_from_row(row: &PgRow) -> StoreResult<TranslationRecord> {
    Ok(TranslationRecord {
        translation_key: TranslationKey::new(row.try_get::<String, _>("translation_key")?),
        source_locale: row.try_get("source_locale")?,
        target_locale: row.try_get("target_locale")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

impl TranslationStore for PgStore {
    async fn find_translation_record(
        &self,
        key: &TranslationKey,
        target_locale: &str,
    ) -> StoreResult<Option<TranslationRecord>> {
        let row = sqlx::query(
            "SELECT translation_key, source_locale, target_locale, created_at
             FROM translation_records
             WHERE translation_key = $1 AND target_locale = $2",
        )
        .bind(key.as_str())
        .bind(target_locale)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn find_records_by_source(
        &self,
        key: &TranslationKey,
        source_locale: &str,
    ) -> StoreResult<Vec<TranslationRecord>> {
        let rows = sqlx::query(
            "SELECT translation_key, source_locale, target_locale, created_at
             FROM translation_records
             WHERE translation_key = $1 AND source_locale = $2
             ORDER BY created_at ASC, target_locale ASC",
        )
        .bind(key.as_str())
        .bind(source_locale)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn find_item(
        &self,
        key: &TranslationKey,
        locale: &str,
    ) -> StoreResult<Option<TranslatableItem>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM translatable_items i
             WHERE i.translation_key = $1 AND i.locale = $2",
            ITEM_COLUMNS
        ))
        .bind(key.as_str())
        .bind(locale)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(item_from_row).transpose()
    }

    async fn find_items_by_key(&self, key: &TranslationKey) -> StoreResult<Vec<TranslatableItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM translatable_items i
             LEFT JOIN locales l ON l.language_code = i.locale
             WHERE i.translation_key = $1
             ORDER BY l.position ASC NULLS LAST, i.locale ASC",
            ITEM_COLUMNS
        ))
        .bind(key.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    async fn list_items(&self) -> StoreResult<Vec<TranslatableItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM translatable_items i
             LEFT JOIN locales l ON l.language_code = i.locale
             ORDER BY l.position ASC NULLS LAST, i.url_path ASC NULLS LAST, i.title ASC, i.translation_key ASC",
            ITEM_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(item_from_row).collect()
    }

    async fn list_locales(&self) -> StoreResult<Vec<Locale>> {
        let rows = sqlx::query(
            "SELECT language_code, display_name FROM locales ORDER BY position ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> StoreResult<Locale> {
                Ok(Locale::new(
                    row.try_get::<String, _>("language_code")?,
                    row.try_get::<String, _>("display_name")?,
                ))
            })
            .collect()
    }

    async fn get_default_locale(&self) -> StoreResult<Locale> {
        let row = sqlx::query(
            "SELECT language_code, display_name FROM locales WHERE is_default LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::Misconfigured("no default locale".to_string()))?;

        Ok(Locale::new(
            row.try_get::<String, _>("language_code")?,
            row.try_get::<String, _>("display_name")?,
        ))
    }

    async fn insert_item(&self, item: TranslatableItem) -> StoreResult<()> {
        let capabilities = serde_json::to_value(&item.capabilities)?;

        sqlx::query(
            "INSERT INTO translatable_items
                (translation_key, locale, title, url_path, search_engine_index, capabilities)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(item.translation_key.as_str())
        .bind(&item.locale)
        .bind(&item.title)
        .bind(&item.url_path)
        .bind(item.search_engine_index)
        .bind(capabilities)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("item {}", item.item_ref()))
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn insert_record(&self, record: TranslationRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO translation_records
                (translation_key, source_locale, target_locale, created_at)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(record.translation_key.as_str())
        .bind(&record.source_locale)
        .bind(&record.target_locale)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("translation record for {}", record.target_ref()))
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn delete_item(&self, item: &ItemRef) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM translation_records
             WHERE translation_key = $1 AND (source_locale = $2 OR target_locale = $2)",
        )
        .bind(item.translation_key.as_str())
        .bind(&item.locale)
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "DELETE FROM translatable_items WHERE translation_key = $1 AND locale = $2",
        )
        .bind(item.translation_key.as_str())
        .bind(&item.locale)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    //! These tests need a PostgreSQL database. Run them with
    //! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

    use super::*;

    async fn connect() -> PgStore {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL not set");
        let store = PgStore::new(&url).await.expect("connect");
        sqlx::query("TRUNCATE translatable_items, translation_records")
            .execute(&store.pool)
            .await
            .expect("truncate");
        store
            .sync_locales(
                &[
                    Locale::new("en", "English"),
                    Locale::new("es", "Español"),
                    Locale::new("ca", "Català"),
                ],
                "en",
            )
            .await
            .expect("locales");
        store
    }

    #[tokio::test]
    #[ignore]
    async fn test_locales_roundtrip() {
        let store = connect().await;
        let locales = store.list_locales().await.unwrap();
        assert_eq!(locales.len(), 3);
        assert_eq!(locales[1].language_code(), "es");
        assert_eq!(store.get_default_locale().await.unwrap().language_code(), "en");
    }

    #[tokio::test]
    #[ignore]
    async fn test_item_and_record_lifecycle() {
        let store = connect().await;
        store
            .insert_item(TranslatableItem::page("T1", "en", "Home", "/en/"))
            .await
            .unwrap();
        store
            .insert_item(TranslatableItem::page("T1", "es", "Inicio", "/es/"))
            .await
            .unwrap();
        store
            .insert_record(TranslationRecord::new("T1", "en", "es"))
            .await
            .unwrap();

        let record = store
            .find_translation_record(&"T1".into(), "es")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.source_locale, "en");

        let duplicate = store
            .insert_item(TranslatableItem::page("T1", "es", "Inicio", "/es/"))
            .await;
        assert!(matches!(duplicate, Err(StoreError::Conflict(_))));

        assert!(store.delete_item(&ItemRef::new("T1", "es")).await.unwrap());
        assert!(store
            .find_records_by_source(&"T1".into(), "en")
            .await
            .unwrap()
            .is_empty());
    }
}
