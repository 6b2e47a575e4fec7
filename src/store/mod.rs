//! Storage interface consumed by the resolver.
//!
//! - `memory`: `RwLock`-guarded maps, used by tests and local tooling
//! - `postgres`: `sqlx` connection pool against PostgreSQL

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::StoreResult;
use crate::i18n::Locale;
use crate::model::{ItemRef, TranslatableItem, TranslationKey, TranslationRecord};
use std::future::Future;

/// Persistent store of locales, items and translation records.
///
/// Every lookup returns `Ok(None)` / an empty `Vec` for absent data;
/// `Err` is reserved for the store itself failing.
pub trait TranslationStore: Send + Sync {
    /// The record whose target is `(key, target_locale)`.
    fn find_translation_record(
        &self,
        key: &TranslationKey,
        target_locale: &str,
    ) -> impl Future<Output = StoreResult<Option<TranslationRecord>>> + Send;

    /// Records whose source is `(key, source_locale)`, oldest first.
    fn find_records_by_source(
        &self,
        key: &TranslationKey,
        source_locale: &str,
    ) -> impl Future<Output = StoreResult<Vec<TranslationRecord>>> + Send;

    fn find_item(
        &self,
        key: &TranslationKey,
        locale: &str,
    ) -> impl Future<Output = StoreResult<Option<TranslatableItem>>> + Send;

    /// All locale-variants sharing `key`, in locale order.
    fn find_items_by_key(
        &self,
        key: &TranslationKey,
    ) -> impl Future<Output = StoreResult<Vec<TranslatableItem>>> + Send;

    /// Every item, in locale order then URL/title.
    fn list_items(&self) -> impl Future<Output = StoreResult<Vec<TranslatableItem>>> + Send;

    /// Configured locales in admin order.
    fn list_locales(&self) -> impl Future<Output = StoreResult<Vec<Locale>>> + Send;

    fn get_default_locale(&self) -> impl Future<Output = StoreResult<Locale>> + Send;

    /// Insert a new item; fails with `StoreError::Conflict` when
    /// `(key, locale)` is taken.
    fn insert_item(&self, item: TranslatableItem) -> impl Future<Output = StoreResult<()>> + Send;

    /// Insert a record; fails with `StoreError::Conflict` when the target
    /// already has a predecessor.
    fn insert_record(
        &self,
        record: TranslationRecord,
    ) -> impl Future<Output = StoreResult<()>> + Send;

    /// Delete an item together with every record naming it as source or
    /// target. Returns whether the item existed.
    fn delete_item(&self, item: &ItemRef) -> impl Future<Output = StoreResult<bool>> + Send;
}
