use crate::error::{StoreError, StoreResult};
use crate::i18n::{Locale, LocaleRegistry};
use crate::model::{ItemRef, TranslatableItem, TranslationKey, TranslationRecord};
use crate::store::TranslationStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    items: HashMap<ItemRef, TranslatableItem>,
    /// Keyed by target: an item has at most one predecessor.
    records: HashMap<ItemRef, TranslationRecord>,
}

/// In-memory store. Clones share the same tables.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    registry: Arc<LocaleRegistry>,
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new(registry: LocaleRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            tables: Arc::new(RwLock::new(Tables::default())),
        }
    }

    /// Insert a record without checking that its items exist. Used to
    /// reproduce corrupted data in tests.
    pub fn insert_raw_record(&self, record: TranslationRecord) {
        self.write().records.insert(record.target_ref(), record);
    }

    pub fn record_count(&self) -> usize {
        self.read().records.len()
    }

    pub fn item_count(&self) -> usize {
        self.read().items.len()
    }

    // A poisoned lock only means a writer panicked mid-update of plain maps;
    // the data is still usable.
    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn locale_rank(&self, code: &str) -> usize {
        self.registry.position(code).unwrap_or(usize::MAX)
    }

    fn sort_items(&self, items: &mut [TranslatableItem]) {
        items.sort_by(|a, b| {
            self.locale_rank(&a.locale)
                .cmp(&self.locale_rank(&b.locale))
                .then_with(|| a.url_path.is_none().cmp(&b.url_path.is_none()))
                .then_with(|| a.url_path.cmp(&b.url_path))
                .then_with(|| a.title.cmp(&b.title))
                .then_with(|| a.translation_key.cmp(&b.translation_key))
        });
    }
}

impl TranslationStore for MemoryStore {
    async fn find_translation_record(
        &self,
        key: &TranslationKey,
        target_locale: &str,
    ) -> StoreResult<Option<TranslationRecord>> {
        let target = ItemRef::new(key.clone(), target_locale);
        Ok(self.read().records.get(&target).cloned())
    }

    async fn find_records_by_source(
        &self,
        key: &TranslationKey,
        source_locale: &str,
    ) -> StoreResult<Vec<TranslationRecord>> {
        let mut records: Vec<TranslationRecord> = self
            .read()
            .records
            .values()
            .filter(|r| &r.translation_key == key && r.source_locale == source_locale)
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.target_locale.cmp(&b.target_locale))
        });
        Ok(records)
    }

    async fn find_item(
        &self,
        key: &TranslationKey,
        locale: &str,
    ) -> StoreResult<Option<TranslatableItem>> {
        let item_ref = ItemRef::new(key.clone(), locale);
        Ok(self.read().items.get(&item_ref).cloned())
    }

    async fn find_items_by_key(&self, key: &TranslationKey) -> StoreResult<Vec<TranslatableItem>> {
        let mut items: Vec<TranslatableItem> = self
            .read()
            .items
            .values()
            .filter(|i| &i.translation_key == key)
            .cloned()
            .collect();
        self.sort_items(&mut items);
        Ok(items)
    }

    async fn list_items(&self) -> StoreResult<Vec<TranslatableItem>> {
        let mut items: Vec<TranslatableItem> = self.read().items.values().cloned().collect();
        self.sort_items(&mut items);
        Ok(items)
    }

    async fn list_locales(&self) -> StoreResult<Vec<Locale>> {
        Ok(self.registry.list().to_vec())
    }

    async fn get_default_locale(&self) -> StoreResult<Locale> {
        Ok(self.registry.default_locale().clone())
    }

    async fn insert_item(&self, item: TranslatableItem) -> StoreResult<()> {
        let item_ref = item.item_ref();
        let mut tables = self.write();
        if tables.items.contains_key(&item_ref) {
            return Err(StoreError::Conflict(format!("item {}", item_ref)));
        }
        tables.items.insert(item_ref, item);
        Ok(())
    }

    async fn insert_record(&self, record: TranslationRecord) -> StoreResult<()> {
        let target = record.target_ref();
        let mut tables = self.write();
        if tables.records.contains_key(&target) {
            return Err(StoreError::Conflict(format!(
                "translation record for {}",
                target
            )));
        }
        tables.records.insert(target, record);
        Ok(())
    }

    async fn delete_item(&self, item: &ItemRef) -> StoreResult<bool> {
        let mut tables = self.write();
        let existed = tables.items.remove(item).is_some();
        tables
            .records
            .retain(|target, record| target != item && &record.source_ref() != item);
        Ok(existed)
    }
}
