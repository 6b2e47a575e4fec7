//! Translation graph resolution.
//!
//! A [`ResolutionContext`] answers three questions about an item:
//!
//! - which item it was directly translated from (its *predecessor*),
//! - which original item starts its chain (its *source*),
//! - which items were produced from it, directly or transitively
//!   (its *descendants*).
//!
//! A context lives for one request. It memoizes predecessor and source
//! lookups and counts store traffic; nothing is shared between contexts.

use crate::error::{DataIntegrityError, ResolveResult};
use crate::i18n::Locale;
use crate::model::{ItemRef, TranslatableItem, TranslationRecord};
use crate::store::TranslationStore;
use futures::future::try_join_all;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Default bound on predecessor chains and descendant levels.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Knobs for one resolution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Longest predecessor chain / deepest descendant level accepted
    /// before the graph is reported as corrupt.
    pub max_depth: usize,

    /// When false, localized lookups return the item itself.
    pub i18n_enabled: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            i18n_enabled: true,
        }
    }
}

/// Store traffic and memo effectiveness for one context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    pub store_lookups: usize,
    pub memo_hits: usize,
    pub memo_misses: usize,
}

/// Request-scoped resolver over a store.
pub struct ResolutionContext<'s, S> {
    store: &'s S,
    options: ResolverOptions,
    locales: Option<Vec<Locale>>,
    default_locale: Option<Locale>,
    predecessors: HashMap<ItemRef, Option<TranslatableItem>>,
    sources: HashMap<ItemRef, TranslatableItem>,
    stats: ResolutionStats,
}

impl<'s, S: TranslationStore> ResolutionContext<'s, S> {
    pub fn new(store: &'s S, options: ResolverOptions) -> Self {
        Self {
            store,
            options,
            locales: None,
            default_locale: None,
            predecessors: HashMap::new(),
            sources: HashMap::new(),
            stats: ResolutionStats::default(),
        }
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }

    /// Configured locales, loaded once per context.
    pub async fn locales(&mut self) -> ResolveResult<&[Locale]> {
        if self.locales.is_none() {
            self.stats.store_lookups += 1;
            self.locales = Some(self.store.list_locales().await?);
        }
        Ok(self.locales.as_deref().unwrap_or_default())
    }

    pub async fn default_locale(&mut self) -> ResolveResult<Locale> {
        if let Some(locale) = &self.default_locale {
            return Ok(locale.clone());
        }
        self.stats.store_lookups += 1;
        let locale = self.store.get_default_locale().await?;
        self.default_locale = Some(locale.clone());
        Ok(locale)
    }

    async fn ensure_known_locale(&mut self, target: &ItemRef, code: &str) -> ResolveResult<()> {
        let known = self
            .locales()
            .await?
            .iter()
            .any(|l| l.language_code() == code);
        if known {
            Ok(())
        } else {
            Err(DataIntegrityError::UnknownLocale {
                target: target.clone(),
                locale: code.to_string(),
            }
            .into())
        }
    }

    /// A record pointed at an item that is gone. If the record is gone as
    /// well, a concurrent delete raced with us and the answer is "not
    /// found"; otherwise the record dangles.
    async fn check_dangling(
        &mut self,
        record: &TranslationRecord,
        missing: ItemRef,
    ) -> ResolveResult<()> {
        self.stats.store_lookups += 1;
        let still_there = self
            .store
            .find_translation_record(&record.translation_key, &record.target_locale)
            .await?
            .is_some_and(|r| r.source_locale == record.source_locale);

        if still_there {
            Err(DataIntegrityError::DanglingRecord {
                source_ref: record.source_ref(),
                target: record.target_ref(),
                missing,
            }
            .into())
        } else {
            debug!("Record {} -> {} vanished mid-lookup", record.source_ref(), record.target_ref());
            Ok(())
        }
    }

    /// The item this one was directly translated from, or `None` for an
    /// original.
    pub async fn resolve_predecessor(
        &mut self,
        item: &TranslatableItem,
    ) -> ResolveResult<Option<TranslatableItem>> {
        let item_ref = item.item_ref();
        if let Some(cached) = self.predecessors.get(&item_ref) {
            self.stats.memo_hits += 1;
            return Ok(cached.clone());
        }
        self.stats.memo_misses += 1;

        self.stats.store_lookups += 1;
        let record = self
            .store
            .find_translation_record(&item.translation_key, &item.locale)
            .await?;

        let predecessor = match record {
            None => None,
            Some(record) => {
                self.ensure_known_locale(&item_ref, &record.source_locale)
                    .await?;

                self.stats.store_lookups += 1;
                let source = self
                    .store
                    .find_item(&record.translation_key, &record.source_locale)
                    .await?;

                match source {
                    Some(source) => Some(source),
                    None => {
                        self.check_dangling(&record, record.source_ref()).await?;
                        None
                    }
                }
            }
        };

        self.predecessors.insert(item_ref, predecessor.clone());
        Ok(predecessor)
    }

    /// The predecessor, or the item itself when it is an original.
    pub async fn predecessor_or_self(
        &mut self,
        item: &TranslatableItem,
    ) -> ResolveResult<TranslatableItem> {
        Ok(self
            .resolve_predecessor(item)
            .await?
            .unwrap_or_else(|| item.clone()))
    }

    /// The original item at the root of this item's predecessor chain
    /// (the item itself when it has no predecessor).
    pub async fn resolve_source(
        &mut self,
        item: &TranslatableItem,
    ) -> ResolveResult<TranslatableItem> {
        let start = item.item_ref();
        if let Some(cached) = self.sources.get(&start) {
            self.stats.memo_hits += 1;
            return Ok(cached.clone());
        }
        self.stats.memo_misses += 1;

        let mut visited: HashSet<ItemRef> = HashSet::from([start.clone()]);
        let mut walked = vec![start.clone()];
        let mut current = item.clone();
        let mut steps = 0;

        while let Some(predecessor) = self.resolve_predecessor(&current).await? {
            steps += 1;
            if steps > self.options.max_depth {
                return Err(DataIntegrityError::ChainTooLong {
                    start,
                    max_depth: self.options.max_depth,
                }
                .into());
            }

            let predecessor_ref = predecessor.item_ref();
            if !visited.insert(predecessor_ref.clone()) {
                return Err(DataIntegrityError::Cycle {
                    start,
                    item: predecessor_ref,
                }
                .into());
            }

            if let Some(known) = self.sources.get(&predecessor_ref) {
                current = known.clone();
                break;
            }

            walked.push(predecessor_ref);
            current = predecessor;
        }

        for item_ref in walked {
            self.sources.insert(item_ref, current.clone());
        }
        Ok(current)
    }

    /// Items translated directly from this one, in record order.
    pub async fn direct_translations(
        &mut self,
        item: &TranslatableItem,
    ) -> ResolveResult<Vec<TranslatableItem>> {
        self.stats.store_lookups += 1;
        let records = self
            .store
            .find_records_by_source(&item.translation_key, &item.locale)
            .await?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        for record in &records {
            self.ensure_known_locale(&record.target_ref(), &record.target_locale)
                .await?;
        }

        let store = self.store;
        self.stats.store_lookups += records.len();
        let targets = try_join_all(
            records
                .iter()
                .map(|r| store.find_item(&r.translation_key, &r.target_locale)),
        )
        .await?;

        let mut translations = Vec::with_capacity(records.len());
        for (record, target) in records.iter().zip(targets) {
            match target {
                Some(target) => {
                    // The edge we just followed is the target's predecessor.
                    self.predecessors
                        .insert(target.item_ref(), Some(item.clone()));
                    translations.push(target);
                }
                None => self.check_dangling(record, record.target_ref()).await?,
            }
        }

        Ok(translations)
    }

    /// Every item reachable by following translation records forward,
    /// level by level.
    pub async fn resolve_descendants(
        &mut self,
        item: &TranslatableItem,
    ) -> ResolveResult<Vec<TranslatableItem>> {
        let start = item.item_ref();
        let mut visited: HashSet<ItemRef> = HashSet::from([start.clone()]);
        let mut descendants = Vec::new();
        let mut level = vec![item.clone()];
        let mut depth = 0;

        while !level.is_empty() {
            let mut next = Vec::new();
            for parent in &level {
                for child in self.direct_translations(parent).await? {
                    let child_ref = child.item_ref();
                    if !visited.insert(child_ref.clone()) {
                        return Err(DataIntegrityError::Cycle {
                            start,
                            item: child_ref,
                        }
                        .into());
                    }
                    next.push(child);
                }
            }

            if next.is_empty() {
                break;
            }
            depth += 1;
            if depth > self.options.max_depth {
                return Err(DataIntegrityError::ChainTooLong {
                    start,
                    max_depth: self.options.max_depth,
                }
                .into());
            }

            descendants.extend(next.iter().cloned());
            level = next;
        }

        debug!(
            "Resolved {} descendants of {} over {} levels",
            descendants.len(),
            start,
            depth
        );
        Ok(descendants)
    }

    /// The locale-variant of `item` in `locale`, if any.
    pub async fn find_translation(
        &mut self,
        item: &TranslatableItem,
        locale: &str,
    ) -> ResolveResult<Option<TranslatableItem>> {
        if item.locale == locale {
            return Ok(Some(item.clone()));
        }
        self.stats.store_lookups += 1;
        Ok(self.store.find_item(&item.translation_key, locale).await?)
    }

    /// Every locale-variant sharing the item's translation key, the item
    /// included, in locale order.
    pub async fn variants(
        &mut self,
        item: &TranslatableItem,
    ) -> ResolveResult<Vec<TranslatableItem>> {
        self.stats.store_lookups += 1;
        Ok(self.store.find_items_by_key(&item.translation_key).await?)
    }

    /// The variant of `item` in the active locale, live or not. Returns the
    /// item itself when localisation is disabled or it is already in the
    /// active locale.
    pub async fn localized_draft_or_none(
        &mut self,
        item: &TranslatableItem,
        active_locale: &str,
    ) -> ResolveResult<Option<TranslatableItem>> {
        if !self.options.i18n_enabled || item.locale == active_locale {
            return Ok(Some(item.clone()));
        }
        self.find_translation(item, active_locale).await
    }

    /// As [`Self::localized_draft_or_none`], but only live variants.
    pub async fn localized_or_none(
        &mut self,
        item: &TranslatableItem,
        active_locale: &str,
    ) -> ResolveResult<Option<TranslatableItem>> {
        Ok(self
            .localized_draft_or_none(item, active_locale)
            .await?
            .filter(TranslatableItem::is_live))
    }
}
