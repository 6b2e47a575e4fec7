//! Creating, translating and deleting translatable items.

use crate::capabilities::DraftState;
use crate::error::{ResolveError, StoreError};
use crate::i18n::normalize_code;
use crate::model::{ItemRef, TranslatableItem, TranslationRecord};
use crate::resolver::ResolutionContext;
use crate::store::TranslationStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("locale '{0}' is not configured")]
    UnknownLocale(String),

    #[error("{0} already exists")]
    AlreadyExists(ItemRef),

    #[error("{item} must be created in the default locale ({default_locale}) and translated from there")]
    OutsideDefaultLocale { item: ItemRef, default_locale: String },

    #[error("{0} does not exist")]
    NotFound(ItemRef),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        LifecycleError::Resolve(ResolveError::Store(err))
    }
}

/// What happens to translations when an item is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadePolicy {
    /// Delete every descendant, however deep.
    #[default]
    Transitive,
    /// Delete only items translated directly from this one.
    DirectOnly,
    /// Delete only the item; its translations become originals.
    None,
}

impl FromStr for CascadePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transitive" | "all" => Ok(Self::Transitive),
            "direct" | "direct_only" => Ok(Self::DirectOnly),
            "none" | "off" => Ok(Self::None),
            other => Err(format!(
                "Unknown cascade policy '{}' (expected transitive, direct or none)",
                other
            )),
        }
    }
}

impl fmt::Display for CascadePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Transitive => "transitive",
            Self::DirectOnly => "direct",
            Self::None => "none",
        })
    }
}

async fn ensure_locale<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    code: &str,
) -> Result<(), LifecycleError> {
    if ctx.locales().await?.iter().any(|l| l.language_code() == code) {
        Ok(())
    } else {
        Err(LifecycleError::UnknownLocale(code.to_string()))
    }
}

/// Store a new item.
///
/// Originals may only be created in the default locale; an item in another
/// locale is accepted only when its translation key already exists.
pub async fn create_item<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    mut item: TranslatableItem,
) -> Result<(), LifecycleError> {
    item.locale = normalize_code(&item.locale);
    ensure_locale(ctx, &item.locale).await?;
    let item_ref = item.item_ref();

    let variants = ctx.variants(&item).await?;
    if variants.iter().any(|v| v.locale == item.locale) {
        return Err(LifecycleError::AlreadyExists(item_ref));
    }

    let default_locale = ctx.default_locale().await?;
    if item.locale != default_locale.language_code() && variants.is_empty() {
        return Err(LifecycleError::OutsideDefaultLocale {
            item: item_ref,
            default_locale: default_locale.language_code().to_string(),
        });
    }

    ctx.store().insert_item(item).await.map_err(|e| match e {
        StoreError::Conflict(_) => LifecycleError::AlreadyExists(item_ref.clone()),
        other => other.into(),
    })?;
    info!("Created {}", item_ref);
    Ok(())
}

/// Translate `source` into `target_locale`: creates the target item and the
/// record linking them. A draftable source yields an unpublished copy.
pub async fn translate_item<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    source: &TranslatableItem,
    target_locale: &str,
) -> Result<TranslatableItem, LifecycleError> {
    let target_locale = normalize_code(target_locale);
    let target_locale = target_locale.as_str();
    ensure_locale(ctx, target_locale).await?;

    let target_ref = ItemRef::new(source.translation_key.clone(), target_locale);
    if ctx.find_translation(source, target_locale).await?.is_some() {
        return Err(LifecycleError::AlreadyExists(target_ref));
    }
    // A stale record may still name the target.
    let store = ctx.store();
    if store
        .find_translation_record(&source.translation_key, target_locale)
        .await?
        .is_some()
    {
        return Err(LifecycleError::AlreadyExists(target_ref));
    }

    let mut target = source.clone();
    target.locale = target_locale.to_string();
    target.url_path = source
        .url_path
        .as_deref()
        .map(|url| relocate_url(url, &source.locale, target_locale));
    if target.capabilities.draft.is_some() {
        target.capabilities.draft = Some(DraftState::draft());
    }
    if let Some(lock) = target.capabilities.lock.as_mut() {
        lock.locked = false;
        lock.locked_by = None;
        lock.locked_at = None;
    }
    target.capabilities.workflow = None;

    store.insert_item(target.clone()).await.map_err(|e| match e {
        StoreError::Conflict(_) => LifecycleError::AlreadyExists(target_ref.clone()),
        other => other.into(),
    })?;
    let record = TranslationRecord::new(
        source.translation_key.clone(),
        source.locale.clone(),
        target_locale,
    );
    if let Err(err) = store.insert_record(record).await {
        warn!("Linking {} failed, removing it: {}", target_ref, err);
        store.delete_item(&target_ref).await?;
        return Err(match err {
            StoreError::Conflict(_) => LifecycleError::AlreadyExists(target_ref),
            other => other.into(),
        });
    }

    info!("Translated {} into {}", source.item_ref(), target_locale);
    Ok(target)
}

/// Swap a leading `/<source>/` segment for `/<target>/`.
fn relocate_url(url: &str, source_locale: &str, target_locale: &str) -> String {
    let prefix = format!("/{}/", source_locale);
    match url.strip_prefix(&prefix) {
        Some(rest) => format!("/{}/{}", target_locale, rest),
        None => url.to_string(),
    }
}

/// Delete an item and, per `policy`, its translations. Descendants are
/// removed deepest level first. Returns the deleted refs in deletion order.
pub async fn delete_item<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    item: &TranslatableItem,
    policy: CascadePolicy,
) -> Result<Vec<ItemRef>, LifecycleError> {
    let cascade = match policy {
        CascadePolicy::Transitive => ctx.resolve_descendants(item).await?,
        CascadePolicy::DirectOnly => ctx.direct_translations(item).await?,
        CascadePolicy::None => Vec::new(),
    };

    let store = ctx.store();
    let mut deleted = Vec::with_capacity(cascade.len() + 1);
    for descendant in cascade.iter().rev() {
        let descendant_ref = descendant.item_ref();
        if store.delete_item(&descendant_ref).await? {
            deleted.push(descendant_ref);
        }
    }

    let item_ref = item.item_ref();
    if !store.delete_item(&item_ref).await? {
        return Err(LifecycleError::NotFound(item_ref));
    }
    deleted.push(item_ref);

    info!(
        "Deleted {} ({} cascade, {} items)",
        item.item_ref(),
        policy,
        deleted.len()
    );
    Ok(deleted)
}
