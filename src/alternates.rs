//! `<link rel="alternate" hreflang=..>` data for pages.

use crate::error::ResolveResult;
use crate::model::TranslatableItem;
use crate::resolver::ResolutionContext;
use crate::store::TranslationStore;
use serde::Serialize;

/// hreflang value advertising the fallback URL.
pub const X_DEFAULT: &str = "x-default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlternateLink {
    pub lang_code: String,
    pub location: String,
}

/// Language code and relative URL of every live page sharing the item's
/// translation key, the item itself included, in locale order.
pub async fn translations<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    item: &TranslatableItem,
) -> ResolveResult<Vec<(String, String)>> {
    let variants = ctx.variants(item).await?;

    Ok(variants
        .into_iter()
        .filter(TranslatableItem::is_live)
        .filter_map(|v| v.url_path.map(|url| (v.locale, url)))
        .collect())
}

/// One absolute link per live translation, then an `x-default` entry:
/// the default locale's URL, else the first translation's, else the item's
/// own.
pub async fn build_alternate_links<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    item: &TranslatableItem,
    site_root: &str,
) -> ResolveResult<Vec<AlternateLink>> {
    let site_root = site_root.trim_end_matches('/');
    let translations = translations(ctx, item).await?;
    let default_locale = ctx.default_locale().await?;

    let x_default = translations
        .iter()
        .find(|(code, _)| code == default_locale.language_code())
        .or_else(|| translations.first())
        .map(|(_, url)| url.clone())
        .unwrap_or_else(|| item.url_path.clone().unwrap_or_else(|| "/".to_string()));

    let mut links: Vec<AlternateLink> = translations
        .into_iter()
        .map(|(lang_code, url)| AlternateLink {
            lang_code,
            location: format!("{}{}", site_root, url),
        })
        .collect();

    links.push(AlternateLink {
        lang_code: X_DEFAULT.to_string(),
        location: format!("{}{}", site_root, x_default),
    });

    Ok(links)
}
