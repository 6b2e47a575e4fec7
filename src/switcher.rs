//! Language switcher data.
//!
//! For every configured locale other than the active one the switcher
//! works out where a visitor should land: the live translation of the
//! current page (mapped onto the same sub-route for routable pages), or
//! the locale's home page when there is none.

use crate::error::ResolveResult;
use crate::i18n::{normalize_code, Locale};
use crate::model::TranslatableItem;
use crate::resolver::ResolutionContext;
use crate::routing::RoutingError;
use crate::store::TranslationStore;
use serde::Serialize;
use tracing::{debug, warn};
use url::form_urlencoded;

/// One locale the visitor can switch to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitcherEntry {
    pub display_name: String,
    pub language_code: String,
    /// Where to go after switching. `None` lets the language view decide
    /// (e.g. from the referrer).
    pub target_url: Option<String>,
}

impl SwitcherEntry {
    /// Link to the language view, carrying the target as an encoded
    /// `?next=` parameter.
    pub fn switch_url(&self) -> String {
        match &self.target_url {
            Some(target) => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair("next", target)
                    .finish();
                format!("/lang/{}/?{}", self.language_code, query)
            }
            None => format!("/lang/{}/", self.language_code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SwitcherModel {
    /// The active locale; `None` if it is not configured.
    pub current: Option<Locale>,
    pub alternatives: Vec<SwitcherEntry>,
}

/// Build the switcher for `page` as seen at `request_path`.
///
/// `page` is `None` (or a snippet without a URL) for views that are not
/// CMS pages; their entries carry no target.
pub async fn build_switcher<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    page: Option<&TranslatableItem>,
    request_path: &str,
    active_locale: &str,
    all_locales: &[Locale],
) -> SwitcherModel {
    let active_locale = normalize_code(active_locale);
    let mut current = None;
    let mut alternatives = Vec::with_capacity(all_locales.len().saturating_sub(1));

    for locale in all_locales {
        if locale.language_code() == active_locale {
            current = Some(locale.clone());
            continue;
        }

        let target_url = match page.filter(|p| p.is_page()) {
            None => None,
            Some(page) => match target_for_locale(ctx, page, request_path, locale).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!(
                        "Omitting {} from language switcher for {}: {}",
                        locale.language_code(),
                        page.item_ref(),
                        e
                    );
                    continue;
                }
            },
        };

        alternatives.push(SwitcherEntry {
            display_name: locale.display_name().to_string(),
            language_code: locale.language_code().to_string(),
            target_url,
        });
    }

    SwitcherModel {
        current,
        alternatives,
    }
}

async fn target_for_locale<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    page: &TranslatableItem,
    request_path: &str,
    locale: &Locale,
) -> ResolveResult<String> {
    let translated = ctx
        .find_translation(page, locale.language_code())
        .await?
        .filter(|t| t.is_live());

    let Some(translated) = translated else {
        return Ok(locale.root_url());
    };
    let Some(translated_url) = translated.url_path.as_deref() else {
        return Ok(locale.root_url());
    };

    if page.capabilities.routes.is_none() {
        return Ok(translated_url.to_string());
    }

    match translate_subroute(page, &translated, request_path) {
        Ok(subpath) => Ok(format!("{}{}", translated_url, subpath)),
        Err(e) => {
            debug!(
                "Sub-route of {} not mapped onto {}: {}",
                request_path,
                translated.item_ref(),
                e
            );
            Ok(translated_url.to_string())
        }
    }
}

/// Map the sub-route the visitor is on to the same route of `translated`.
/// Parameters are carried over untranslated.
fn translate_subroute(
    page: &TranslatableItem,
    translated: &TranslatableItem,
    request_path: &str,
) -> Result<String, RoutingError> {
    let page_url = page.url_path.as_deref().unwrap_or("/");
    let routes = page
        .capabilities
        .routes
        .as_ref()
        .ok_or_else(|| RoutingError::NoMatch(request_path.to_string()))?;
    let target_routes = translated.capabilities.routes.as_ref().unwrap_or(routes);

    let subpath = match request_path.strip_prefix(page_url) {
        Some(rest) => format!("/{}", rest),
        None => return Err(RoutingError::NoMatch(request_path.to_string())),
    };

    let matched = routes.resolve(&subpath)?;
    target_routes.reverse(&matched.name, &matched.kwargs)
}
