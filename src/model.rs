//! Translatable items and the records linking them.

use crate::capabilities::Capabilities;
use crate::i18n::normalize_code;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier shared by all locale-variants of one logical item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationKey(String);

impl TranslationKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TranslationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TranslationKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for TranslationKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// `(translation_key, locale)`: the identity of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemRef {
    pub translation_key: TranslationKey,
    pub locale: String,
}

impl ItemRef {
    pub fn new(translation_key: impl Into<TranslationKey>, locale: impl Into<String>) -> Self {
        Self {
            translation_key: translation_key.into(),
            locale: normalize_code(&locale.into()),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.translation_key, self.locale)
    }
}

/// A page or snippet in one locale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslatableItem {
    pub translation_key: TranslationKey,
    pub locale: String,
    pub title: String,
    /// Relative URL; only CMS pages have one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_path: Option<String>,
    #[serde(default = "default_true")]
    pub search_engine_index: bool,
    #[serde(default)]
    pub capabilities: Capabilities,
}

fn default_true() -> bool {
    true
}

impl TranslatableItem {
    /// A snippet (menu, product, icon): no URL of its own.
    pub fn snippet(
        translation_key: impl Into<TranslationKey>,
        locale: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            translation_key: translation_key.into(),
            locale: normalize_code(&locale.into()),
            title: title.into(),
            url_path: None,
            search_engine_index: false,
            capabilities: Capabilities::default(),
        }
    }

    /// A CMS page served at `url_path`.
    pub fn page(
        translation_key: impl Into<TranslationKey>,
        locale: impl Into<String>,
        title: impl Into<String>,
        url_path: impl Into<String>,
    ) -> Self {
        Self {
            translation_key: translation_key.into(),
            locale: normalize_code(&locale.into()),
            title: title.into(),
            url_path: Some(url_path.into()),
            search_engine_index: true,
            capabilities: Capabilities::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn item_ref(&self) -> ItemRef {
        ItemRef {
            translation_key: self.translation_key.clone(),
            locale: self.locale.clone(),
        }
    }

    pub fn is_page(&self) -> bool {
        self.url_path.is_some()
    }

    pub fn is_live(&self) -> bool {
        self.capabilities.is_live()
    }
}

impl fmt::Display for TranslatableItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.title, self.locale)
    }
}

/// Directed edge: the item `(translation_key, source_locale)` was translated
/// into `(translation_key, target_locale)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRecord {
    pub translation_key: TranslationKey,
    pub source_locale: String,
    pub target_locale: String,
    pub created_at: DateTime<Utc>,
}

impl TranslationRecord {
    pub fn new(
        translation_key: impl Into<TranslationKey>,
        source_locale: impl Into<String>,
        target_locale: impl Into<String>,
    ) -> Self {
        Self {
            translation_key: translation_key.into(),
            source_locale: normalize_code(&source_locale.into()),
            target_locale: normalize_code(&target_locale.into()),
            created_at: Utc::now(),
        }
    }

    pub fn source_ref(&self) -> ItemRef {
        ItemRef::new(self.translation_key.clone(), self.source_locale.clone())
    }

    pub fn target_ref(&self) -> ItemRef {
        ItemRef::new(self.translation_key.clone(), self.target_locale.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::DraftState;

    #[test]
    fn test_item_ref_display() {
        assert_eq!(ItemRef::new("T1", "es").to_string(), "T1[es]");
    }

    #[test]
    fn test_page_and_snippet_constructors() {
        let page = TranslatableItem::page("T1", "en", "Products", "/en/products/");
        assert!(page.is_page());
        assert!(page.search_engine_index);

        let menu = TranslatableItem::snippet("M1", "en", "Main menu");
        assert!(!menu.is_page());
        assert!(menu.is_live());
    }

    #[test]
    fn test_liveness_follows_capabilities() {
        let page = TranslatableItem::page("T1", "es", "Productos", "/es/productos/")
            .with_capabilities(Capabilities::new().with_draft(DraftState::draft()));
        assert!(!page.is_live());
    }

    #[test]
    fn test_locale_codes_are_normalised() {
        let page = TranslatableItem::page("T1", " EN ", "Home", "/en/");
        assert_eq!(page.locale, "en");
        assert_eq!(page.item_ref(), ItemRef::new("T1", "En"));

        let record = TranslationRecord::new("T1", "EN", "Es");
        assert_eq!(record.source_locale, "en");
        assert_eq!(record.target_locale, "es");
    }

    #[test]
    fn test_record_refs() {
        let record = TranslationRecord::new("T1", "en", "es");
        assert_eq!(record.source_ref(), ItemRef::new("T1", "en"));
        assert_eq!(record.target_ref(), ItemRef::new("T1", "es"));
    }

    #[test]
    fn test_item_deserialize_defaults() {
        let item: TranslatableItem = serde_json::from_str(
            r#"{"translation_key":"T1","locale":"en","title":"Home","url_path":"/en/"}"#,
        )
        .unwrap();
        assert!(item.search_engine_index);
        assert_eq!(item.capabilities, Capabilities::default());
        assert_eq!(item.translation_key.as_str(), "T1");
    }
}
