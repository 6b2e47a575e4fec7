//! Locale type: a language code and the name shown to visitors.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical form of a language code: trimmed and lowercase.
///
/// Every code entering the crate (configuration, items, records, request
/// parameters) goes through here, so `EN` and `en` name the same locale.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// A configured site locale.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locale {
    /// Language code as used in URLs and hreflang (e.g., "en", "es-mx")
    language_code: String,

    /// Name shown in the language switcher (e.g., "English", "Español")
    display_name: String,
}

impl Locale {
    /// Create a locale descriptor. The code goes through [`normalize_code`].
    pub fn new(language_code: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            language_code: normalize_code(&language_code.into()),
            display_name: display_name.into().trim().to_string(),
        }
    }

    /// Get the language code.
    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    /// Get the display name used by the language switcher.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Root URL of this locale's home page, used when a page has no live
    /// translation in the locale.
    pub fn root_url(&self) -> String {
        format!("/{}/", self.language_code)
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name, self.language_code)
    }
}

/// Parse an ordered locale list of the form `en=English,es=Español`.
///
/// A bare code without `=` uses the code as its display name. Order is
/// preserved because it drives the order of switcher entries.
pub fn parse_locale_list(raw: &str) -> Result<Vec<Locale>> {
    let mut locales: Vec<Locale> = Vec::new();

    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (code, name) = match entry.split_once('=') {
            Some((code, name)) => (code.trim(), name.trim()),
            None => (entry, entry),
        };

        if code.is_empty() {
            bail!("Locale entry '{}' has an empty language code", entry);
        }
        if !code
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            bail!("Invalid language code: '{}'", code);
        }

        let locale = Locale::new(code, if name.is_empty() { code } else { name });
        if locales
            .iter()
            .any(|l| l.language_code() == locale.language_code())
        {
            bail!("Duplicate language code: '{}'", locale.language_code());
        }
        locales.push(locale);
    }

    if locales.is_empty() {
        bail!("Locale list is empty");
    }

    Ok(locales)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Constructor Tests ====================

    #[test]
    fn test_new_normalises_code() {
        let locale = Locale::new(" ES-MX ", "Español (México)");
        assert_eq!(locale.language_code(), "es-mx");
        assert_eq!(locale.display_name(), "Español (México)");
    }

    #[test]
    fn test_root_url() {
        assert_eq!(Locale::new("ca", "Català").root_url(), "/ca/");
    }

    #[test]
    fn test_display() {
        let locale = Locale::new("es", "Español");
        assert_eq!(locale.to_string(), "Español (es)");
    }

    // ==================== parse_locale_list Tests ====================

    #[test]
    fn test_parse_locale_list_preserves_order() {
        let locales = parse_locale_list("en=English, es=Español ,ca=Català").unwrap();
        let codes: Vec<_> = locales.iter().map(|l| l.language_code()).collect();
        assert_eq!(codes, vec!["en", "es", "ca"]);
        assert_eq!(locales[1].display_name(), "Español");
    }

    #[test]
    fn test_parse_locale_list_bare_code() {
        let locales = parse_locale_list("en,fr").unwrap();
        assert_eq!(locales[1].display_name(), "fr");
    }

    #[test]
    fn test_parse_locale_list_empty() {
        assert!(parse_locale_list("").is_err());
        assert!(parse_locale_list(" , ").is_err());
    }

    #[test]
    fn test_parse_locale_list_duplicate() {
        let result = parse_locale_list("en=English,EN=Again");
        assert!(result.unwrap_err().to_string().contains("Duplicate"));
    }

    #[test]
    fn test_parse_locale_list_invalid_code() {
        assert!(parse_locale_list("e n=English").is_err());
        assert!(parse_locale_list("=English").is_err());
    }
}
