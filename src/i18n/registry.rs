//! Locale registry: the ordered set of configured locales.
//!
//! Unlike a process-wide singleton, a registry is built from configuration
//! (or from a store's locale table) and passed to whoever needs it.

use crate::i18n::{normalize_code, Locale};
use thiserror::Error;

/// Errors raised while assembling a registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no locales configured")]
    Empty,

    #[error("default locale '{0}' is not among the configured locales")]
    UnknownDefault(String),
}

/// Ordered locales with exactly one default.
#[derive(Debug, Clone)]
pub struct LocaleRegistry {
    locales: Vec<Locale>,
    default_index: usize,
}

impl LocaleRegistry {
    /// Build a registry from an ordered list and the default locale's code.
    pub fn new(locales: Vec<Locale>, default_code: &str) -> Result<Self, RegistryError> {
        if locales.is_empty() {
            return Err(RegistryError::Empty);
        }

        let wanted = normalize_code(default_code);
        let default_index = locales
            .iter()
            .position(|l| l.language_code() == wanted)
            .ok_or_else(|| RegistryError::UnknownDefault(default_code.to_string()))?;

        Ok(Self {
            locales,
            default_index,
        })
    }

    /// All locales in configured order.
    pub fn list(&self) -> &[Locale] {
        &self.locales
    }

    /// The default locale.
    pub fn default_locale(&self) -> &Locale {
        &self.locales[self.default_index]
    }

    /// Position of a locale in configured order, used for sorting.
    pub fn position(&self, code: &str) -> Option<usize> {
        let code = normalize_code(code);
        self.locales.iter().position(|l| l.language_code() == code)
    }
}
