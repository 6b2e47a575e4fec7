//! Locale handling for the translation graph.
//!
//! # Architecture
//!
//! - `locale`: the `Locale` descriptor (language code plus display name)
//! - `registry`: the ordered, admin-configured set of locales with exactly
//!   one default
//!
//! # Example
//!
//! ```rust,ignore
//! use translation_graph::i18n::{Locale, LocaleRegistry};
//!
//! let registry = LocaleRegistry::new(
//!     vec![Locale::new("en", "English"), Locale::new("es", "Español")],
//!     "en",
//! )?;
//! assert_eq!(registry.default_locale().language_code(), "en");
//! ```

mod locale;
mod registry;

pub use locale::{normalize_code, parse_locale_list, Locale};
pub use registry::{LocaleRegistry, RegistryError};
