//! Translation graph resolver and language switcher.
//!
//! Items sharing a translation key are linked by translation records
//! (target was translated from source). The resolver walks those records
//! to find predecessors, originals and descendants; the switcher, alternate
//! links and sitemap are built on top of it.

pub mod alternates;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod i18n;
pub mod lifecycle;
pub mod model;
pub mod resolver;
pub mod retry;
pub mod routing;
pub mod server;
pub mod sitemap;
pub mod store;
pub mod switcher;

pub use error::{DataIntegrityError, ResolveError, StoreError};
pub use model::{ItemRef, TranslatableItem, TranslationKey, TranslationRecord};
pub use resolver::{ResolutionContext, ResolverOptions};
pub use store::{MemoryStore, PgStore, TranslationStore};
