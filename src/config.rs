use crate::i18n::{normalize_code, parse_locale_list, Locale, LocaleRegistry, RegistryError};
use crate::lifecycle::CascadePolicy;
use crate::resolver::{ResolverOptions, DEFAULT_MAX_DEPTH};
use anyhow::{anyhow, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,

    // HTTP
    pub port: u16,
    pub site_root_url: String,
    pub api_key: Option<String>,

    // Locales
    pub locales: Vec<Locale>,
    pub default_locale: String,
    pub i18n_enabled: bool,

    // Translation graph
    pub max_translation_depth: usize,
    pub delete_cascade: CascadePolicy,
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{} must be a boolean, got '{}'", name, other)),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let locales = parse_locale_list(
            &std::env::var("LOCALES").unwrap_or_else(|_| "en=English,es=Español".to_string()),
        )
        .context("Invalid LOCALES")?;

        let default_locale = match std::env::var("DEFAULT_LOCALE") {
            Ok(code) if !code.trim().is_empty() => normalize_code(&code),
            // parse_locale_list never returns an empty list
            _ => locales
                .first()
                .map(|l| l.language_code().to_string())
                .unwrap_or_default(),
        };

        let config = Self {
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL not set")?,

            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
            site_root_url: std::env::var("SITE_ROOT_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            api_key: std::env::var("API_KEY").ok().filter(|k| !k.is_empty()),

            locales,
            default_locale,
            i18n_enabled: match std::env::var("I18N_ENABLED") {
                Ok(raw) => parse_bool("I18N_ENABLED", &raw)?,
                Err(_) => true,
            },

            max_translation_depth: std::env::var("MAX_TRANSLATION_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|depth| *depth > 0)
                .unwrap_or(DEFAULT_MAX_DEPTH),
            delete_cascade: match std::env::var("TRANSLATION_DELETE_CASCADE") {
                Ok(raw) => raw
                    .parse()
                    .map_err(|e: String| anyhow!(e))
                    .context("Invalid TRANSLATION_DELETE_CASCADE")?,
                Err(_) => CascadePolicy::default(),
            },
        };

        config.registry().context("Invalid DEFAULT_LOCALE")?;
        Ok(config)
    }

    pub fn registry(&self) -> std::result::Result<LocaleRegistry, RegistryError> {
        LocaleRegistry::new(self.locales.clone(), &self.default_locale)
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            max_depth: self.max_translation_depth,
            i18n_enabled: self.i18n_enabled,
        }
    }
}
