//! HTTP surface: item lookups, switcher, sitemap and deletion.

use crate::alternates::{build_alternate_links, AlternateLink};
use crate::config::Config;
use crate::error::ResolveError;
use crate::i18n::{normalize_code, Locale};
use crate::lifecycle::{self, LifecycleError};
use crate::model::{ItemRef, TranslatableItem, TranslationKey};
use crate::resolver::ResolutionContext;
use crate::sitemap::{build_urlset, render_sitemap};
use crate::store::TranslationStore;
use crate::switcher::{build_switcher, SwitcherEntry};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

pub struct AppState<S> {
    pub store: Arc<S>,
    pub config: Arc<Config>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S: TranslationStore> AppState<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }

    fn context(&self) -> ResolutionContext<'_, S> {
        ResolutionContext::new(&*self.store, self.config.resolver_options())
    }
}

/// Errors rendered as `{"error": ..}` with a status code.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unauthorized,
    Unavailable(String),
    Internal(String),
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Integrity(e) => {
                error!("Translation graph integrity violation: {}", e);
                ApiError::Internal(e.to_string())
            }
            ResolveError::Store(e) => {
                warn!("Store unavailable: {}", e);
                ApiError::Unavailable(e.to_string())
            }
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::UnknownLocale(_) | LifecycleError::OutsideDefaultLocale { .. } => {
                ApiError::BadRequest(err.to_string())
            }
            LifecycleError::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            LifecycleError::NotFound(_) => ApiError::NotFound(err.to_string()),
            LifecycleError::Resolve(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "invalid API key".to_string()),
            ApiError::Unavailable(m) => (StatusCode::SERVICE_UNAVAILABLE, m),
            ApiError::Internal(m) => (StatusCode::INTERNAL_SERVER_ERROR, m),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router<S: TranslationStore + 'static>(state: AppState<S>) -> Router {
    Router::new()
        .route("/health", get(health::<S>))
        .route("/sitemap.xml", get(sitemap::<S>))
        .route("/api/switcher", get(switcher::<S>))
        .route(
            "/api/items/:key/:locale",
            get(get_item::<S>).delete(delete_item::<S>),
        )
        .route("/api/items/:key/:locale/predecessor", get(predecessor::<S>))
        .route("/api/items/:key/:locale/source", get(source::<S>))
        .route("/api/items/:key/:locale/descendants", get(descendants::<S>))
        .route("/api/items/:key/:locale/alternates", get(alternates::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn log_stats<S: TranslationStore>(operation: &str, ctx: &ResolutionContext<'_, S>) {
    let stats = ctx.stats();
    debug!(
        "{}: {} store lookups, {} memo hits, {} memo misses",
        operation, stats.store_lookups, stats.memo_hits, stats.memo_misses
    );
}

async fn load_item<S: TranslationStore>(
    ctx: &ResolutionContext<'_, S>,
    key: &str,
    locale: &str,
) -> ApiResult<TranslatableItem> {
    let item_ref = ItemRef::new(key, locale);
    ctx.store()
        .find_item(&item_ref.translation_key, &item_ref.locale)
        .await
        .map_err(ResolveError::from)?
        .ok_or_else(|| ApiError::NotFound(format!("{} does not exist", item_ref)))
}

// ==================== Handlers ====================

async fn health<S: TranslationStore>(State(state): State<AppState<S>>) -> ApiResult<Json<serde_json::Value>> {
    let locales = state.store.list_locales().await.map_err(ResolveError::from)?;
    Ok(Json(json!({ "status": "ok", "locales": locales.len() })))
}

async fn get_item<S: TranslationStore>(
    State(state): State<AppState<S>>,
    Path((key, locale)): Path<(String, String)>,
) -> ApiResult<Json<TranslatableItem>> {
    let ctx = state.context();
    Ok(Json(load_item(&ctx, &key, &locale).await?))
}

/// `null` for originals.
async fn predecessor<S: TranslationStore>(
    State(state): State<AppState<S>>,
    Path((key, locale)): Path<(String, String)>,
) -> ApiResult<Json<Option<TranslatableItem>>> {
    let mut ctx = state.context();
    let item = load_item(&ctx, &key, &locale).await?;
    let predecessor = ctx.resolve_predecessor(&item).await?;
    log_stats("predecessor", &ctx);
    Ok(Json(predecessor))
}

async fn source<S: TranslationStore>(
    State(state): State<AppState<S>>,
    Path((key, locale)): Path<(String, String)>,
) -> ApiResult<Json<TranslatableItem>> {
    let mut ctx = state.context();
    let item = load_item(&ctx, &key, &locale).await?;
    let source = ctx.resolve_source(&item).await?;
    log_stats("source", &ctx);
    Ok(Json(source))
}

async fn descendants<S: TranslationStore>(
    State(state): State<AppState<S>>,
    Path((key, locale)): Path<(String, String)>,
) -> ApiResult<Json<Vec<TranslatableItem>>> {
    let mut ctx = state.context();
    let item = load_item(&ctx, &key, &locale).await?;
    let descendants = ctx.resolve_descendants(&item).await?;
    log_stats("descendants", &ctx);
    Ok(Json(descendants))
}

async fn alternates<S: TranslationStore>(
    State(state): State<AppState<S>>,
    Path((key, locale)): Path<(String, String)>,
) -> ApiResult<Json<Vec<AlternateLink>>> {
    let mut ctx = state.context();
    let item = load_item(&ctx, &key, &locale).await?;
    let links = build_alternate_links(&mut ctx, &item, &state.config.site_root_url).await?;
    log_stats("alternates", &ctx);
    Ok(Json(links))
}

#[derive(Debug, Deserialize)]
pub struct SwitcherQuery {
    pub active: Option<String>,
    pub key: Option<String>,
    pub locale: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
struct SwitcherLink {
    #[serde(flatten)]
    entry: SwitcherEntry,
    switch_url: String,
}

#[derive(Debug, Serialize)]
struct SwitcherResponse {
    current: Option<Locale>,
    alternatives: Vec<SwitcherLink>,
}

async fn switcher<S: TranslationStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<SwitcherQuery>,
) -> ApiResult<Json<SwitcherResponse>> {
    let mut ctx = state.context();

    let page = match (query.key.as_deref(), query.locale.as_deref()) {
        (Some(key), Some(locale)) => ctx
            .store()
            .find_item(&TranslationKey::new(key), &normalize_code(locale))
            .await
            .map_err(ResolveError::from)?,
        _ => None,
    };
    let active = match query
        .active
        .map(|a| normalize_code(&a))
        .or_else(|| page.as_ref().map(|p| p.locale.clone()))
    {
        Some(active) => active,
        None => ctx.default_locale().await?.language_code().to_string(),
    };
    let request_path = query
        .path
        .or_else(|| page.as_ref().and_then(|p| p.url_path.clone()))
        .unwrap_or_else(|| "/".to_string());
    let all_locales = ctx.locales().await?.to_vec();

    let model = build_switcher(&mut ctx, page.as_ref(), &request_path, &active, &all_locales).await;
    log_stats("switcher", &ctx);

    Ok(Json(SwitcherResponse {
        current: model.current,
        alternatives: model
            .alternatives
            .into_iter()
            .map(|entry| SwitcherLink {
                switch_url: entry.switch_url(),
                entry,
            })
            .collect(),
    }))
}

async fn sitemap<S: TranslationStore>(State(state): State<AppState<S>>) -> ApiResult<Response> {
    let mut ctx = state.context();
    let urlset = build_urlset(&mut ctx, &state.config.site_root_url).await?;
    log_stats("sitemap", &ctx);

    let (xml, last_modified) = render_sitemap(&urlset);
    let last_modified = last_modified.format("%a, %d %b %Y %H:%M:%S GMT").to_string();

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml; charset=utf-8"),
    );
    headers.insert(
        "x-robots-tag",
        HeaderValue::from_static("noindex, noodp, noarchive"),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Accept-Encoding"));
    if let Ok(value) = HeaderValue::from_str(&last_modified) {
        headers.insert(header::LAST_MODIFIED, value);
    }

    Ok((headers, xml).into_response())
}

fn api_key_matches(provided: &str, expected: &str) -> bool {
    if provided.len() != expected.len() {
        return false;
    }
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

fn authorize(headers: &HeaderMap, config: &Config) -> ApiResult<()> {
    let Some(expected) = config.api_key.as_deref() else {
        warn!("Rejected mutating request: API_KEY is not configured");
        return Err(ApiError::Unavailable("API key not configured".to_string()));
    };

    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if api_key_matches(provided, expected) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}

async fn delete_item<S: TranslationStore>(
    State(state): State<AppState<S>>,
    Path((key, locale)): Path<(String, String)>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&headers, &state.config)?;

    let mut ctx = state.context();
    let item = load_item(&ctx, &key, &locale).await?;
    let policy = state.config.delete_cascade;
    let deleted = lifecycle::delete_item(&mut ctx, &item, policy).await?;
    log_stats("delete", &ctx);
    info!("Deleted {} via API", item.item_ref());

    Ok(Json(json!({ "cascade": policy, "deleted": deleted })))
}
