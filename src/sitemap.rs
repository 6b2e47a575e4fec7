//! `sitemap.xml` with per-locale alternates.

use crate::alternates::{build_alternate_links, AlternateLink};
use crate::error::ResolveResult;
use crate::model::TranslatableItem;
use crate::resolver::ResolutionContext;
use crate::store::TranslationStore;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

/// One `<url>` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SitemapUrl {
    pub location: String,
    pub lastmod: Option<DateTime<Utc>>,
    pub alternates: Vec<AlternateLink>,
}

/// Sitemap entry for one page. Snippets have no URL and yield `None`.
pub async fn sitemap_entry<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    page: &TranslatableItem,
    site_root: &str,
) -> ResolveResult<Option<SitemapUrl>> {
    let Some(url) = page.url_path.as_deref() else {
        return Ok(None);
    };

    Ok(Some(SitemapUrl {
        location: format!("{}{}", site_root.trim_end_matches('/'), url),
        lastmod: page.capabilities.last_modified(),
        alternates: build_alternate_links(ctx, page, site_root).await?,
    }))
}

/// Entries for every live, indexable page across all locales.
///
/// A page whose translation graph cannot be read is left out and logged;
/// one broken page does not take the sitemap down.
pub async fn build_urlset<S: TranslationStore>(
    ctx: &mut ResolutionContext<'_, S>,
    site_root: &str,
) -> ResolveResult<Vec<SitemapUrl>> {
    let pages = ctx.store().list_items().await?;
    let mut urlset = Vec::new();

    for page in pages
        .iter()
        .filter(|p| p.is_page() && p.is_live() && p.search_engine_index)
    {
        match sitemap_entry(ctx, page, site_root).await {
            Ok(Some(entry)) => urlset.push(entry),
            Ok(None) => {}
            Err(e) => warn!("Leaving {} out of the sitemap: {}", page.item_ref(), e),
        }
    }

    Ok(urlset)
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render the urlset. Returns the document and its last-modified time:
/// the newest `lastmod`, or now when no entry carries one.
pub fn render_sitemap(urlset: &[SitemapUrl]) -> (String, DateTime<Utc>) {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\" \
         xmlns:xhtml=\"http://www.w3.org/1999/xhtml\">\n",
    );

    for url in urlset {
        xml.push_str("  <url>\n");
        xml.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&url.location)));
        if let Some(lastmod) = url.lastmod {
            xml.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                lastmod.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        for alt in &url.alternates {
            xml.push_str(&format!(
                "    <xhtml:link rel=\"alternate\" hreflang=\"{}\" href=\"{}\"/>\n",
                escape_xml(&alt.lang_code),
                escape_xml(&alt.location)
            ));
        }
        xml.push_str("  </url>\n");
    }
    xml.push_str("</urlset>\n");

    let last_modified = urlset
        .iter()
        .filter_map(|u| u.lastmod)
        .max()
        .unwrap_or_else(Utc::now);

    (xml, last_modified)
}
