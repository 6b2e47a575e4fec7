//! Integration tests for the translation graph
//!
//! These run the resolver, switcher, alternates and lifecycle together
//! against the in-memory store. PostgreSQL tests live in
//! src/store/postgres.rs since they need a database.

use chrono::Utc;
use proptest::prelude::*;
use std::collections::HashSet;
use translation_graph::alternates::build_alternate_links;
use translation_graph::capabilities::{Capabilities, DraftState};
use translation_graph::i18n::{Locale, LocaleRegistry};
use translation_graph::lifecycle::{self, CascadePolicy};
use translation_graph::switcher::build_switcher;
use translation_graph::{
    ItemRef, MemoryStore, ResolutionContext, ResolverOptions, TranslatableItem,
    TranslationRecord, TranslationStore,
};

// ==================== Test Helpers ====================

fn locales() -> Vec<Locale> {
    vec![
        Locale::new("en", "English"),
        Locale::new("es", "Español"),
        Locale::new("ca", "Català"),
    ]
}

fn create_store() -> MemoryStore {
    MemoryStore::new(LocaleRegistry::new(locales(), "en").expect("valid registry"))
}

fn live() -> Capabilities {
    Capabilities::new().with_draft(DraftState::published(Utc::now()))
}

fn page(locale: &str, url: &str) -> TranslatableItem {
    TranslatableItem::page("T1", locale, format!("Page [{}]", locale), url).with_capabilities(live())
}

async fn seed(store: &MemoryStore, items: &[&TranslatableItem], edges: &[(&str, &str)]) {
    for item in items {
        store.insert_item((*item).clone()).await.unwrap();
    }
    for (source, target) in edges {
        store
            .insert_record(TranslationRecord::new("T1", *source, *target))
            .await
            .unwrap();
    }
}

// ==================== Resolver Scenarios ====================

#[tokio::test]
async fn test_original_is_its_own_source() {
    let store = create_store();
    let a = page("en", "/en/");
    seed(&store, &[&a], &[]).await;
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());

    assert_eq!(ctx.resolve_predecessor(&a).await.unwrap(), None);
    assert_eq!(ctx.resolve_source(&a).await.unwrap(), a);
    assert!(ctx.resolve_descendants(&a).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_single_translation() {
    let store = create_store();
    let a = page("en", "/en/");
    let b = page("es", "/es/");
    seed(&store, &[&a, &b], &[("en", "es")]).await;
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());

    assert_eq!(ctx.resolve_predecessor(&b).await.unwrap(), Some(a.clone()));
    assert_eq!(ctx.resolve_source(&b).await.unwrap(), a);
    assert_eq!(ctx.resolve_descendants(&a).await.unwrap(), vec![b]);
}

#[tokio::test]
async fn test_chain_of_translations() {
    let store = create_store();
    let a = page("en", "/en/");
    let b = page("es", "/es/");
    let c = page("ca", "/ca/");
    seed(&store, &[&a, &b, &c], &[("en", "es"), ("es", "ca")]).await;
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());

    assert_eq!(ctx.resolve_source(&c).await.unwrap(), a);
    assert_eq!(ctx.resolve_descendants(&a).await.unwrap(), vec![b.clone(), c]);

    // source(x) == source(predecessor(x))
    let predecessor = ctx.resolve_predecessor(&b).await.unwrap().unwrap();
    assert_eq!(
        ctx.resolve_source(&predecessor).await.unwrap(),
        ctx.resolve_source(&b).await.unwrap()
    );
}

#[tokio::test]
async fn test_memo_avoids_repeat_lookups() {
    let store = create_store();
    let a = page("en", "/en/");
    let b = page("es", "/es/");
    let c = page("ca", "/ca/");
    seed(&store, &[&a, &b, &c], &[("en", "es"), ("es", "ca")]).await;
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());

    ctx.resolve_source(&c).await.unwrap();
    let lookups = ctx.stats().store_lookups;
    ctx.resolve_source(&c).await.unwrap();
    ctx.resolve_source(&b).await.unwrap();

    assert_eq!(ctx.stats().store_lookups, lookups);
    assert!(ctx.stats().memo_hits >= 2);
}

// ==================== Switcher & Alternates Scenarios ====================

#[tokio::test]
async fn test_switcher_with_partial_translations() {
    let store = create_store();
    let a = page("en", "/en/about/");
    let b = page("es", "/es/acerca/");
    seed(&store, &[&a, &b], &[("en", "es")]).await;
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());

    let model = build_switcher(&mut ctx, Some(&a), "/en/about/", "en", &locales()).await;

    assert_eq!(model.current.map(|l| l.language_code().to_string()), Some("en".to_string()));
    let targets: Vec<_> = model
        .alternatives
        .iter()
        .map(|e| (e.language_code.as_str(), e.target_url.as_deref()))
        .collect();
    assert_eq!(
        targets,
        vec![("es", Some("/es/acerca/")), ("ca", Some("/ca/"))]
    );
}

#[tokio::test]
async fn test_x_default_when_default_locale_not_live() {
    let store = create_store();
    let a = TranslatableItem::page("T1", "en", "About", "/en/about/")
        .with_capabilities(Capabilities::new().with_draft(DraftState::draft()));
    let b = page("es", "/es/acerca/");
    seed(&store, &[&a, &b], &[("en", "es")]).await;
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());

    let links = build_alternate_links(&mut ctx, &b, "https://example.com")
        .await
        .unwrap();
    let x_default = links.iter().find(|l| l.lang_code == "x-default").unwrap();
    assert_eq!(x_default.location, "https://example.com/es/acerca/");
}

// ==================== Integrity Tests ====================

#[tokio::test]
async fn test_dangling_record_is_integrity_error() {
    let store = create_store();
    let b = page("es", "/es/");
    seed(&store, &[&b], &[]).await;
    store.insert_raw_record(TranslationRecord::new("T1", "en", "es"));
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());

    let err = ctx.resolve_source(&b).await.unwrap_err();
    assert!(err.is_integrity());
}

#[tokio::test]
async fn test_cycle_is_integrity_error() {
    let store = create_store();
    let a = page("en", "/en/");
    let b = page("es", "/es/");
    seed(&store, &[&a, &b], &[]).await;
    store.insert_raw_record(TranslationRecord::new("T1", "en", "es"));
    store.insert_raw_record(TranslationRecord::new("T1", "es", "en"));
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());

    assert!(ctx.resolve_source(&a).await.unwrap_err().is_integrity());
    assert!(ctx.resolve_descendants(&a).await.unwrap_err().is_integrity());
}

// ==================== Lifecycle Tests ====================

#[tokio::test]
async fn test_translate_then_cascade_delete() {
    let store = create_store();
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());
    let en = TranslatableItem::page("T9", "en", "Contact", "/en/contact/");
    lifecycle::create_item(&mut ctx, en.clone()).await.unwrap();
    let es = lifecycle::translate_item(&mut ctx, &en, "es").await.unwrap();
    lifecycle::translate_item(&mut ctx, &en, "ca").await.unwrap();

    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());
    assert_eq!(ctx.resolve_source(&es).await.unwrap(), en);

    let deleted = lifecycle::delete_item(&mut ctx, &en, CascadePolicy::Transitive)
        .await
        .unwrap();
    assert_eq!(deleted.len(), 3);
    assert_eq!(deleted.last(), Some(&ItemRef::new("T9", "en")));
    assert_eq!(store.item_count(), 0);
}

#[tokio::test]
async fn test_delete_without_cascade_promotes_translations() {
    let store = create_store();
    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());
    let en = TranslatableItem::snippet("M1", "en", "Menu");
    lifecycle::create_item(&mut ctx, en.clone()).await.unwrap();
    let es = lifecycle::translate_item(&mut ctx, &en, "es").await.unwrap();

    lifecycle::delete_item(&mut ctx, &en, CascadePolicy::None)
        .await
        .unwrap();

    let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());
    assert_eq!(ctx.resolve_predecessor(&es).await.unwrap(), None);
    assert_eq!(store.item_count(), 1);
}

// ==================== Property Tests ====================

const TREE_LOCALES: [&str; 6] = ["l0", "l1", "l2", "l3", "l4", "l5"];

/// Builds a translation tree for key "K" rooted at l0: item i+1 was
/// translated from `parents[i]`.
fn build_tree(parents: &[prop::sample::Index]) -> (MemoryStore, Vec<TranslatableItem>) {
    let registry = LocaleRegistry::new(
        TREE_LOCALES.iter().map(|c| Locale::new(*c, c.to_uppercase())).collect(),
        "l0",
    )
    .expect("valid registry");
    let store = MemoryStore::new(registry);

    let items: Vec<TranslatableItem> = (0..=parents.len())
        .map(|i| {
            TranslatableItem::page("K", TREE_LOCALES[i], "Item", format!("/{}/", TREE_LOCALES[i]))
        })
        .collect();

    tokio_test::block_on(async {
        for item in &items {
            store.insert_item(item.clone()).await.unwrap();
        }
        for (i, parent) in parents.iter().enumerate() {
            let parent = parent.index(i + 1);
            store
                .insert_record(TranslationRecord::new("K", TREE_LOCALES[parent], TREE_LOCALES[i + 1]))
                .await
                .unwrap();
        }
    });

    (store, items)
}

proptest! {
    #[test]
    fn test_every_item_resolves_to_root(parents in prop::collection::vec(any::<prop::sample::Index>(), 0..5)) {
        let (store, items) = build_tree(&parents);
        tokio_test::block_on(async {
            let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());
            for item in &items {
                assert_eq!(ctx.resolve_source(item).await.unwrap(), items[0]);
            }
        });
    }

    #[test]
    fn test_descendants_of_root_are_everything_else(parents in prop::collection::vec(any::<prop::sample::Index>(), 0..5)) {
        let (store, items) = build_tree(&parents);
        tokio_test::block_on(async {
            let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());
            let first = ctx.resolve_descendants(&items[0]).await.unwrap();
            let second = ctx.resolve_descendants(&items[0]).await.unwrap();

            let first_refs: HashSet<ItemRef> = first.iter().map(|i| i.item_ref()).collect();
            let expected: HashSet<ItemRef> = items[1..].iter().map(|i| i.item_ref()).collect();
            assert_eq!(first.len(), items.len() - 1);
            assert_eq!(first_refs, expected);
            assert_eq!(first, second);

            for descendant in &first {
                assert_eq!(ctx.resolve_source(descendant).await.unwrap(), items[0]);
            }
        });
    }

    #[test]
    fn test_switcher_lists_every_other_locale(
        parents in prop::collection::vec(any::<prop::sample::Index>(), 0..5),
        active in 0usize..6,
    ) {
        let (store, items) = build_tree(&parents);
        let all: Vec<Locale> = TREE_LOCALES.iter().map(|c| Locale::new(*c, c.to_uppercase())).collect();
        let page = &items[active.min(items.len() - 1)];

        let model = tokio_test::block_on(async {
            let mut ctx = ResolutionContext::new(&store, ResolverOptions::default());
            build_switcher(&mut ctx, Some(page), page.url_path.as_deref().unwrap_or("/"), &page.locale, &all).await
        });

        prop_assert_eq!(model.alternatives.len(), all.len() - 1);
        prop_assert_eq!(model.current.map(|l| l.language_code().to_string()), Some(page.locale.clone()));
        prop_assert!(model.alternatives.iter().all(|e| e.language_code != page.locale));
    }
}
