//! Benchmarks for catalog extraction and offer selection.

use std::collections::HashSet;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use deck_scout::catalog::extract::{DEFAULT_BLOCK_MARKER, locate_block};
use deck_scout::catalog::{CatalogEntry, CatalogExtractor};
use deck_scout::recommend::RecommendationSelector;

const DECKS: usize = 200;

fn deck_name(i: usize) -> String {
    if i % 5 == 0 {
        format!("[Augment] Deck {i}")
    } else {
        format!("Deck {i}")
    }
}

/// A page with a large surrounding document and a realistic payload.
fn synthetic_page() -> String {
    let decks: Vec<serde_json::Value> = (0..DECKS)
        .map(|i| {
            serde_json::json!({
                "name": deck_name(i),
                "teamBuilderKey": format!("key-{i:04}"),
                "notes": "{ braces in text }",
            })
        })
        .collect();
    let payload = serde_json::json!({
        "props": { "pageProps": { "dehydratedState": { "queries": [
            { "state": { "data": { "patch": "14.1" } } },
            { "state": { "data": { "guideDecks": decks } } }
        ] } } }
    });
    let filler = "<div class=\"row\">filler</div>".repeat(2_000);
    format!("<html><body>{filler}<script>{payload}</script>{filler}</body></html>")
}

fn synthetic_catalog() -> Vec<CatalogEntry> {
    (0..DECKS)
        .map(|i| CatalogEntry::new(deck_name(i), format!("key-{i:04}"), i))
        .collect()
}

fn bench_locate(c: &mut Criterion) {
    let page = synthetic_page();
    c.bench_function("locate_block_200", |bench| {
        bench.iter(|| black_box(locate_block(&page, DEFAULT_BLOCK_MARKER).unwrap()))
    });
}

fn bench_extract(c: &mut Criterion) {
    let page = synthetic_page();
    let extractor = CatalogExtractor::default();
    c.bench_function("extract_200", |bench| {
        bench.iter(|| black_box(extractor.extract(&page).unwrap()))
    });
}

fn bench_select(c: &mut Criterion) {
    let catalog = synthetic_catalog();
    let selector = RecommendationSelector::default();
    let none = HashSet::new();
    let half: HashSet<String> = (0..DECKS).step_by(2).map(deck_name).collect();

    c.bench_function("select_200_none_completed", |bench| {
        bench.iter(|| black_box(selector.select(&catalog, &none)))
    });
    c.bench_function("select_200_half_completed", |bench| {
        bench.iter(|| black_box(selector.select(&catalog, &half)))
    });
}

criterion_group!(benches, bench_locate, bench_extract, bench_select);
criterion_main!(benches);
