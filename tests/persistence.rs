//! Persistence tests for the redb completion store.
//!
//! These verify that completions and the active mode survive a store restart
//! (close + reopen), including when driven through the controller.

use std::sync::Arc;

use deck_scout::catalog::source::SourceUrls;
use deck_scout::catalog::{CatalogExtractor, CatalogSource, StaticFetcher};
use deck_scout::channel::{InboundEvent, MemoryChannel};
use deck_scout::controller::{CONFIRM_TITLE, InteractionController};
use deck_scout::mode::Mode;
use deck_scout::recommend::RecommendationSelector;
use deck_scout::store::{CompletionStore, RedbStore};

fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}

#[test]
fn completions_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    {
        let store = RedbStore::open(dir.path()).unwrap();
        store.save(Mode::Main, "Alpha").unwrap();
        store.save(Mode::Main, "Bravo").unwrap();
        store.save(Mode::Pbe, "Set Preview").unwrap();
    }

    let store = RedbStore::open(dir.path()).unwrap();
    assert_eq!(sorted(store.all(Mode::Main).unwrap()), vec!["Alpha", "Bravo"]);
    assert_eq!(store.all(Mode::Pbe).unwrap(), vec!["Set Preview"]);
}

#[test]
fn deletions_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    {
        let store = RedbStore::open(dir.path()).unwrap();
        store.save(Mode::Main, "Alpha").unwrap();
        store.save(Mode::Main, "Bravo").unwrap();
        store.save(Mode::Pbe, "Gamma").unwrap();
        assert!(store.delete_by_name(Mode::Main, "Alpha").unwrap());
        store.delete_all(Mode::Pbe).unwrap();
    }

    let store = RedbStore::open(dir.path()).unwrap();
    assert_eq!(store.all(Mode::Main).unwrap(), vec!["Bravo"]);
    assert!(store.all(Mode::Pbe).unwrap().is_empty());
}

#[test]
fn first_completion_time_is_kept_across_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    let first = {
        let store = RedbStore::open(dir.path()).unwrap();
        store.save(Mode::Main, "Alpha").unwrap();
        store.completed_at(Mode::Main, "Alpha").unwrap()
    };
    assert!(first.is_some());

    let store = RedbStore::open(dir.path()).unwrap();
    store.save(Mode::Main, "Alpha").unwrap();
    assert_eq!(store.completed_at(Mode::Main, "Alpha").unwrap(), first);
}

#[test]
fn controller_writes_reach_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let page = r#"<script>{"props":{"pageProps":{"dehydratedState":{"queries":[{"state":{"data":{"guideDecks":[{"name":"Alpha","teamBuilderKey":"a"},{"name":"Bravo","teamBuilderKey":"b"}]}}}]}}}}</script>"#;

    {
        let store = Arc::new(RedbStore::open(dir.path()).unwrap());
        let urls = SourceUrls::default();
        let fetcher = StaticFetcher::new().with_page(urls.pbe.clone(), page);
        let source = CatalogSource::new(Box::new(fetcher), CatalogExtractor::default(), urls);
        let channel = MemoryChannel::new();
        let mut controller = InteractionController::new(
            store,
            source,
            Box::new(channel.clone()),
            RecommendationSelector::default(),
        );

        controller.handle_event(InboundEvent::command("/switch"));
        controller.handle_event(InboundEvent::command("/update"));
        controller.handle_event(InboundEvent::callback("Ordinary deck", "pick:2"));
        controller.handle_event(InboundEvent::callback(CONFIRM_TITLE, "done:2"));
        assert!(channel.texts().iter().all(|t| !t.starts_with("Error")));
    }

    let store = RedbStore::open(dir.path()).unwrap();
    assert_eq!(store.mode().unwrap(), Mode::Pbe);
    assert_eq!(store.all(Mode::Pbe).unwrap(), vec!["Bravo"]);
    assert!(store.all(Mode::Main).unwrap().is_empty());
}
