mod common;

use std::{sync::Arc, time::Duration};

use alert_monitor::{
    fetcher::{FetchError, FetchLimits, Fetcher},
    filter::KeywordFilter,
};
use search_client::{RequestDocuments, RetryError, RetryPolicy};
use serde_json::json;

use common::{ScriptedProvider, hit, hit_with_identifier, hits};

fn fetcher(provider: Arc<ScriptedProvider>) -> Fetcher {
    Fetcher::new(
        provider,
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::ZERO,
        },
        FetchLimits {
            batch_pause: Duration::ZERO,
            ..Default::default()
        },
    )
}

fn documents() -> RequestDocuments {
    RequestDocuments::for_query(json!({ "bool": { "must": [] } }))
}

#[tokio::test]
async fn fetches_one_request_per_page() {
    let provider = Arc::new(ScriptedProvider::new(hits(250)));
    let set = fetcher(provider.clone())
        .fetch(&documents(), &KeywordFilter::default())
        .await
        .unwrap();

    assert_eq!(set.total_results, 250);
    assert_eq!(set.keys.len(), 250);
    assert_eq!(provider.page_requests(), 3);
    assert_eq!(provider.calls().len(), 4, "one count request plus three pages");
}

#[tokio::test]
async fn empty_result_needs_no_pages() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let set = fetcher(provider.clone())
        .fetch(&documents(), &KeywordFilter::default())
        .await
        .unwrap();

    assert!(set.keys.is_empty());
    assert_eq!(provider.page_requests(), 0);
}

#[tokio::test]
async fn duplicate_references_are_coalesced() {
    let mut all = hits(150);
    all[120] = hit_with_identifier("R0005", "ID-LATE");
    let provider = Arc::new(ScriptedProvider::new(all));

    let set = fetcher(provider)
        .fetch(&documents(), &KeywordFilter::default())
        .await
        .unwrap();

    assert_eq!(set.keys.len(), 149);
    let dupes: Vec<_> = set.keys.iter().filter(|k| k.reference == "R0005").collect();
    assert_eq!(dupes.len(), 1);
    assert_eq!(dupes[0].identifier, "ID-R0005", "first occurrence wins");
}

#[tokio::test]
async fn never_more_than_ten_pages_in_flight() {
    let provider = Arc::new(ScriptedProvider::with_delay(hits(2_500), Duration::from_millis(20)));
    let set = fetcher(provider.clone())
        .fetch(&documents(), &KeywordFilter::default())
        .await
        .unwrap();

    assert_eq!(set.keys.len(), 2_500);
    assert_eq!(provider.page_requests(), 25);
    assert!(provider.max_in_flight() <= 10, "peak was {}", provider.max_in_flight());
    assert!(provider.max_in_flight() > 1, "pages should overlap");
}

#[tokio::test]
async fn a_failed_page_fails_the_whole_fetch() {
    let provider = Arc::new(ScriptedProvider::new(hits(250)));
    provider.fail_page(2, u32::MAX);

    let err = fetcher(provider)
        .fetch(&documents(), &KeywordFilter::default())
        .await
        .unwrap_err();

    match err {
        FetchError::Page { page, pages, source } => {
            assert_eq!((page, pages), (2, 3));
            assert!(matches!(source, RetryError::Exhausted { attempts: 3, .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn transient_page_failures_are_retried() {
    let provider = Arc::new(ScriptedProvider::new(hits(250)));
    provider.fail_page(2, 2);

    let set = fetcher(provider.clone())
        .fetch(&documents(), &KeywordFilter::default())
        .await
        .unwrap();

    assert_eq!(set.keys.len(), 250);
    assert_eq!(provider.page_requests(), 5);
}

#[tokio::test]
async fn keyword_filter_applies_to_every_page() {
    let mut all = hits(120);
    let mut excluded = hit("NUKE");
    excluded
        .metadata
        .0
        .insert("descriptionByte".into(), json!(["Description of nuclear reactors"]));
    all.push(excluded);
    let provider = Arc::new(ScriptedProvider::new(all));

    let set = fetcher(provider)
        .fetch(&documents(), &KeywordFilter::new(&["description", "!nuclear"]))
        .await
        .unwrap();

    assert_eq!(set.total_results, 121);
    assert_eq!(set.keys.len(), 120);
    assert!(set.keys.iter().all(|k| k.reference != "NUKE"));
}
