mod common;

use chrono::{Duration, Utc};

use recycle_bin_api::recycle::PageRequest;

#[tokio::test]
async fn lists_newest_first() {
    let (store, bin) = common::setup();
    let now = Utc::now();
    let old = store.append_at("minutes", Some(1), r#"{"id":1}"#, now - Duration::days(2));
    let newest = store.append_at("minutes", Some(2), r#"{"id":2}"#, now);
    let middle = store.append_at("minutes", Some(3), r#"{"id":3}"#, now - Duration::days(1));

    let page = bin.list(PageRequest::default()).await.unwrap();
    let ids: Vec<i64> = page.entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![newest, middle, old]);
    assert_eq!(page.total_count, 3);
    assert_eq!(page.total_pages, 1);
}

#[tokio::test]
async fn pages_are_clamped_and_sizes_validated() {
    let (store, bin) = common::setup();
    let now = Utc::now();
    for n in 0..30 {
        store.append_at("ordinances", Some(n), r#"{"id":1}"#, now - Duration::minutes(n));
    }

    let page = bin.list(PageRequest::new(2, 25)).await.unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(page.page_size, 25);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.entries.len(), 5);

    // 7 is not an allowed size; falls back to the default of 10
    let page = bin.list(PageRequest::new(1, 7)).await.unwrap();
    assert_eq!(page.page_size, 10);
    assert_eq!(page.total_pages, 3);

    let page = bin.list(PageRequest::new(99, 10)).await.unwrap();
    assert_eq!(page.page, 3);
    assert_eq!(page.entries.len(), 10);

    let page = bin.list(PageRequest::new(-4, 10)).await.unwrap();
    assert_eq!(page.page, 1);
}

#[tokio::test]
async fn empty_bin_lists_nothing() {
    let (_store, bin) = common::setup();
    let outcome = bin.browse(PageRequest::default()).await;
    assert!(outcome.error.is_none());
    assert!(outcome.page.entries.is_empty());
    assert_eq!(outcome.page.total_count, 0);
    assert_eq!(outcome.page.total_pages, 0);
    assert_eq!(outcome.page.page, 1);
}

#[tokio::test]
async fn previews_are_truncated_and_flag_restorability() {
    let (store, bin) = common::setup();
    let long = format!(r#"{{"id":1,"body":"{}"}}"#, "a".repeat(200));
    store.append_at("minutes", Some(1), &long, Utc::now());
    let blank = store.append_at("minutes", Some(2), "", Utc::now() - Duration::hours(1));
    store.append_at("users", Some(3), r#"{"id":3}"#, Utc::now() - Duration::hours(2));

    let page = bin.list(PageRequest::default()).await.unwrap();
    let first = &page.entries[0];
    assert_eq!(first.preview.chars().count(), 103);
    assert!(first.preview.ends_with("..."));
    assert!(first.restorable);

    let second = page.entries.iter().find(|e| e.id == blank).unwrap();
    assert_eq!(second.preview, "No data");

    let third = &page.entries[2];
    assert_eq!(third.original_table, "users");
    assert!(!third.restorable);
}

#[tokio::test]
async fn storage_failure_degrades_to_empty_page() {
    let bin = common::unavailable_bin();

    let outcome = bin.browse(PageRequest::new(3, 25)).await;
    assert!(outcome.page.entries.is_empty());
    assert_eq!(outcome.page.total_count, 0);
    assert_eq!(outcome.page.page, 1);
    assert_eq!(outcome.page.page_size, 25);
    assert!(outcome.error.as_deref().unwrap_or_default().contains("connection refused"));

    assert!(bin.list(PageRequest::default()).await.is_err());
}
