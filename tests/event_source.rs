// tests/event_source.rs
mod common;

use aviser_bot::events::telegram::TelegramSource;
use aviser_bot::{EventError, Fetcher, Kind};
use common::{bare, message, FakeUpdates};

#[tokio::test]
async fn idle_fetch_is_empty_and_keeps_offset() {
    let api = FakeUpdates::default();
    let mut source = TelegramSource::with_offset(api, 3);

    let events = source.fetch(10).await.unwrap();

    assert!(events.is_empty());
    assert_eq!(source.offset(), 3);
}

#[tokio::test]
async fn batch_advances_offset_past_highest_id() {
    let api = FakeUpdates::with(vec![
        message(5, "a", "alice"),
        bare(6),
        message(7, "c", "bob"),
    ]);
    let mut source = TelegramSource::with_offset(api.clone(), 5);

    let events = source.fetch(10).await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(source.offset(), 8);
    assert_eq!(
        events.iter().map(|e| e.kind).collect::<Vec<_>>(),
        vec![Kind::Message, Kind::Unknown, Kind::Message]
    );
    assert_eq!(events[2].text, "c");
    assert_eq!(events[2].message_meta().unwrap().username, "bob");

    let again = source.fetch(10).await.unwrap();
    assert!(again.is_empty());
    assert_eq!(source.offset(), 8);

    assert_eq!(*api.calls.lock(), vec![(5, 10), (8, 10)]);
}

#[tokio::test]
async fn limit_bounds_the_batch() {
    let api = FakeUpdates::with((1..=5).map(bare).collect());
    let mut source = TelegramSource::new(api);

    assert_eq!(source.fetch(2).await.unwrap().len(), 2);
    assert_eq!(source.offset(), 3);
    assert_eq!(source.fetch(2).await.unwrap().len(), 2);
    assert_eq!(source.fetch(2).await.unwrap().len(), 1);
    assert_eq!(source.offset(), 6);
}

#[tokio::test]
async fn failed_fetch_keeps_offset_so_the_window_is_retried() {
    let api = FakeUpdates::with(vec![message(10, "x", "alice")]);
    let mut source = TelegramSource::with_offset(api.clone(), 10);

    api.set_failing(true);
    let err = source.fetch(5).await.unwrap_err();
    assert!(matches!(err, EventError::Fetch { .. }));
    assert!(err.to_string().contains("can't get events"));
    assert_eq!(source.offset(), 10);

    api.set_failing(false);
    assert_eq!(source.fetch(5).await.unwrap().len(), 1);
    assert_eq!(*api.calls.lock(), vec![(10, 5), (10, 5)]);
}

#[tokio::test]
async fn offset_never_moves_backwards() {
    // A provider replaying an old id must not rewind the cursor.
    let api = FakeUpdates::with(vec![bare(2)]);
    let mut source = TelegramSource::with_offset(api, 0);
    source.fetch(10).await.unwrap();
    assert_eq!(source.offset(), 3);

    let stale = FakeUpdates::with(vec![bare(1)]);
    let mut source = TelegramSource::with_offset(stale, 0);
    source.fetch(10).await.unwrap();
    assert_eq!(source.offset(), 2);
}

#[tokio::test]
async fn highest_possible_id_does_not_overflow_offset() {
    let api = FakeUpdates::with(vec![bare(i64::MAX)]);
    let mut source = TelegramSource::with_offset(api, i64::MAX - 1);

    assert_eq!(source.fetch(10).await.unwrap().len(), 1);
    assert_eq!(source.offset(), i64::MAX);
}
