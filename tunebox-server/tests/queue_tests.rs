//! Queue store behaviour against an in-memory store

use tunebox_common::models::QueueEntry;
use tunebox_common::Error;
use tunebox_server::db::Store;
use tunebox_server::playback::QueueStore;

fn entry(id: &str, title: &str) -> QueueEntry {
    QueueEntry {
        item_id: id.to_string(),
        title: title.to_string(),
        artist: "Artist".to_string(),
        duration: 180,
        album_art: None,
    }
}

fn ids(entries: &[QueueEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.item_id.as_str()).collect()
}

async fn setup() -> QueueStore {
    QueueStore::new(Store::in_memory().await.expect("in-memory store"))
}

#[tokio::test]
async fn test_fifo_order_and_contains() {
    let queue = setup().await;
    let expected = ["5", "3", "9", "1", "7"];

    for id in expected {
        queue.enqueue(entry(id, &format!("Song {}", id))).await.unwrap();
    }

    let entries = queue.list_all().await.unwrap();
    assert_eq!(ids(&entries), expected);
    for id in expected {
        assert!(queue.contains(id).await.unwrap());
    }
    assert!(!queue.contains("42").await.unwrap());
}

#[tokio::test]
async fn test_duplicate_enqueue_leaves_queue_unchanged() {
    let queue = setup().await;
    queue.enqueue(entry("1", "One")).await.unwrap();
    queue.enqueue(entry("2", "Two")).await.unwrap();
    let before = queue.list_all().await.unwrap();

    let err = queue.enqueue(entry("1", "One again")).await.unwrap_err();

    assert!(matches!(err, Error::Duplicate(_)));
    assert_eq!(err.to_string(), "Duplicate: Song One again is already in the queue.");
    assert_eq!(queue.list_all().await.unwrap(), before);
}

#[tokio::test]
async fn test_dequeue_absent_leaves_queue_unchanged() {
    let queue = setup().await;
    queue.enqueue(entry("1", "One")).await.unwrap();
    let before = queue.list_all().await.unwrap();

    let err = queue.dequeue_by_id("99").await.unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(queue.list_all().await.unwrap(), before);
}

#[tokio::test]
async fn test_dequeue_keeps_relative_order() {
    let queue = setup().await;
    for id in ["1", "2", "3", "4"] {
        queue.enqueue(entry(id, id)).await.unwrap();
    }

    let removed = queue.dequeue_by_id("2").await.unwrap();

    assert_eq!(removed.item_id, "2");
    assert_eq!(ids(&queue.list_all().await.unwrap()), ["1", "3", "4"]);
}

#[tokio::test]
async fn test_clear_empty_and_populated() {
    let queue = setup().await;
    queue.clear().await.unwrap();

    queue.enqueue(entry("1", "One")).await.unwrap();
    queue.clear().await.unwrap();

    assert!(queue.list_all().await.unwrap().is_empty());
    // Cleared ids can be queued again
    queue.enqueue(entry("1", "One")).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_duplicate_enqueues_admit_one() {
    let queue = std::sync::Arc::new(setup().await);

    let mut handles = Vec::new();
    for _ in 0..8 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            queue.enqueue(entry("7", "Seven")).await
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            accepted += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(queue.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_end_to_end_single_track() {
    let queue = setup().await;
    let song = QueueEntry {
        item_id: "12345".to_string(),
        title: "Test Song".to_string(),
        artist: "Test Artist".to_string(),
        duration: 180,
        album_art: None,
    };

    queue.enqueue(song.clone()).await.unwrap();

    let entries = queue.list_all().await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0], song);
    assert_eq!(entries[0].album_art, None);

    queue.dequeue_by_id("12345").await.unwrap();
    assert!(queue.list_all().await.unwrap().is_empty());

    let err = queue.dequeue_by_id("12345").await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}
