//! Tests for the SQLite-backed search store

use std::sync::Arc;

use condtree::application::services::SearchService;
use condtree::domain::{parse_chain, RebuildMode};
use condtree::infrastructure::traits::SearchStore;
use condtree::infrastructure::SqliteSearchStore;
use tempfile::TempDir;

#[test]
fn given_nested_database_path_when_opening_then_creates_directories() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("deep").join("dir").join("searches.db");

    // Act
    let store = SqliteSearchStore::open(&path).unwrap();

    // Assert
    assert!(path.exists());
    assert!(store.list().unwrap().is_empty());
}

#[test]
fn given_saved_search_when_reopening_database_then_search_survives() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("searches.db");
    let (mut tree, root) = parse_chain(&[
        "SUBJECT CONTAINS invoice",
        "and",
        "SENDER EQUALS alice@x.com",
        "or",
        "READ EQUALS true",
    ])
    .unwrap();
    {
        let service = SearchService::new(
            Arc::new(SqliteSearchStore::open(&path).unwrap()),
            RebuildMode::Strict,
        );
        service.save("inbox", &mut tree, root).unwrap();
    }

    // Act
    let store = Arc::new(SqliteSearchStore::open(&path).unwrap());
    let rows = store.load("inbox").unwrap();
    let loaded = SearchService::new(store, RebuildMode::Strict)
        .load("inbox")
        .unwrap();

    // Assert
    let labels: Vec<(u32, u32)> = rows.iter().map(|r| (r.left_label, r.right_label)).collect();
    assert_eq!(labels, vec![(1, 10), (2, 7), (3, 4), (5, 6), (8, 9)]);
    assert_eq!(rows[1].field, None);
    assert_eq!(rows[2].field.as_deref(), Some("SUBJECT"));
    assert!(tree.structurally_eq(root, &loaded, loaded.root().unwrap()));
}

#[test]
fn given_two_searches_when_deleting_one_then_other_remains() {
    let store = SqliteSearchStore::open_in_memory().unwrap();
    let service = SearchService::new(Arc::new(store), RebuildMode::Strict);
    let (mut a, a_root) = parse_chain(&["READ EQUALS 0"]).unwrap();
    let (mut b, b_root) = parse_chain(&["FLAGGED EQUALS 1"]).unwrap();
    service.save("a", &mut a, a_root).unwrap();
    service.save("b", &mut b, b_root).unwrap();

    service.delete("a").unwrap();

    assert_eq!(service.list().unwrap(), vec!["b"]);
}

#[test]
fn given_unknown_search_when_deleting_from_store_then_false() {
    let store = SqliteSearchStore::open_in_memory().unwrap();
    assert!(!store.delete("missing").unwrap());
}
