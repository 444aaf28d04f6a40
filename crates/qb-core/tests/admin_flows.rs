//! Admin flows through the facade, including cache invalidation

use pretty_assertions::assert_eq;
use qb_core::{CoreError, EditIntent, IntentOutcome, ProfileInput, Questboard, QuestboardConfig, UiSession};
use qb_document::MapField;
use qb_store::{ActivityKind, Direction, MemoryStore, RemoteStore, Table};
use qb_test_utils::{row, sample_snapshot};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn board() -> (Arc<MemoryStore>, Questboard) {
    let memory = Arc::new(MemoryStore::from_snapshot(&sample_snapshot()).unwrap());
    let config = QuestboardConfig::new().with_admin_secret("letmein");
    let board = Questboard::new(Arc::clone(&memory), config).unwrap();
    (memory, board)
}

fn admin(board: &Questboard) -> UiSession {
    assert!(board.gate().login("letmein"));
    board.gate().session()
}

#[tokio::test]
async fn path_count_follows_new_path() {
    let (_, board) = board();
    let session = admin(&board);
    let before = board.catalog().sections().await.unwrap();
    assert_eq!(before[1].path_count, 1);

    board.catalog().create_path(session, "s-ops").await.unwrap();
    let after = board.catalog().sections().await.unwrap();
    assert_eq!(after[1].path_count, 2);
    assert!(board.cache_stats().hits + board.cache_stats().misses > 0);
}

#[tokio::test]
async fn repeated_reads_hit_cache() {
    let (_, board) = board();
    board.catalog().levels("p-rust").await.unwrap();
    let misses = board.cache_stats().misses;
    board.catalog().levels("p-rust").await.unwrap();
    assert_eq!(board.cache_stats().misses, misses);
    assert!(board.cache_stats().hits >= 1);
}

#[tokio::test]
async fn viewer_intents_are_refused() {
    let (memory, board) = board();
    let err = board
        .catalog()
        .dispatch(
            board.gate().session(),
            EditIntent::Delete { table: Table::Sections, id: "s-dev".into() },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotAdmin));
    assert_eq!(memory.count(Table::Sections), 2);
    assert!(matches!(board.edit_level("l-1").await.unwrap_err(), CoreError::NotAdmin));
}

#[tokio::test]
async fn move_then_listing_reflects_swap() {
    let (_, board) = board();
    let session = admin(&board);
    let titles = |v: Vec<qb_store::LearningPath>| v.into_iter().map(|p| p.title).collect::<Vec<_>>();
    assert_eq!(titles(board.catalog().paths("s-dev").await.unwrap()), vec!["Rust", "Web"]);
    board
        .catalog()
        .dispatch(
            session,
            EditIntent::Move { table: Table::Paths, id: "p-web".into(), direction: Direction::Up },
        )
        .await
        .unwrap();
    assert_eq!(titles(board.catalog().paths("s-dev").await.unwrap()), vec!["Web", "Rust"]);
}

#[tokio::test]
async fn profile_lifecycle() {
    let (_, board) = board();
    let session = admin(&board);
    let users = board.users();

    let err = users
        .create_profile(session, ProfileInput::new("   ", ""))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let dana = users
        .create_profile(session, ProfileInput::new("  Dana Dunn ", "  "))
        .await
        .unwrap();
    assert_eq!(dana.full_name, "Dana Dunn");
    assert_eq!(dana.avatar_url, None);

    let found: Vec<_> = users
        .profiles(Some("DUNN"))
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(found, vec![dana.id.clone()]);

    let updated = users
        .update_profile(session, &dana.id, ProfileInput::new("Dana D.", "https://example.com/d.png"))
        .await
        .unwrap();
    assert_eq!(updated.avatar_url.as_deref(), Some("https://example.com/d.png"));

    users.record_completion(session, &dana.id, "l-3").await.unwrap();
    users.delete_profile(session, &dana.id).await.unwrap();
    assert!(users.profile(&dana.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn completion_updates_ranking_progress_and_feed() {
    let (_, board) = board();
    let session = admin(&board);
    let users = board.users();

    users.record_completion(session, "u-bob", "l-2").await.unwrap();
    users.record_completion(session, "u-bob", "l-3").await.unwrap();

    let err = users.record_completion(session, "u-bob", "l-3").await.unwrap_err();
    assert!(matches!(err, CoreError::Store(_)));

    let completions = users.completions("u-bob").await.unwrap();
    assert_eq!(completions.len(), 3);
    assert_eq!(completions[0].level_title, "Async");
    assert_eq!(completions[0].path_title, "Rust");
    assert_eq!(completions[0].section_title, "Development");
    assert!(completions.windows(2).all(|w| w[0].completed_at >= w[1].completed_at));

    let board_rows = board.ranking().await.unwrap();
    assert_eq!(board_rows[0].profile.id, "u-ann");
    assert_eq!(board_rows[0].completed_levels, 3);
    assert_eq!(board_rows[1].profile.id, "u-bob");
    assert_eq!(board_rows[1].completed_levels, 3);

    let progress = board.progress("u-bob").await.unwrap();
    assert_eq!(progress[0].paths[0].percent, 100);
    assert_eq!(progress[0].paths[0].current_level.as_deref(), Some("Async"));

    let feed = board.activity().await.unwrap();
    assert_eq!(feed.len(), 5);
    assert_eq!(feed[0].kind, ActivityKind::Completion);
    assert_eq!(feed[0].description, "Completed Async");
    assert_eq!(feed[0].profile_name.as_deref(), Some("Bob Baker"));
}

#[tokio::test]
async fn level_search_spans_hierarchy() {
    let (_, board) = board();
    let hits = board.users().search_levels("kube").await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].level_title, "Pods");

    let hits: Vec<_> = board
        .users()
        .search_levels("development")
        .await
        .unwrap()
        .into_iter()
        .map(|h| h.level_id)
        .collect();
    assert_eq!(hits, vec!["l-1", "l-2", "l-3"]);
}

#[tokio::test]
async fn editor_commit_is_visible_through_cache() {
    let (memory, board) = board();
    admin(&board);
    // Warm the cache.
    let before = board.catalog().level("l-1").await.unwrap();
    assert_eq!(before.details["time_investment"]["breakdown"]["design"], json!("2 hours"));

    let session = board.edit_level("l-1").await.unwrap();
    session
        .update_map_value(&MapField::Breakdown.path(), "design", qb_document::Node::text("4 hours"))
        .unwrap();
    session.commit().await.unwrap();

    let after = board.catalog().level("l-1").await.unwrap();
    assert_eq!(after.details["time_investment"]["breakdown"]["design"], json!("4 hours"));
    assert_eq!(after.rank, 0);
    let raw = memory.get(Table::Levels, "l-1").await.unwrap();
    assert_eq!(raw["time_investment"]["breakdown"]["design"], json!("4 hours"));
}

#[tokio::test]
async fn duplicate_through_intent() {
    let (_, board) = board();
    let session = admin(&board);
    let outcome = board
        .catalog()
        .dispatch(session, EditIntent::Duplicate { id: "l-4".into() })
        .await
        .unwrap();
    let IntentOutcome::Duplicated(copy) = outcome else {
        panic!("expected a duplicate");
    };
    assert_eq!(copy.title, "Pods (copy)");
    assert_eq!(copy.rank, 1);

    let saved = board
        .catalog()
        .dispatch(
            session,
            EditIntent::Save {
                table: Table::Levels,
                id: copy.id.clone(),
                fields: row(json!({"title": "Services"})),
            },
        )
        .await
        .unwrap();
    assert!(matches!(saved, IntentOutcome::Saved(r) if r["title"] == json!("Services")));
}

#[tokio::test(start_paused = true)]
async fn configured_debounce_drives_editor() {
    let memory = Arc::new(MemoryStore::from_snapshot(&sample_snapshot()).unwrap());
    let config = QuestboardConfig::new()
        .with_admin_secret("letmein")
        .with_debounce(Duration::from_millis(500));
    let board = Questboard::new(Arc::clone(&memory), config).unwrap();
    admin(&board);

    let session = board.edit_level("l-2").await.unwrap();
    assert_eq!(session.config().debounce, Duration::from_millis(500));
    session.add_breakdown_item().unwrap();
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
    tokio::time::advance(Duration::from_millis(500)).await;
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
    assert!(!session.is_dirty());
    let raw = memory.get(Table::Levels, "l-2").await.unwrap();
    assert_eq!(raw["time_investment"]["breakdown"].as_object().unwrap().len(), 3);
}
