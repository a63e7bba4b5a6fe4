use std::sync::Arc;

use client_core::{
    CannedResponder, ConversationSession, Route, SearchOutcome, SearchSession, SendOutcome,
    SessionConfig, SessionEvent, SessionPhase,
};
use futures::future::join_all;
use shared::{content, domain::Role};
use storage::{JsonFileStore, SeedSnapshot};

fn temp_store_path(label: &str) -> std::path::PathBuf {
    let suffix = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir().join(format!("session_flow_{label}_{suffix}.json"))
}

#[tokio::test(start_paused = true)]
async fn chat_round_trip_over_seeded_repositories() {
    let repos = SeedSnapshot::bundled().expect("seed").load(1.0);
    let session = ConversationSession::new(
        Arc::clone(&repos.conversations),
        Arc::new(CannedResponder::seeded(3)),
        SessionConfig::default(),
    );
    let mut events = session.subscribe();

    let outcome = session
        .send_message("Which supplier ships fastest to Europe? I need an answer for a quarterly report")
        .await
        .expect("send");
    let SendOutcome::Sent {
        conversation_id,
        created: true,
    } = outcome
    else {
        panic!("expected a new conversation, got {outcome:?}");
    };
    assert_eq!(conversation_id.0, 4);

    let view = session.snapshot().await;
    let title = view.title.expect("title");
    assert!(title.ends_with("..."));
    assert_eq!(title.chars().count(), 53);

    assert!(session.await_reply().await);
    let view = session.snapshot().await;
    assert_eq!(view.messages.len(), 2);
    assert_eq!(view.messages[1].role, Role::Assistant);
    assert!(!content::parse(&view.messages[1].content).is_empty());

    let mut phases = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::PhaseChanged(phase) = event {
            phases.push(phase);
        }
    }
    assert_eq!(
        phases,
        vec![
            SessionPhase::Sending,
            SessionPhase::AwaitingReply,
            SessionPhase::Ready
        ]
    );

    let listed = session.list_conversations(None).await.expect("list");
    assert_eq!(listed[0].id, conversation_id);

    let path = Route::Chat(Some(conversation_id)).to_path();
    assert_eq!(Route::parse(&path), Some(Route::Chat(Some(conversation_id))));
}

#[tokio::test(start_paused = true)]
async fn overlapping_searches_settle_on_the_last_query() {
    let repos = SeedSnapshot::bundled().expect("seed").load(1.0);
    let path = temp_store_path("overlap");
    let store = Arc::new(JsonFileStore::open(&path).expect("store"));
    let session = Arc::new(SearchSession::new(
        Arc::clone(&repos.products),
        store,
        SessionConfig::default(),
    ));

    let queries = ["headphones", "bluetooth", "camera", "kids"];
    let tasks = queries.iter().map(|query| {
        let session = Arc::clone(&session);
        async move { session.submit(query).await }
    });
    let outcomes = join_all(tasks).await;

    let applied: Vec<_> = outcomes.iter().filter(|o| o.is_ok()).collect();
    assert_eq!(applied.len(), 1);
    assert!(matches!(
        outcomes.last(),
        Some(Ok(SearchOutcome::Completed { result_count: 3 }))
    ));

    let view = session.snapshot().await;
    assert_eq!(view.query.as_deref(), Some("kids"));
    assert_eq!(view.history, vec!["kids", "camera", "bluetooth", "headphones"]);

    let reopened = SearchSession::new(
        Arc::clone(&repos.products),
        Arc::new(JsonFileStore::open(&path).expect("reopen")),
        SessionConfig::default(),
    );
    assert_eq!(reopened.history().await, view.history);

    let _ = std::fs::remove_file(&path);
}
