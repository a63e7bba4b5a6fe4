use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use shared::domain::{Message, Mode, Role};
use storage::{ConversationPatch, NewConversation, SeedSnapshot, SEARCH_RESULT_LIMIT};

#[tokio::test(start_paused = true)]
async fn conversation_lifecycle_against_bundled_seed() {
    let snapshot = SeedSnapshot::bundled().expect("seed");
    let repos = snapshot.load(1.0);
    let seeded_max = snapshot
        .conversations
        .iter()
        .map(|c| c.id.0)
        .max()
        .expect("seeded conversations");

    let created = repos
        .conversations
        .create(NewConversation {
            title: "Supplier shortlist".into(),
            messages: vec![Message::new(Role::User, "Supplier shortlist", Mode::Analysis)],
            mode: Mode::Analysis,
        })
        .await
        .expect("create");
    assert_eq!(created.id.0, seeded_max + 1);

    tokio::time::advance(Duration::from_millis(5)).await;
    let reply = Message::new(Role::Assistant, "**Key findings:**", Mode::Analysis);
    repos
        .conversations
        .add_message(created.id, reply)
        .await
        .expect("append")
        .expect("exists");

    let renamed = repos
        .conversations
        .update(
            created.id,
            ConversationPatch {
                title: Some("Shortlist (final)".into()),
                ..ConversationPatch::default()
            },
        )
        .await
        .expect("update")
        .expect("exists");
    assert_eq!(renamed.messages.len(), 2);
    assert!(renamed.updated_at >= created.updated_at);

    assert!(repos.conversations.delete(created.id).await.expect("delete"));
    assert!(!repos.conversations.delete(created.id).await.expect("delete twice"));
    assert_eq!(
        repos.conversations.count().await,
        snapshot.conversations.len()
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_searches_all_resolve_against_the_same_catalog() {
    let repos = SeedSnapshot::bundled().expect("seed").load(1.0);
    let catalog = Arc::clone(&repos.products);

    let queries = ["bluetooth", "PHONE", "kitchen", "zzz-no-match"];
    let results = join_all(queries.iter().map(|q| {
        let catalog = Arc::clone(&catalog);
        async move { catalog.search(q, SEARCH_RESULT_LIMIT).await }
    }))
    .await;

    for (query, result) in queries.iter().zip(results) {
        let products = result.expect("search");
        let needle = query.to_lowercase();
        assert!(products.iter().all(|p| p.matches(&needle)), "query {query}");
        assert!(products.len() <= SEARCH_RESULT_LIMIT);
    }
}
