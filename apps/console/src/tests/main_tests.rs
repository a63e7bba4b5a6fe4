use super::*;

fn chat_session(repos: &Repositories) -> Arc<ConversationSession> {
    ConversationSession::new(
        Arc::clone(&repos.conversations),
        Arc::new(CannedResponder::seeded(3)),
        client_core::SessionConfig::default(),
    )
}

async fn stored_mode(repos: &Repositories, id: i64) -> Mode {
    repos
        .conversations
        .get_by_id(ConversationId(id))
        .await
        .expect("lookup")
        .expect("exists")
        .mode
}

#[tokio::test]
async fn opening_a_conversation_keeps_its_stored_mode() {
    let repos = SeedSnapshot::bundled().expect("seed").load(0.0);
    let session = chat_session(&repos);
    assert_eq!(stored_mode(&repos, 3).await, Mode::Analysis);

    let mode = start_chat(&session, Some(ConversationId(3)), None, Mode::General)
        .await
        .expect("start");

    assert_eq!(mode, Mode::Analysis);
    assert_eq!(stored_mode(&repos, 3).await, Mode::Analysis);
}

#[tokio::test]
async fn explicit_mode_overrides_an_opened_conversation() {
    let repos = SeedSnapshot::bundled().expect("seed").load(0.0);
    let session = chat_session(&repos);

    let mode = start_chat(
        &session,
        Some(ConversationId(3)),
        Some(Mode::Coding),
        Mode::General,
    )
    .await
    .expect("start");

    assert_eq!(mode, Mode::Coding);
    assert_eq!(stored_mode(&repos, 3).await, Mode::Coding);
}

#[tokio::test]
async fn new_chat_starts_in_the_default_mode() {
    let repos = SeedSnapshot::bundled().expect("seed").load(0.0);
    let session = chat_session(&repos);
    let before = repos.conversations.count().await;

    let mode = start_chat(&session, None, None, Mode::Creative)
        .await
        .expect("start");

    assert_eq!(mode, Mode::Creative);
    assert!(session.snapshot().await.conversation_id.is_none());
    assert_eq!(repos.conversations.count().await, before);
}

#[tokio::test]
async fn missing_conversation_falls_back_to_the_default_mode() {
    let repos = SeedSnapshot::bundled().expect("seed").load(0.0);
    let session = chat_session(&repos);

    let mode = start_chat(&session, Some(ConversationId(404)), None, Mode::Creative)
        .await
        .expect("start");

    assert_eq!(mode, Mode::Creative);
}
