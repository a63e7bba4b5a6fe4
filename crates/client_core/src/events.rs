use serde::Serialize;
use shared::{
    domain::{ConversationId, Message, Mode},
    error::SessionFailure,
};

/// Lifecycle phase of a session. Search sessions only use
/// `Idle`, `Loading`, `Ready` and `Error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Sending,
    AwaitingReply,
    Error,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    PhaseChanged(SessionPhase),
    TypingChanged(bool),
    ModeChanged(Mode),
    ConversationLoaded {
        id: ConversationId,
        message_count: usize,
    },
    ConversationCreated {
        id: ConversationId,
        title: String,
    },
    ConversationDeleted(ConversationId),
    MessageAppended(Message),
    SearchCompleted {
        query: String,
        result_count: usize,
    },
    SearchCleared,
    HistoryUpdated(Vec<String>),
    StaleResultDiscarded {
        operation: &'static str,
        generation: u64,
    },
    Failure(SessionFailure),
}
