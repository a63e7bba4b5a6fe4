use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Lookup by id found nothing.
    NotFound,
    /// Blank message or query. Never surfaced as failure state.
    EmptyInput,
    /// Simulated backend failure; the user can retry.
    TransientServiceFailure,
    /// The request was refused because another one is still outstanding.
    Conflict,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientServiceFailure | ErrorKind::NotFound)
    }
}

/// Which user-facing operation raised a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureContext {
    LoadConversation,
    CreateConversation,
    AppendMessage,
    GenerateReply,
    DeleteConversation,
    Search,
    History,
}

/// Failure state a session exposes to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFailure {
    pub kind: ErrorKind,
    pub context: FailureContext,
    pub message: String,
    pub retryable: bool,
}

impl SessionFailure {
    pub fn new(kind: ErrorKind, context: FailureContext, message: impl Into<String>) -> Self {
        // Only loads and searches can be re-run; appends are fire-and-forget.
        let retryable = kind.is_retryable()
            && matches!(
                context,
                FailureContext::LoadConversation | FailureContext::Search
            );
        Self {
            kind,
            context,
            message: message.into(),
            retryable,
        }
    }
}
