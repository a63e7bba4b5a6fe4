use shared::error::{ErrorKind, FailureContext, SessionFailure};
use storage::RepositoryError;
use thiserror::Error;

use crate::events::SessionPhase;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("a reply is still pending for this conversation")]
    ReplyPending,
    #[error("session cannot send while {0:?}")]
    NotReady(SessionPhase),
    #[error("request superseded by a newer one")]
    Superseded,
    #[error("nothing to retry")]
    NothingToRetry,
    #[error(transparent)]
    Backend(#[from] RepositoryError),
    #[error("response generator failed: {0}")]
    Responder(#[source] anyhow::Error),
    #[error("key-value store failed: {0}")]
    Store(#[source] anyhow::Error),
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::NotFound { .. } => ErrorKind::NotFound,
            SessionError::ReplyPending
            | SessionError::NotReady(_)
            | SessionError::Superseded
            | SessionError::NothingToRetry => ErrorKind::Conflict,
            SessionError::Backend(_) | SessionError::Responder(_) | SessionError::Store(_) => {
                ErrorKind::TransientServiceFailure
            }
        }
    }

    pub fn to_failure(&self, context: FailureContext) -> SessionFailure {
        SessionFailure::new(self.kind(), context, self.to_string())
    }
}
