//! Session state engine: turns user actions into ordered asynchronous
//! repository calls and reconciles the results into view state.

use std::time::Duration;

pub mod conversation;
pub mod error;
pub mod events;
pub mod history;
pub mod responder;
pub mod route;
pub mod search;

pub use conversation::{derive_title, ConversationSession, ConversationView, SendOutcome};
pub use error::SessionError;
pub use events::{SessionEvent, SessionPhase};
pub use history::SearchHistory;
pub use responder::{CannedResponder, ResponseGenerator};
pub use route::Route;
pub use search::{SearchOutcome, SearchSession, SearchView, QUICK_SEARCHES};

pub const DEFAULT_HISTORY_KEY: &str = "product_search.history";

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Typing interval before the assistant reply is stored.
    pub reply_delay: Duration,
    /// Key-value entry holding the JSON-encoded search history.
    pub history_key: String,
    pub history_limit: usize,
    pub search_limit: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reply_delay: Duration::from_millis(1500),
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            history_limit: 10,
            search_limit: storage::SEARCH_RESULT_LIMIT,
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
