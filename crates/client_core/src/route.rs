//! Translation between URL paths and the session parameter they select.

use shared::domain::ConversationId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Chat view; `None` is an unsaved new conversation.
    Chat(Option<ConversationId>),
    /// Product search; `None` shows the empty search page.
    Search(Option<String>),
}

impl Route {
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] | ["chat"] => Some(Route::Chat(None)),
            ["chat", id] => id
                .parse::<i64>()
                .ok()
                .filter(|id| *id > 0)
                .map(|id| Route::Chat(Some(ConversationId(id)))),
            ["search"] => Some(Route::Search(None)),
            ["search", query] => {
                let decoded = urlencoding::decode(query).ok()?;
                let decoded = decoded.trim();
                Some(Route::Search((!decoded.is_empty()).then(|| decoded.to_string())))
            }
            _ => None,
        }
    }

    pub fn to_path(&self) -> String {
        match self {
            Route::Chat(None) => "/".to_string(),
            Route::Chat(Some(id)) => format!("/chat/{id}"),
            Route::Search(None) => "/search".to_string(),
            Route::Search(Some(query)) => format!("/search/{}", urlencoding::encode(query)),
        }
    }
}

#[cfg(test)]
#[path = "tests/route_tests.rs"]
mod tests;
