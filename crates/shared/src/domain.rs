use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(ConversationId);
id_newtype!(ProductId);
id_newtype!(TemplateId);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    General,
    Coding,
    Creative,
    Analysis,
}

impl Mode {
    pub const ALL: [Mode; 4] = [Mode::General, Mode::Coding, Mode::Creative, Mode::Analysis];

    pub fn as_str(self) -> &'static str {
        match self {
            Mode::General => "general",
            Mode::Coding => "coding",
            Mode::Creative => "creative",
            Mode::Analysis => "analysis",
        }
    }

    /// Human-readable name shown next to the message input.
    pub fn label(self) -> &'static str {
        match self {
            Mode::General => "General chat",
            Mode::Coding => "Programming",
            Mode::Creative => "Creative",
            Mode::Analysis => "Analysis",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Mode::General),
            "coding" => Ok(Mode::Coding),
            "creative" => Ok(Mode::Creative),
            "analysis" => Ok(Mode::Analysis),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A single chat message. Never mutated after it has been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub mode: Mode,
}

impl Message {
    /// Builds a message that has not been stored yet; the repository may
    /// replace `id` and `timestamp` when it persists a copy.
    pub fn new(role: Role, content: impl Into<String>, mode: Mode) -> Self {
        Self {
            id: String::new(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
            mode,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub mode: Mode,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Appends a message and advances `updated_at`, never moving it backwards.
    pub fn push_message(&mut self, message: Message, now: DateTime<Utc>) {
        self.messages.push(message);
        self.updated_at = now.max(self.updated_at);
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub keywords: BTreeSet<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub orders: Option<u32>,
    #[serde(default)]
    pub url: Option<String>,
}

impl Product {
    /// Case-insensitive substring match against name, category and keywords.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.category.to_lowercase().contains(needle)
            || self
                .keywords
                .iter()
                .any(|keyword| keyword.to_lowercase().contains(needle))
    }

    pub fn display_price(&self) -> String {
        match self.price {
            Some(price) => format!("${price:.2}"),
            None => "Price on request".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,
    pub category: String,
    #[serde(default)]
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub default_mode: Mode,
    #[serde(default)]
    pub theme: Theme,
    pub language: String,
    #[serde(default = "default_send_on_enter")]
    pub send_on_enter: bool,
}

fn default_send_on_enter() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_mode: Mode::General,
            theme: Theme::Light,
            language: "en".into(),
            send_on_enter: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsPatch {
    pub default_mode: Option<Mode>,
    pub theme: Option<Theme>,
    pub language: Option<String>,
    pub send_on_enter: Option<bool>,
}

impl Settings {
    pub fn apply(&mut self, patch: SettingsPatch) {
        if let Some(mode) = patch.default_mode {
            self.default_mode = mode;
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        if let Some(send_on_enter) = patch.send_on_enter {
            self.send_on_enter = send_on_enter;
        }
    }
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
