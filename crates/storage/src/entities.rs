use std::convert::Infallible;

use chrono::{DateTime, Utc};
use shared::domain::{
    Conversation, ConversationId, Message, Mode, Product, ProductId, Template, TemplateId,
};
use uuid::Uuid;

use crate::{Entity, LatencyProfile, MockRepository, Operation, RepositoryError};

/// Upper bound on products returned by a single search.
pub const SEARCH_RESULT_LIMIT: usize = 24;

#[derive(Debug, Clone)]
pub struct NewConversation {
    pub title: String,
    pub messages: Vec<Message>,
    pub mode: Mode,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationPatch {
    pub title: Option<String>,
    pub messages: Option<Vec<Message>>,
    pub mode: Option<Mode>,
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub category: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct TemplatePatch {
    pub category: Option<String>,
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Gives an unsaved message its storage id.
fn stamp(mut message: Message) -> Message {
    if message.id.is_empty() {
        message.id = format!("msg-{}", Uuid::new_v4());
    }
    message
}

impl Entity for Conversation {
    type Id = ConversationId;
    type Draft = NewConversation;
    type Patch = ConversationPatch;

    const NAME: &'static str = "conversation";

    fn id(&self) -> ConversationId {
        self.id
    }

    fn from_draft(id: ConversationId, draft: NewConversation, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            messages: draft.messages.into_iter().map(stamp).collect(),
            mode: draft.mode,
            created_at: now,
            updated_at: now,
        }
    }

    fn apply_patch(&mut self, patch: ConversationPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(messages) = patch.messages {
            self.messages = messages.into_iter().map(stamp).collect();
        }
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        self.updated_at = now.max(self.updated_at);
    }

    fn default_latency() -> LatencyProfile {
        LatencyProfile::conversations()
    }
}

impl Entity for Template {
    type Id = TemplateId;
    type Draft = NewTemplate;
    type Patch = TemplatePatch;

    const NAME: &'static str = "template";

    fn id(&self) -> TemplateId {
        self.id
    }

    fn from_draft(id: TemplateId, draft: NewTemplate, _now: DateTime<Utc>) -> Self {
        Self {
            id,
            category: draft.category,
            title: draft.title,
            content: draft.content,
        }
    }

    fn apply_patch(&mut self, patch: TemplatePatch, _now: DateTime<Utc>) {
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
    }
}

/// The catalog is read-only: products can be neither created nor patched.
impl Entity for Product {
    type Id = ProductId;
    type Draft = Infallible;
    type Patch = Infallible;

    const NAME: &'static str = "product";

    fn id(&self) -> ProductId {
        self.id
    }

    fn from_draft(_id: ProductId, draft: Infallible, _now: DateTime<Utc>) -> Self {
        match draft {}
    }

    fn apply_patch(&mut self, patch: Infallible, _now: DateTime<Utc>) {
        match patch {}
    }

    fn default_latency() -> LatencyProfile {
        LatencyProfile::products()
    }
}

impl MockRepository<Conversation> {
    /// Appends `message` to a conversation and bumps its `updated_at`.
    /// Returns the stored copy, or `None` if the conversation is gone.
    pub async fn add_message(
        &self,
        id: ConversationId,
        message: Message,
    ) -> Result<Option<Message>, RepositoryError> {
        self.simulate(Operation::Append).await?;

        let mut records = self.records.write().await;
        let Some(conversation) = records.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };
        let stored = stamp(message);
        conversation.push_message(stored.clone(), Utc::now());
        Ok(Some(stored))
    }
}

impl MockRepository<Product> {
    /// Products whose name, category or any keyword contains `query`,
    /// ignoring case. A blank query matches nothing and skips the backend.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Product>, RepositoryError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        self.simulate(Operation::Search).await?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|product| product.matches(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    pub async fn by_category(&self, category: &str) -> Result<Vec<Product>, RepositoryError> {
        self.simulate(Operation::Query).await?;
        let wanted = category.to_lowercase();
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|product| product.category.to_lowercase() == wanted)
            .cloned()
            .collect())
    }

    /// Highest-rated products first.
    pub async fn popular(&self, limit: usize) -> Result<Vec<Product>, RepositoryError> {
        self.simulate(Operation::GetAll).await?;
        let mut products = self.records.read().await.clone();
        products.sort_by(|a, b| {
            b.rating
                .unwrap_or(0.0)
                .total_cmp(&a.rating.unwrap_or(0.0))
        });
        products.truncate(limit);
        Ok(products)
    }
}

impl MockRepository<Template> {
    pub async fn by_category(&self, category: &str) -> Result<Vec<Template>, RepositoryError> {
        self.simulate(Operation::Query).await?;
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|template| template.category == category)
            .cloned()
            .collect())
    }
}
