//! Chat session: loads conversations, sends user messages and delivers the
//! assistant reply after the typing interval.
//!
//! Every context switch bumps a generation counter. Asynchronous results
//! tagged with an older generation are dropped on arrival instead of being
//! applied to the view.

use std::sync::Arc;

use serde::Serialize;
use shared::{
    domain::{Conversation, ConversationId, Message, Mode, Role},
    error::{FailureContext, SessionFailure},
};
use storage::{ConversationPatch, MockRepository, NewConversation};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    error::SessionError,
    events::{SessionEvent, SessionPhase},
    responder::ResponseGenerator,
    SessionConfig,
};

const TITLE_MAX_CHARS: usize = 50;

/// Title for a conversation started by `text`: the trimmed text, cut to 50
/// characters with a trailing `...` when longer.
pub fn derive_title(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= TITLE_MAX_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(TITLE_MAX_CHARS).collect();
    format!("{head}...")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing changed.
    Ignored,
    Sent {
        conversation_id: ConversationId,
        created: bool,
    },
}

/// What the chat view renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationView {
    pub phase: SessionPhase,
    pub conversation_id: Option<ConversationId>,
    pub title: Option<String>,
    pub mode: Mode,
    pub messages: Vec<Message>,
    pub loading: bool,
    pub typing: bool,
    pub error: Option<SessionFailure>,
}

#[derive(Default)]
struct ConversationState {
    phase: SessionPhase,
    generation: u64,
    conversation_id: Option<ConversationId>,
    title: Option<String>,
    mode: Mode,
    messages: Vec<Message>,
    error: Option<SessionFailure>,
    failed_load: Option<ConversationId>,
}

impl ConversationState {
    fn view(&self) -> ConversationView {
        ConversationView {
            phase: self.phase,
            conversation_id: self.conversation_id,
            title: self.title.clone(),
            mode: self.mode,
            messages: self.messages.clone(),
            loading: self.phase == SessionPhase::Loading,
            typing: self.phase == SessionPhase::AwaitingReply,
            error: self.error.clone(),
        }
    }

    /// Drops whatever is bound and invalidates in-flight work.
    fn reset(&mut self) {
        self.generation += 1;
        self.conversation_id = None;
        self.title = None;
        self.messages.clear();
        self.error = None;
        self.failed_load = None;
    }

    /// Swaps the optimistic copy of the last sent message for the stored one.
    fn replace_last(&mut self, stored: Message) {
        match self.messages.last_mut() {
            Some(last) if last.is_user() && last.id.is_empty() => *last = stored,
            _ => self.messages.push(stored),
        }
    }
}

pub struct ConversationSession {
    repository: Arc<MockRepository<Conversation>>,
    responder: Arc<dyn ResponseGenerator>,
    config: SessionConfig,
    inner: Mutex<ConversationState>,
    pending_reply: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<SessionEvent>,
}

impl ConversationSession {
    pub fn new(
        repository: Arc<MockRepository<Conversation>>,
        responder: Arc<dyn ResponseGenerator>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            repository,
            responder,
            config,
            inner: Mutex::new(ConversationState::default()),
            pending_reply: Mutex::new(None),
            events,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> ConversationView {
        self.inner.lock().await.view()
    }

    /// Loads `id` into the session. `Ok(None)` means the conversation does
    /// not exist; the session is then in the error phase and
    /// [`retry`](Self::retry) re-runs the load.
    pub async fn select_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, SessionError> {
        let generation = {
            let mut state = self.inner.lock().await;
            state.reset();
            self.transition(&mut state, SessionPhase::Loading);
            state.generation
        };
        debug!(conversation_id = %id, generation, "loading conversation");

        let fetched = self.repository.get_by_id(id).await;

        let mut state = self.inner.lock().await;
        if state.generation != generation {
            self.discard("load_conversation", generation);
            return Err(SessionError::Superseded);
        }
        match fetched {
            Ok(Some(conversation)) => {
                state.conversation_id = Some(conversation.id);
                state.title = Some(conversation.title.clone());
                state.mode = conversation.mode;
                state.messages = conversation.messages.clone();
                self.transition(&mut state, SessionPhase::Ready);
                self.emit(SessionEvent::ConversationLoaded {
                    id,
                    message_count: conversation.messages.len(),
                });
                Ok(Some(conversation))
            }
            Ok(None) => {
                let error = SessionError::NotFound {
                    entity: "conversation",
                    id: id.into(),
                };
                self.fail_load(&mut state, id, &error);
                Ok(None)
            }
            Err(err) => {
                let error = SessionError::from(err);
                self.fail_load(&mut state, id, &error);
                Err(error)
            }
        }
    }

    /// Re-runs the last failed load.
    pub async fn retry(&self) -> Result<Option<Conversation>, SessionError> {
        let target = self.inner.lock().await.failed_load;
        match target {
            Some(id) => self.select_conversation(id).await,
            None => Err(SessionError::NothingToRetry),
        }
    }

    /// Unbinds the session. Nothing is created until the first message.
    pub async fn new_conversation(&self) {
        let mut state = self.inner.lock().await;
        state.reset();
        self.transition(&mut state, SessionPhase::Ready);
    }

    /// Mode for the messages sent from now on. A bound conversation
    /// stores the new mode too.
    pub async fn set_mode(&self, mode: Mode) -> Result<(), SessionError> {
        let bound = {
            let mut state = self.inner.lock().await;
            if state.mode == mode {
                return Ok(());
            }
            state.mode = mode;
            self.emit(SessionEvent::ModeChanged(mode));
            state.conversation_id
        };

        if let Some(id) = bound {
            let patch = ConversationPatch {
                mode: Some(mode),
                ..ConversationPatch::default()
            };
            if self.repository.update(id, patch).await?.is_none() {
                return Err(SessionError::NotFound {
                    entity: "conversation",
                    id: id.into(),
                });
            }
        }
        Ok(())
    }

    /// Sends `text` as a user message.
    ///
    /// The message shows up locally before it is persisted and stays there if
    /// persisting fails. Without a bound conversation one is created with a
    /// title taken from `text`. On success the reply is generated in the
    /// background; [`await_reply`](Self::await_reply) waits for it.
    pub async fn send_message(self: &Arc<Self>, text: &str) -> Result<SendOutcome, SessionError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Ignored);
        }

        let (generation, bound, mode, message) = {
            let mut state = self.inner.lock().await;
            match state.phase {
                SessionPhase::Sending | SessionPhase::AwaitingReply => {
                    return Err(SessionError::ReplyPending)
                }
                SessionPhase::Loading | SessionPhase::Error => {
                    return Err(SessionError::NotReady(state.phase))
                }
                SessionPhase::Idle | SessionPhase::Ready => {}
            }
            let message = Message::new(Role::User, text, state.mode);
            state.messages.push(message.clone());
            state.error = None;
            self.emit(SessionEvent::MessageAppended(message.clone()));
            self.transition(&mut state, SessionPhase::Sending);
            (state.generation, state.conversation_id, state.mode, message)
        };

        let (context, persisted) = match bound {
            None => {
                let draft = NewConversation {
                    title: derive_title(text),
                    messages: vec![message],
                    mode,
                };
                let created = self.repository.create(draft).await.map_err(SessionError::from);
                (FailureContext::CreateConversation, created.map(Persisted::Created))
            }
            Some(id) => {
                let appended = match self.repository.add_message(id, message).await {
                    Ok(Some(stored)) => Ok(Persisted::Appended(id, stored)),
                    Ok(None) => Err(SessionError::NotFound {
                        entity: "conversation",
                        id: id.into(),
                    }),
                    Err(err) => Err(err.into()),
                };
                (FailureContext::AppendMessage, appended)
            }
        };

        let mut state = self.inner.lock().await;
        if state.generation != generation {
            self.discard("send_message", generation);
            return Err(SessionError::Superseded);
        }

        let (conversation_id, created) = match persisted {
            Ok(Persisted::Created(conversation)) => {
                info!(
                    conversation_id = %conversation.id,
                    title = %conversation.title,
                    "conversation created"
                );
                state.conversation_id = Some(conversation.id);
                state.title = Some(conversation.title.clone());
                if let Some(stored) = conversation.messages.into_iter().last() {
                    state.replace_last(stored);
                }
                self.emit(SessionEvent::ConversationCreated {
                    id: conversation.id,
                    title: conversation.title,
                });
                (conversation.id, true)
            }
            Ok(Persisted::Appended(id, stored)) => {
                state.replace_last(stored);
                (id, false)
            }
            Err(error) => {
                let failure = error.to_failure(context);
                warn!(generation, error = %error, "persisting user message failed");
                state.error = Some(failure.clone());
                self.transition(&mut state, SessionPhase::Ready);
                self.emit(SessionEvent::Failure(failure));
                return Err(error);
            }
        };

        self.transition(&mut state, SessionPhase::AwaitingReply);
        let task = Arc::clone(self).deliver_reply(conversation_id, generation, mode, text.to_string());
        *self.pending_reply.lock().await = Some(tokio::spawn(task));

        Ok(SendOutcome::Sent {
            conversation_id,
            created,
        })
    }

    /// Waits for the reply task started by the last send, if any.
    /// Returns `false` when nothing was pending.
    pub async fn await_reply(&self) -> bool {
        let Some(handle) = self.pending_reply.lock().await.take() else {
            return false;
        };
        if let Err(err) = handle.await {
            warn!(error = %err, "reply task ended abnormally");
        }
        true
    }

    /// All conversations, most recently updated first, optionally narrowed
    /// to titles containing `filter` (case-insensitive).
    pub async fn list_conversations(
        &self,
        filter: Option<&str>,
    ) -> Result<Vec<Conversation>, SessionError> {
        let needle = filter
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_lowercase);

        let mut conversations = self.repository.get_all().await?;
        if let Some(needle) = needle {
            conversations.retain(|c| c.title.to_lowercase().contains(&needle));
        }
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    /// Deletes `id`; when it was the active conversation the session starts a
    /// new one.
    pub async fn delete_conversation(&self, id: ConversationId) -> Result<bool, SessionError> {
        let deleted = match self.repository.delete(id).await {
            Ok(deleted) => deleted,
            Err(err) => {
                let error = SessionError::from(err);
                let failure = error.to_failure(FailureContext::DeleteConversation);
                self.inner.lock().await.error = Some(failure.clone());
                self.emit(SessionEvent::Failure(failure));
                return Err(error);
            }
        };
        if !deleted {
            return Ok(false);
        }

        info!(conversation_id = %id, "conversation deleted");
        self.emit(SessionEvent::ConversationDeleted(id));
        let mut state = self.inner.lock().await;
        if state.conversation_id == Some(id) {
            state.reset();
            self.transition(&mut state, SessionPhase::Ready);
        }
        Ok(true)
    }

    async fn deliver_reply(
        self: Arc<Self>,
        conversation_id: ConversationId,
        generation: u64,
        mode: Mode,
        prompt: String,
    ) {
        let reply = self.responder.reply(mode, &prompt).await;
        tokio::time::sleep(self.config.reply_delay).await;

        if self.inner.lock().await.generation != generation {
            self.discard("generate_reply", generation);
            return;
        }

        let content = match reply {
            Ok(content) => content,
            Err(err) => {
                self.fail_reply(generation, SessionError::Responder(err)).await;
                return;
            }
        };

        let message = Message::new(Role::Assistant, content, mode);
        let stored = match self.repository.add_message(conversation_id, message).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                let error = SessionError::NotFound {
                    entity: "conversation",
                    id: conversation_id.into(),
                };
                self.fail_reply(generation, error).await;
                return;
            }
            Err(err) => {
                self.fail_reply(generation, err.into()).await;
                return;
            }
        };

        let mut state = self.inner.lock().await;
        if state.generation != generation {
            debug!(conversation_id = %conversation_id, "reply stored after the session moved on");
            self.discard("generate_reply", generation);
            return;
        }
        state.messages.push(stored.clone());
        self.emit(SessionEvent::MessageAppended(stored));
        self.transition(&mut state, SessionPhase::Ready);
    }

    async fn fail_reply(&self, generation: u64, error: SessionError) {
        warn!(generation, error = %error, "assistant reply failed");
        let mut state = self.inner.lock().await;
        if state.generation != generation {
            return;
        }
        let failure = error.to_failure(FailureContext::GenerateReply);
        state.error = Some(failure.clone());
        self.transition(&mut state, SessionPhase::Ready);
        self.emit(SessionEvent::Failure(failure));
    }

    fn fail_load(&self, state: &mut ConversationState, id: ConversationId, error: &SessionError) {
        warn!(conversation_id = %id, error = %error, "loading conversation failed");
        let failure = error.to_failure(FailureContext::LoadConversation);
        state.failed_load = Some(id);
        state.error = Some(failure.clone());
        self.transition(state, SessionPhase::Error);
        self.emit(SessionEvent::Failure(failure));
    }

    fn transition(&self, state: &mut ConversationState, phase: SessionPhase) {
        if state.phase == phase {
            return;
        }
        let was_typing = state.phase == SessionPhase::AwaitingReply;
        state.phase = phase;
        self.emit(SessionEvent::PhaseChanged(phase));
        let typing = phase == SessionPhase::AwaitingReply;
        if typing != was_typing {
            self.emit(SessionEvent::TypingChanged(typing));
        }
    }

    fn discard(&self, operation: &'static str, generation: u64) {
        info!(operation, generation, "discarding result of superseded request");
        self.emit(SessionEvent::StaleResultDiscarded {
            operation,
            generation,
        });
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

enum Persisted {
    Created(Conversation),
    Appended(ConversationId, Message),
}

#[cfg(test)]
#[path = "tests/conversation_tests.rs"]
mod tests;
