use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gateway::{ChunkOut, Gateway, QaResponse};

/// Context size requested from the backend for every question.
pub const DEFAULT_CONTEXT_SIZE: usize = 5;

/// Fixed transcript text appended when a question cannot be answered. The
/// underlying diagnostic is logged, never shown in the transcript.
pub const ANSWER_FAILED_MESSAGE: &str = "Sorry, I encountered an error while processing your question. Please try again or make sure you have uploaded some documents first.";

/// Step between the synthetic relevance scores of consecutive sources.
const ORDER_SCORE_STEP: f32 = 0.1;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SourceMetadata {
    pub document_id: i64,
    pub document_name: Option<String>,
    pub chunk_id: i64,
}

/// A retrieved passage cited by an assistant message.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Source {
    pub id: String,
    pub title: String,
    pub excerpt: String,
    pub relevance_score: f32,
    pub metadata: SourceMetadata,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    pub timestamp: DateTime<Utc>,
}

/// Lifecycle of the current query. At most one query is `Pending`;
/// `Resolved` and `Failed` accept a new submission like `Composing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Composing,
    Pending,
    Resolved,
    Failed,
}

/// How a call to [`submit`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty input, or another query was already in flight. Nothing changed.
    Ignored,
    Answered,
    Failed,
}

/// The chat transcript and its per-query state machine. Messages are
/// append-only: once pushed they are never mutated, removed or reordered.
pub struct ChatSession {
    messages: Vec<Message>,
    state: QueryState,
    last_id: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            state: QueryState::Composing,
            last_id: 0,
        }
    }

    pub fn transcript(&self) -> &[Message] {
        &self.messages
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn is_pending(&self) -> bool {
        self.state == QueryState::Pending
    }

    /// Gates and starts a query. Returns the trimmed query text to dispatch,
    /// or `None` when the input is blank or a query is already pending; in
    /// that case the transcript is untouched.
    ///
    /// On success the user message is appended immediately and is never
    /// retracted, even if the backend call later fails.
    pub fn begin_query(&mut self, input: &str) -> Option<String> {
        let query = input.trim();
        if query.is_empty() || self.state == QueryState::Pending {
            return None;
        }

        let message = Message {
            id: self.next_id(),
            role: Role::User,
            content: query.to_string(),
            sources: None,
            timestamp: Utc::now(),
        };
        self.messages.push(message);
        self.state = QueryState::Pending;
        Some(query.to_string())
    }

    /// Reconciles a successful answer into the transcript.
    pub fn resolve(&mut self, response: QaResponse) {
        let sources = order_scored_sources(&response.context);
        let message = Message {
            id: self.next_id(),
            role: Role::Assistant,
            content: response.answer,
            sources: (!sources.is_empty()).then_some(sources),
            timestamp: Utc::now(),
        };
        self.messages.push(message);
        self.state = QueryState::Resolved;
    }

    /// Reconciles a failed request: a fixed apologetic message, no sources.
    pub fn fail(&mut self) {
        let message = Message {
            id: self.next_id(),
            role: Role::Assistant,
            content: ANSWER_FAILED_MESSAGE.to_string(),
            sources: None,
            timestamp: Utc::now(),
        };
        self.messages.push(message);
        self.state = QueryState::Failed;
    }

    // Millisecond timestamps with a monotonic tie-break, so two messages
    // created in the same millisecond still get distinct, ordered ids.
    fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis() as u64;
        self.last_id = now.max(self.last_id + 1);
        self.last_id.to_string()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs one query through the session: gate, dispatch, reconcile. The lock
/// is never held across the network call.
pub async fn submit(session: &Mutex<ChatSession>, gateway: &Gateway, input: &str) -> SubmitOutcome {
    let query = {
        let mut chat = session.lock().unwrap();
        match chat.begin_query(input) {
            Some(query) => query,
            None => return SubmitOutcome::Ignored,
        }
    }; // lock released before the network call

    let result = gateway.ask(&query, DEFAULT_CONTEXT_SIZE).await;

    let mut chat = session.lock().unwrap();
    match result {
        Ok(response) => {
            chat.resolve(response);
            SubmitOutcome::Answered
        }
        Err(e) => {
            tracing::error!(error = %e, "ask request failed");
            chat.fail();
            SubmitOutcome::Failed
        }
    }
}

/// Order-based fallback scoring: the backend supplies no explicit relevance,
/// so sources get 1.0, 0.9, 0.8, ... by response position. Nameless
/// documents are labelled by their id.
pub fn order_scored_sources(context: &[ChunkOut]) -> Vec<Source> {
    context
        .iter()
        .enumerate()
        .map(|(index, chunk)| {
            let label = chunk
                .document_name
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("Document {}", chunk.document_id));
            Source {
                id: chunk.id.to_string(),
                title: format!("{} - Chunk {}", label, chunk.id),
                excerpt: chunk.content.clone(),
                relevance_score: 1.0 - index as f32 * ORDER_SCORE_STEP,
                metadata: SourceMetadata {
                    document_id: chunk.document_id,
                    document_name: chunk.document_name.clone(),
                    chunk_id: chunk.id,
                },
            }
        })
        .collect()
}
