// Per-session state: the chat transcript, the uploaded table, the display-only
// data dictionary, and the analysis toggle. Everything here is ephemeral; state
// lives exactly as long as the process.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::table::DataTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
}

/// State for one browser session. Initialized empty on first access; never
/// shared across sessions; dropped with the process.
#[derive(Debug, Default)]
pub struct SessionState {
    pub transcript: Vec<ChatMessage>,
    pub table: Option<DataTable>,
    pub dictionary: Option<DataTable>,
    pub analysis_enabled: bool,
}

impl SessionState {
    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, content.into());
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, content.into());
    }

    fn push(&mut self, role: Role, content: String) {
        let timestamp = Local::now().format("%H:%M:%S").to_string();
        self.transcript.push(ChatMessage {
            role,
            content,
            timestamp,
        });
    }

    /// Replaces any previously uploaded table; old data is never merged.
    pub fn set_table(&mut self, table: DataTable) {
        self.table = Some(table);
    }

    pub fn set_dictionary(&mut self, dictionary: DataTable) {
        self.dictionary = Some(dictionary);
    }
}

/// All live sessions, keyed by the browser's session cookie. Each session
/// carries its own lock so that one session's in-flight model call never
/// blocks another session's requests.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Arc<Mutex<SessionState>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand back the session handle for `id`, creating it empty on first
    /// access. The map lock is held only for the lookup; callers lock the
    /// returned handle, which serializes requests within that session only.
    pub async fn session(&self, id: Uuid) -> Arc<Mutex<SessionState>> {
        self.sessions.lock().await.entry(id).or_default().clone()
    }
}
