//! In-memory collaborators behind the enrich, converse, persist and notify seams.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use vigil_core::error::CollaboratorError;
use vigil_core::pipeline::{
    ConversationRequest, ConversationService, ConversationSession, Notifier, SnapshotStore,
    TextGenerator, TimeoutNotice,
};

/// Text generator with a canned reply, or a failure when `reply` is `None`.
pub struct StubGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StubGenerator {
    /// Generator answering with a structured assessment.
    pub fn answering() -> Self {
        Self {
            reply: Some(
                "Risk Level: Critical\n\nRemediation Plan:\n\
                 1. Use parameterized queries\n\
                 2. Switch to bcrypt\n\n\
                 Analysis: The injection is reachable from the login form."
                    .to_owned(),
            ),
            calls: AtomicUsize::new(0),
        }
    }

    /// Generator whose every call fails.
    pub fn failing() -> Self {
        Self {
            reply: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TextGenerator for StubGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or_else(|| CollaboratorError::Status {
            status: 500,
            body: "model crashed".to_owned(),
        })
    }
}

/// Conversation service that always opens `session-1`.
#[derive(Default)]
pub struct StubConversation;

impl ConversationService for StubConversation {
    async fn start_session(
        &self,
        request: &ConversationRequest,
    ) -> Result<ConversationSession, CollaboratorError> {
        Ok(ConversationSession {
            session_id: format!("session-{}", request.pipeline_id),
            suggested_prompts: vec!["Which finding should I fix first?".to_owned()],
        })
    }
}

/// Snapshot store keeping everything in memory.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: Mutex<Vec<Value>>,
}

#[allow(dead_code)]
impl MemoryStore {
    pub fn snapshots(&self) -> Vec<Value> {
        self.snapshots.lock().expect("should lock snapshots").clone()
    }
}

impl SnapshotStore for MemoryStore {
    async fn store(&self, snapshot: &Value) -> Result<String, CollaboratorError> {
        let mut snapshots = self.snapshots.lock().expect("should lock snapshots");
        snapshots.push(snapshot.clone());
        Ok(format!("snapshot-{}", snapshots.len()))
    }
}

/// Notifier recording every notice it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<TimeoutNotice>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn notices(&self) -> Vec<TimeoutNotice> {
        self.notices.lock().expect("should lock notices").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notice: &TimeoutNotice) -> Result<(), CollaboratorError> {
        self.notices
            .lock()
            .expect("should lock notices")
            .push(notice.clone());
        Ok(())
    }
}
