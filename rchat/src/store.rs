//! Conversation storage contracts and a basic in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use rcommon::{BoxFuture, SessionId};
use rprovider::Message;

use crate::ChatError;

pub type ChatFuture<'a, T> = BoxFuture<'a, T>;

pub trait ConversationStore: Send + Sync {
    fn load_messages<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> ChatFuture<'a, Result<Vec<Message>, ChatError>>;

    fn append_messages<'a>(
        &'a self,
        session_id: &'a SessionId,
        messages: Vec<Message>,
    ) -> ChatFuture<'a, Result<(), ChatError>>;

    fn clear<'a>(&'a self, session_id: &'a SessionId) -> ChatFuture<'a, Result<(), ChatError>>;
}

/// Process-lifetime history keyed by session id.
#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    sessions: Mutex<HashMap<SessionId, Vec<Message>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn load_messages<'a>(
        &'a self,
        session_id: &'a SessionId,
    ) -> ChatFuture<'a, Result<Vec<Message>, ChatError>> {
        Box::pin(async move {
            let sessions = self
                .sessions
                .lock()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?;

            Ok(sessions.get(session_id).cloned().unwrap_or_default())
        })
    }

    fn append_messages<'a>(
        &'a self,
        session_id: &'a SessionId,
        messages: Vec<Message>,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut sessions = self
                .sessions
                .lock()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?;

            sessions
                .entry(session_id.clone())
                .or_default()
                .extend(messages);

            Ok(())
        })
    }

    fn clear<'a>(&'a self, session_id: &'a SessionId) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            self.sessions
                .lock()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?
                .remove(session_id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sessions_are_isolated_and_clearable() {
        let store = InMemoryConversationStore::new();
        let alpha = SessionId::from("alpha");
        let beta = SessionId::from("beta");

        store
            .append_messages(&alpha, vec![Message::user("hi"), Message::assistant("hello")])
            .await
            .expect("append should succeed");

        assert_eq!(store.load_messages(&alpha).await.expect("load").len(), 2);
        assert!(store.load_messages(&beta).await.expect("load").is_empty());

        store.clear(&alpha).await.expect("clear should succeed");
        assert!(store.load_messages(&alpha).await.expect("load").is_empty());
    }
}
