//! Conversation storage contracts and the in-memory implementation.

use std::sync::RwLock;

use pcommon::{BoxFuture, ConversationId, Registry};
use pprovider::Message;

use crate::{ChatError, Conversation};

pub type ChatFuture<'a, T> = BoxFuture<'a, T>;

pub trait ConversationStore: Send + Sync {
    fn insert<'a>(&'a self, conversation: Conversation) -> ChatFuture<'a, Result<(), ChatError>>;

    fn load<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>>;

    /// Appends to an existing conversation; unknown ids are `NotFound`.
    fn append_messages<'a>(
        &'a self,
        id: &'a ConversationId,
        messages: Vec<Message>,
    ) -> ChatFuture<'a, Result<(), ChatError>>;

    fn remove<'a>(&'a self, id: &'a ConversationId) -> ChatFuture<'a, Result<bool, ChatError>>;

    /// Conversation count and total message count.
    fn totals<'a>(&'a self) -> ChatFuture<'a, Result<(usize, usize), ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<Registry<ConversationId, Conversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn insert<'a>(&'a self, conversation: Conversation) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut conversations = self
                .conversations
                .write()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?;

            conversations.insert(conversation.id.clone(), conversation);
            Ok(())
        })
    }

    fn load<'a>(
        &'a self,
        id: &'a ConversationId,
    ) -> ChatFuture<'a, Result<Option<Conversation>, ChatError>> {
        Box::pin(async move {
            let conversations = self
                .conversations
                .read()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?;

            Ok(conversations.get(id.as_str()).cloned())
        })
    }

    fn append_messages<'a>(
        &'a self,
        id: &'a ConversationId,
        messages: Vec<Message>,
    ) -> ChatFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut conversations = self
                .conversations
                .write()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?;

            let conversation = conversations
                .get_mut(id.as_str())
                .ok_or_else(|| ChatError::not_found(format!("conversation '{id}' does not exist")))?;
            conversation.messages.extend(messages);
            Ok(())
        })
    }

    fn remove<'a>(&'a self, id: &'a ConversationId) -> ChatFuture<'a, Result<bool, ChatError>> {
        Box::pin(async move {
            let mut conversations = self
                .conversations
                .write()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?;

            Ok(conversations.remove(id.as_str()).is_some())
        })
    }

    fn totals<'a>(&'a self) -> ChatFuture<'a, Result<(usize, usize), ChatError>> {
        Box::pin(async move {
            let conversations = self
                .conversations
                .read()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?;

            let messages = conversations
                .values()
                .map(|conversation| conversation.messages.len())
                .sum();
            Ok((conversations.len(), messages))
        })
    }
}

#[cfg(test)]
mod tests {
    use pprovider::Role;

    use super::*;
    use crate::ChatErrorKind;

    #[tokio::test]
    async fn append_requires_existing_conversation() {
        let store = InMemoryConversationStore::new();
        let id = ConversationId::new("c-1");

        let error = store
            .append_messages(&id, vec![Message::new(Role::User, "hi")])
            .await
            .expect_err("unknown conversation");
        assert_eq!(error.kind, ChatErrorKind::NotFound);

        store
            .insert(Conversation::new(id.clone(), "system"))
            .await
            .expect("insert");
        store
            .append_messages(&id, vec![Message::new(Role::User, "hi")])
            .await
            .expect("append");

        let loaded = store.load(&id).await.expect("load").expect("present");
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(store.totals().await.expect("totals"), (1, 2));

        assert!(store.remove(&id).await.expect("remove"));
        assert!(!store.remove(&id).await.expect("remove again"));
    }
}
