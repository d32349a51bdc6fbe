//! In-process conversation buffer.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use drover_core::{DroverError, Memory, Message, MessageQuery, RequestContext, Result};

const DEFAULT_MAX_MESSAGES: usize = 100;

/// Simple in-memory conversation store.
///
/// Conversations are keyed by `"{tenant}:{conversation}"`, so the buffer
/// refuses to operate without a tenant id in the context. Each conversation
/// keeps at most `max_messages` entries; older messages are dropped from the
/// front. All data is lost when the process exits.
pub struct ConversationBuffer {
    conversations: RwLock<HashMap<String, Vec<Message>>>,
    max_messages: usize,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }

    /// Cap the number of messages retained per conversation. Zero means
    /// unbounded.
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    fn conversation_key(ctx: &RequestContext) -> Result<String> {
        let tenant = ctx.tenant_id()?;
        let conversation = ctx.conversation_id().ok_or_else(|| {
            DroverError::Config("no conversation id found in request context".into())
        })?;
        Ok(format!("{tenant}:{conversation}"))
    }
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Memory for ConversationBuffer {
    async fn add_message(&self, ctx: &RequestContext, message: Message) -> Result<()> {
        let key = Self::conversation_key(ctx)?;
        let mut conversations = self.conversations.write().await;
        let messages = conversations.entry(key).or_default();
        messages.push(message);

        if self.max_messages > 0 && messages.len() > self.max_messages {
            let excess = messages.len() - self.max_messages;
            messages.drain(..excess);
        }
        Ok(())
    }

    async fn messages(&self, ctx: &RequestContext, query: MessageQuery) -> Result<Vec<Message>> {
        let key = Self::conversation_key(ctx)?;
        let conversations = self.conversations.read().await;
        let mut messages: Vec<Message> = conversations
            .get(&key)
            .map(|m| m.to_vec())
            .unwrap_or_default();

        if !query.roles.is_empty() {
            messages.retain(|m| query.roles.contains(&m.role));
        }
        if let Some(limit) = query.limit {
            if limit < messages.len() {
                messages.drain(..messages.len() - limit);
            }
        }
        Ok(messages)
    }

    async fn clear(&self, ctx: &RequestContext) -> Result<()> {
        let key = Self::conversation_key(ctx)?;
        self.conversations.write().await.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drover_core::Role;

    fn ctx() -> RequestContext {
        RequestContext::new()
            .with_tenant("acme")
            .with_conversation("conv-1")
    }

    #[tokio::test]
    async fn appends_and_reads_in_order() {
        let buffer = ConversationBuffer::new();
        let ctx = ctx();

        buffer.add_message(&ctx, Message::user("hi")).await.unwrap();
        buffer
            .add_message(&ctx, Message::assistant("hello"))
            .await
            .unwrap();

        let messages = buffer.messages(&ctx, MessageQuery::all()).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn missing_tenant_is_refused() {
        let buffer = ConversationBuffer::new();
        let ctx = RequestContext::new().with_conversation("conv-1");

        let err = buffer
            .add_message(&ctx, Message::user("hi"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "NO_TENANT");
    }

    #[tokio::test]
    async fn missing_conversation_is_refused() {
        let buffer = ConversationBuffer::new();
        let ctx = RequestContext::new().with_tenant("acme");

        let err = buffer.messages(&ctx, MessageQuery::all()).await.unwrap_err();
        assert_eq!(err.kind(), "CONFIG_ERROR");
    }

    #[tokio::test]
    async fn conversations_are_isolated_per_tenant() {
        let buffer = ConversationBuffer::new();
        let acme = ctx();
        let globex = RequestContext::new()
            .with_tenant("globex")
            .with_conversation("conv-1");

        buffer
            .add_message(&acme, Message::user("acme secret"))
            .await
            .unwrap();

        let other = buffer.messages(&globex, MessageQuery::all()).await.unwrap();
        assert!(other.is_empty());
    }

    #[tokio::test]
    async fn window_trims_oldest_messages() {
        let buffer = ConversationBuffer::new().with_max_messages(2);
        let ctx = ctx();

        for i in 0..4 {
            buffer
                .add_message(&ctx, Message::user(format!("m{i}")))
                .await
                .unwrap();
        }

        let messages = buffer.messages(&ctx, MessageQuery::all()).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "m2");
        assert_eq!(messages[1].content, "m3");
    }

    #[tokio::test]
    async fn role_filter_and_limit_apply_in_order() {
        let buffer = ConversationBuffer::new();
        let ctx = ctx();

        buffer.add_message(&ctx, Message::user("u1")).await.unwrap();
        buffer
            .add_message(&ctx, Message::assistant("a1"))
            .await
            .unwrap();
        buffer.add_message(&ctx, Message::user("u2")).await.unwrap();

        let messages = buffer
            .messages(
                &ctx,
                MessageQuery::all().with_roles(vec![Role::User]).with_limit(1),
            )
            .await
            .unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "u2");
    }

    #[tokio::test]
    async fn clear_removes_only_that_conversation() {
        let buffer = ConversationBuffer::new();
        let first = ctx();
        let second = RequestContext::new()
            .with_tenant("acme")
            .with_conversation("conv-2");

        buffer.add_message(&first, Message::user("a")).await.unwrap();
        buffer.add_message(&second, Message::user("b")).await.unwrap();

        buffer.clear(&first).await.unwrap();
        assert!(buffer
            .messages(&first, MessageQuery::all())
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            buffer.messages(&second, MessageQuery::all()).await.unwrap().len(),
            1
        );
    }
}
