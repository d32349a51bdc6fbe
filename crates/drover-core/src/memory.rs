//! The memory capability.

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::Result;
use crate::message::{Message, Role};

/// Filters applied when reading messages back from memory.
#[derive(Debug, Clone, Default)]
pub struct MessageQuery {
    /// Keep only the last `limit` messages (after role filtering).
    pub limit: Option<usize>,
    /// Keep only messages whose role is in this set; empty keeps all.
    pub roles: Vec<Role>,
}

impl MessageQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_roles(mut self, roles: Vec<Role>) -> Self {
        self.roles = roles;
        self
    }
}

/// A conversation store scoped by the context's tenant and conversation ids.
///
/// Messages are append-only within a conversation and each append is atomic;
/// concurrent turns on the same conversation may interleave, but a message is
/// never observed half-written. Backends that require tenant scoping must
/// refuse to operate without a tenant id in the context.
#[async_trait]
pub trait Memory: Send + Sync {
    /// Append a message to the conversation in the context.
    async fn add_message(&self, ctx: &RequestContext, message: Message) -> Result<()>;

    /// Read messages for the conversation in the context.
    async fn messages(&self, ctx: &RequestContext, query: MessageQuery) -> Result<Vec<Message>>;

    /// Drop all messages for the conversation in the context.
    async fn clear(&self, ctx: &RequestContext) -> Result<()>;
}
