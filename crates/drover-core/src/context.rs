//! Request context envelope.
//!
//! A [`RequestContext`] is created per external request and passed as the
//! first argument of every boundary operation. It carries the tenant id used
//! to partition memory and vector namespaces, the conversation id that scopes
//! message history, an optional deadline, and a cancellation token that
//! propagates to every nested operation.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::error::{DroverError, Result};

/// Tenant id substituted by adapters that are documented to keep working
/// without tenant scoping (see [`RequestContext::tenant_or_default`]).
pub const DEFAULT_TENANT: &str = "default";

/// Immutable per-request envelope.
///
/// Builder-style `with_*` methods return modified copies; the cancellation
/// token is shared between a context and its copies, so cancelling any of
/// them cancels the whole request tree.
#[derive(Debug, Clone)]
pub struct RequestContext {
    tenant_id: Option<String>,
    conversation_id: Option<String>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
    values: HashMap<String, serde_json::Value>,
}

impl RequestContext {
    /// Create an empty root context with a fresh cancellation token.
    pub fn new() -> Self {
        Self {
            tenant_id: None,
            conversation_id: None,
            deadline: None,
            cancel: CancellationToken::new(),
            values: HashMap::new(),
        }
    }

    /// Return a copy scoped to the given tenant.
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }

    /// Return a copy scoped to the given conversation.
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Return a copy whose deadline is `timeout` from now.
    pub fn with_deadline(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Return a copy carrying an arbitrary typed value under `key`.
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// The tenant id, or [`DroverError::NoTenant`] when the context has none.
    ///
    /// Components that partition state by tenant (memory, vector classes)
    /// must call this and surface the error.
    pub fn tenant_id(&self) -> Result<&str> {
        self.tenant_id
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(DroverError::NoTenant)
    }

    /// The tenant id, falling back to `"default"`.
    ///
    /// Only adapters documented to tolerate missing tenancy (the LLM
    /// adapter's tenant hint) may use this; everything else goes through
    /// [`Self::tenant_id`].
    pub fn tenant_or_default(&self) -> &str {
        self.tenant_id
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TENANT)
    }

    /// Whether a tenant id is present.
    pub fn has_tenant(&self) -> bool {
        self.tenant_id().is_ok()
    }

    /// The conversation id, if any.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    /// Look up an arbitrary value stored with [`Self::with_value`].
    pub fn value(&self, key: &str) -> Option<&serde_json::Value> {
        self.values.get(key)
    }

    /// The cancellation token shared by this request tree.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cancel this request and everything derived from it.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the request was cancelled or its deadline has passed.
    pub fn cancelled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Error with the [`DroverError::Cancelled`] kind if the request is no
    /// longer active. Blocking operations call this before starting and
    /// between steps.
    pub fn ensure_active(&self) -> Result<()> {
        if self.cancelled() {
            Err(DroverError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Time remaining until the deadline, or `None` when unbounded.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// A copy for a nested operation. Shares the cancellation token and
    /// deadline so cancellation propagates downward.
    pub fn child(&self) -> Self {
        self.clone()
    }

    /// A copy with its own cancellation scope. Cancelling the scope stops
    /// operations under it without affecting this context; cancelling this
    /// context still propagates into the scope.
    pub fn scope(&self) -> Self {
        let mut scoped = self.clone();
        scoped.cancel = self.cancel.child_token();
        scoped
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_tenant_is_an_error() {
        let ctx = RequestContext::new();
        assert!(matches!(ctx.tenant_id(), Err(DroverError::NoTenant)));
        assert_eq!(ctx.tenant_or_default(), "default");
    }

    #[test]
    fn empty_tenant_is_treated_as_missing() {
        let ctx = RequestContext::new().with_tenant("");
        assert!(matches!(ctx.tenant_id(), Err(DroverError::NoTenant)));
    }

    #[test]
    fn tenant_and_conversation_round_trip() {
        let ctx = RequestContext::new()
            .with_tenant("acme")
            .with_conversation("conv-1");
        assert_eq!(ctx.tenant_id().unwrap(), "acme");
        assert_eq!(ctx.conversation_id(), Some("conv-1"));
    }

    #[test]
    fn cancellation_propagates_to_children() {
        let ctx = RequestContext::new();
        let child = ctx.child();
        assert!(child.ensure_active().is_ok());

        ctx.cancel();
        assert!(child.cancelled());
        assert!(matches!(
            child.ensure_active(),
            Err(DroverError::Cancelled)
        ));
    }

    #[test]
    fn scope_cancellation_does_not_escape() {
        let ctx = RequestContext::new();
        let scope = ctx.scope();

        scope.cancel();
        assert!(scope.cancelled());
        assert!(!ctx.cancelled());

        let scope2 = ctx.scope();
        ctx.cancel();
        assert!(scope2.cancelled());
    }

    #[test]
    fn expired_deadline_counts_as_cancelled() {
        let ctx = RequestContext::new().with_deadline(Duration::ZERO);
        assert!(ctx.cancelled());
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn values_are_key_addressable() {
        let ctx = RequestContext::new().with_value("trace_id", serde_json::json!("t-17"));
        assert_eq!(ctx.value("trace_id"), Some(&serde_json::json!("t-17")));
        assert_eq!(ctx.value("absent"), None);
    }
}
