//! Tenant-scoped namespace keys for external backends.

use std::time::Duration;

use drover_core::{RequestContext, Result};

const DEFAULT_PREFIX: &str = "agent:memory:";
const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Key construction scheme shared by key-value memory backends.
///
/// Every key embeds the tenant id, so two tenants can never read each
/// other's conversations out of a shared store. Construction fails without
/// a tenant id in the context; there is no default fallback at this layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    prefix: String,
    ttl: Duration,
}

impl KeyScheme {
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Time-to-live a backend should apply to entries under this scheme.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The storage key for the context's conversation:
    /// `"{prefix}{tenant}:{conversation}"`.
    pub fn memory_key(&self, ctx: &RequestContext) -> Result<String> {
        let tenant = ctx.tenant_id()?;
        let conversation = ctx.conversation_id().unwrap_or_default();
        Ok(format!("{}{}:{}", self.prefix, tenant, conversation))
    }

    /// The vector-store class name for the context's tenant:
    /// `"{class_prefix}_{tenant}"`.
    pub fn vector_class(&self, class_prefix: &str, ctx: &RequestContext) -> Result<String> {
        let tenant = ctx.tenant_id()?;
        Ok(format!("{class_prefix}_{tenant}"))
    }
}

impl Default for KeyScheme {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_prefix_and_ttl() {
        let scheme = KeyScheme::new();
        assert_eq!(scheme.prefix(), "agent:memory:");
        assert_eq!(scheme.ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn memory_key_embeds_tenant_and_conversation() {
        let scheme = KeyScheme::new();
        let ctx = RequestContext::new()
            .with_tenant("acme")
            .with_conversation("conv-7");
        assert_eq!(scheme.memory_key(&ctx).unwrap(), "agent:memory:acme:conv-7");
    }

    #[test]
    fn custom_prefix_is_used_verbatim() {
        let scheme = KeyScheme::new().with_prefix("bot:");
        let ctx = RequestContext::new()
            .with_tenant("acme")
            .with_conversation("c");
        assert_eq!(scheme.memory_key(&ctx).unwrap(), "bot:acme:c");
    }

    #[test]
    fn missing_tenant_is_refused() {
        let scheme = KeyScheme::new();
        let ctx = RequestContext::new().with_conversation("c");
        assert_eq!(scheme.memory_key(&ctx).unwrap_err().kind(), "NO_TENANT");
        assert_eq!(
            scheme.vector_class("Documents", &ctx).unwrap_err().kind(),
            "NO_TENANT"
        );
    }

    #[test]
    fn vector_class_embeds_the_tenant() {
        let scheme = KeyScheme::new();
        let ctx = RequestContext::new().with_tenant("acme");
        assert_eq!(
            scheme.vector_class("Documents", &ctx).unwrap(),
            "Documents_acme"
        );
    }
}
