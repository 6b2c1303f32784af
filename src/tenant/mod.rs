//! Tenant namespace isolation.
//!
//! Every queue id and tag name that enters the broker is rewritten to
//! `"{tenant}|{id}"` before it reaches storage, and every `"{tenant}|"`
//! occurrence is stripped from the response body before it leaves. Tenants
//! therefore never observe each other's namespace, nor their own prefix.

mod middleware;

pub use middleware::{extract_tenant, tenant_scope};

/// Separator between the tenant and the local identifier
pub const TENANT_SEPARATOR: char = '|';

/// Scope `raw` to `tenant`.
pub fn scope_identifier(tenant: &str, raw: &str) -> String {
    format!("{}{}{}", tenant, TENANT_SEPARATOR, raw)
}

/// Remove every literal occurrence of `"{tenant}|"` from `text`.
pub fn unscope_text(tenant: &str, text: &str) -> String {
    let prefix = format!("{}{}", tenant, TENANT_SEPARATOR);
    text.replace(&prefix, "")
}

/// Whether `tenant` can be used as a namespace.
///
/// Besides the separator, characters that JSON escapes are refused: the
/// escaped form would not match when the response body is unscoped.
pub fn is_valid_tenant(tenant: &str) -> bool {
    !tenant.is_empty()
        && !tenant
            .chars()
            .any(|c| c == TENANT_SEPARATOR || c == '"' || c == '\\' || c.is_control())
}

/// Tenant resolved for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    tenant: String,
}

impl TenantScope {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
        }
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn scope(&self, raw: &str) -> String {
        scope_identifier(&self.tenant, raw)
    }

    pub fn scope_all(&self, raw: &[String]) -> Vec<String> {
        raw.iter().map(|id| self.scope(id)).collect()
    }

    pub fn unscope(&self, text: &str) -> String {
        unscope_text(&self.tenant, text)
    }
}
