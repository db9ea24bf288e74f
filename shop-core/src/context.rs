//! Request-scoped context carried into services and hooks.

/// A tenant identifier. Every document collection is partitioned by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(pub String);

/// Context carried with every service call.
///
/// `session_id` identifies the client session that issued the request. Any
/// per-client server state (staged uploads in particular) is keyed by
/// [`ShopContext::session_key`], never by the process.
#[derive(Debug, Clone)]
pub struct ShopContext {
    pub tenant_id: TenantId,
    pub session_id: Option<String>,
}

impl ShopContext {
    pub fn new<S: Into<String>>(tenant: S) -> Self {
        Self {
            tenant_id: TenantId(tenant.into()),
            session_id: None,
        }
    }

    pub fn with_session<S: Into<String>>(mut self, session: S) -> Self {
        self.session_id = Some(session.into());
        self
    }

    pub fn tenant(&self) -> &str {
        &self.tenant_id.0
    }

    /// Key for per-session state: `tenant:session`, or `tenant:anonymous`
    /// when the client sent no session id.
    pub fn session_key(&self) -> String {
        format!(
            "{}:{}",
            self.tenant_id.0,
            self.session_id.as_deref().unwrap_or("anonymous")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_key_scopes_by_tenant_and_session() {
        let a = ShopContext::new("acme").with_session("s1");
        let b = ShopContext::new("acme").with_session("s2");
        let anon = ShopContext::new("acme");

        assert_eq!(a.session_key(), "acme:s1");
        assert_ne!(a.session_key(), b.session_key());
        assert_eq!(anon.session_key(), "acme:anonymous");
    }
}
