use chrono::Utc;
use crashgate_config::ConfigFileService;
use thiserror::Error;
use tracing::debug;

/// Tenant identity returned on a successful auth-key lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct Service {
    pub id: String,
    pub name: String,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolveError {
    /// Unknown, disabled, and expired keys all collapse to this value so
    /// untrusted callers cannot probe which keys exist.
    #[error("no service matches the provided auth key")]
    NotFound,
}

/// Resolves an opaque auth key to the tenant that owns it.
pub trait ServiceResolver: Send + Sync {
    fn resolve_by_auth_key(&self, auth_key: &str) -> Result<Service, ResolveError>;
}

/// Resolver over the statically loaded services list.
pub struct ConfigServiceResolver {
    services: Vec<ConfigFileService>,
}

impl ConfigServiceResolver {
    pub fn new(services: Vec<ConfigFileService>) -> Self {
        Self { services }
    }
}

impl ServiceResolver for ConfigServiceResolver {
    fn resolve_by_auth_key(&self, auth_key: &str) -> Result<Service, ResolveError> {
        if auth_key.is_empty() {
            return Err(ResolveError::NotFound);
        }

        let now = Utc::now().timestamp();

        // Services and keys are scanned in configuration order; the first
        // usable key wins. Key uniqueness across services is a
        // configuration responsibility, not enforced here.
        for service in &self.services {
            for auth in &service.auth_keys {
                if auth.key == auth_key
                    && !auth.disabled
                    && !is_auth_key_expired(auth.expired_at, now)
                {
                    return Ok(Service {
                        id: service.id.clone(),
                        name: service.name.clone(),
                    });
                }
            }
        }

        debug!("No service matched auth key: {}", auth_key);

        Err(ResolveError::NotFound)
    }
}

fn is_auth_key_expired(expired_at: i64, now: i64) -> bool {
    if expired_at == 0 {
        return false;
    }

    expired_at < now
}
