// Authentication module: JWT and API-key verification of the routing
// identity triple (tenant_id, user_id, department). No RBAC/permission
// model — authorization decisions live in policy rules, not auth scopes.

pub mod api_key;
pub mod config;
pub mod jwt;
pub mod middleware;
pub mod storage;

pub use api_key::{ApiKey, ApiKeyHash};
pub use config::AuthConfig;
pub use jwt::{JwtClaims, JwtManager, TokenPair};
pub use middleware::{auth_middleware, require_auth, AuthContext, AuthMethod, AuthState};
pub use storage::{ApiKeyStore, InMemoryApiKeyStore};

/// Authentication error types
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Missing authentication credentials")]
    MissingCredentials,

    #[error("API key revoked")]
    ApiKeyRevoked,

    #[error("Authentication configuration error: {0}")]
    ConfigError(String),

    #[error("Internal authentication error: {0}")]
    InternalError(String),
}

impl From<AuthError> for crate::domain::RouterError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidApiKey
            | AuthError::InvalidToken(_)
            | AuthError::TokenExpired
            | AuthError::MissingCredentials
            | AuthError::ApiKeyRevoked => crate::domain::RouterError::Unauthorized(err.to_string()),
            AuthError::ConfigError(msg) | AuthError::InternalError(msg) => {
                crate::domain::RouterError::Config(msg)
            }
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
