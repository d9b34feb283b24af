// JWT token generation and validation

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::{AuthConfig, AuthError, AuthResult};

/// JWT claims structure carrying the routing identity triple.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID)
    pub sub: String,

    /// Tenant ID
    pub tenant: String,

    /// Department
    pub department: String,

    /// Issuer
    pub iss: String,

    /// Audience
    pub aud: String,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// JWT ID (unique identifier for this token)
    pub jti: String,

    /// Token type ("access" or "refresh")
    pub token_type: TokenType,
}

/// Token type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Token pair (access + refresh)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Access token (short-lived)
    pub access_token: String,

    /// Refresh token (long-lived)
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Expiration time in seconds
    pub expires_in: i64,
}

/// JWT manager for token operations
pub struct JwtManager {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
}

impl JwtManager {
    /// Create a new JWT manager with the given configuration
    pub fn new(config: AuthConfig) -> AuthResult<Self> {
        let algorithm = parse_algorithm(&config.jwt.algorithm)?;

        let encoding_key = EncodingKey::from_secret(config.jwt.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt.secret.as_bytes());

        Ok(Self {
            config,
            encoding_key,
            decoding_key,
            algorithm,
        })
    }

    /// Generate a token pair (access + refresh)
    pub fn generate_token_pair(
        &self,
        subject: String,
        tenant: String,
        department: String,
    ) -> AuthResult<TokenPair> {
        let access_token =
            self.generate_access_token(subject.clone(), tenant.clone(), department.clone())?;
        let refresh_token = self.generate_refresh_token(subject, tenant, department)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.jwt.access_token_exp_secs as i64,
        })
    }

    /// Generate an access token
    pub fn generate_access_token(
        &self,
        subject: String,
        tenant: String,
        department: String,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.jwt.access_token_exp_secs as i64);

        let claims = JwtClaims {
            sub: subject,
            tenant,
            department,
            iss: self.config.jwt.issuer.clone(),
            aud: self.config.jwt.audience.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: TokenType::Access,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("Failed to encode JWT: {}", e)))
    }

    /// Generate a refresh token
    pub fn generate_refresh_token(
        &self,
        subject: String,
        tenant: String,
        department: String,
    ) -> AuthResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.config.jwt.refresh_token_exp_secs as i64);

        let claims = JwtClaims {
            sub: subject,
            tenant,
            department,
            iss: self.config.jwt.issuer.clone(),
            aud: self.config.jwt.audience.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: TokenType::Refresh,
        };

        encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("Failed to encode JWT: {}", e)))
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> AuthResult<JwtClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.set_issuer(&[self.config.jwt.issuer.clone()]);
        validation.set_audience(&[self.config.jwt.audience.clone()]);

        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(format!("Token validation failed: {}", e)),
            })?;

        Ok(token_data.claims)
    }

    /// Validate an access token specifically
    pub fn validate_access_token(&self, token: &str) -> AuthResult<JwtClaims> {
        let claims = self.validate_token(token)?;

        if claims.token_type != TokenType::Access {
            return Err(AuthError::InvalidToken(
                "Expected access token, got refresh token".to_string(),
            ));
        }

        Ok(claims)
    }

    /// Validate a refresh token specifically
    pub fn validate_refresh_token(&self, token: &str) -> AuthResult<JwtClaims> {
        let claims = self.validate_token(token)?;

        if claims.token_type != TokenType::Refresh {
            return Err(AuthError::InvalidToken(
                "Expected refresh token, got access token".to_string(),
            ));
        }

        Ok(claims)
    }

    /// Refresh an access token using a refresh token
    pub fn refresh_access_token(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let claims = self.validate_refresh_token(refresh_token)?;

        self.generate_token_pair(claims.sub, claims.tenant, claims.department)
    }
}

impl JwtClaims {
    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp();
        self.exp < now
    }

    /// Check if the token is not yet valid
    pub fn is_not_yet_valid(&self) -> bool {
        let now = Utc::now().timestamp();
        self.nbf > now
    }

    /// Get expiration as DateTime
    pub fn expiration(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }
}

/// Parse algorithm string to Algorithm enum
fn parse_algorithm(alg: &str) -> AuthResult<Algorithm> {
    match alg.to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        "RS256" => Ok(Algorithm::RS256),
        "RS384" => Ok(Algorithm::RS384),
        "RS512" => Ok(Algorithm::RS512),
        "ES256" => Ok(Algorithm::ES256),
        "ES384" => Ok(Algorithm::ES384),
        _ => Err(AuthError::ConfigError(format!(
            "Unsupported JWT algorithm: {}",
            alg
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> AuthConfig {
        AuthConfig::development()
    }

    #[test]
    fn test_jwt_manager_creation() {
        let config = test_config();
        let manager = JwtManager::new(config);
        assert!(manager.is_ok());
    }

    #[test]
    fn test_generate_access_token() {
        let config = test_config();
        let manager = JwtManager::new(config).unwrap();

        let token = manager.generate_access_token(
            "user-123".to_string(),
            "tenant-456".to_string(),
            "eng".to_string(),
        );

        assert!(token.is_ok());
        assert!(!token.unwrap().is_empty());
    }

    #[test]
    fn test_generate_token_pair() {
        let config = test_config();
        let manager = JwtManager::new(config).unwrap();

        let pair = manager.generate_token_pair(
            "user-123".to_string(),
            "tenant-456".to_string(),
            "eng".to_string(),
        );

        assert!(pair.is_ok());
        let pair = pair.unwrap();
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_eq!(pair.token_type, "Bearer");
    }

    #[test]
    fn test_validate_access_token() {
        let config = test_config();
        let manager = JwtManager::new(config).unwrap();

        let token = manager
            .generate_access_token(
                "user-123".to_string(),
                "tenant-456".to_string(),
                "eng".to_string(),
            )
            .unwrap();

        let claims = manager.validate_access_token(&token).unwrap();
        assert_eq!(claims.sub, "user-123");
        assert_eq!(claims.tenant, "tenant-456");
        assert_eq!(claims.department, "eng");
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_validate_refresh_token() {
        let config = test_config();
        let manager = JwtManager::new(config).unwrap();

        let token = manager
            .generate_refresh_token(
                "user-123".to_string(),
                "tenant-456".to_string(),
                "eng".to_string(),
            )
            .unwrap();

        let claims = manager.validate_refresh_token(&token).unwrap();
        assert_eq!(claims.token_type, TokenType::Refresh);
    }

    #[test]
    fn test_refresh_access_token() {
        let config = test_config();
        let manager = JwtManager::new(config).unwrap();

        let initial_pair = manager
            .generate_token_pair(
                "user-123".to_string(),
                "tenant-456".to_string(),
                "eng".to_string(),
            )
            .unwrap();

        let new_pair = manager.refresh_access_token(&initial_pair.refresh_token);
        assert!(new_pair.is_ok());

        let new_pair = new_pair.unwrap();
        assert!(!new_pair.access_token.is_empty());
        assert_ne!(new_pair.access_token, initial_pair.access_token);
    }

    #[test]
    fn test_invalid_token() {
        let config = test_config();
        let manager = JwtManager::new(config).unwrap();

        let result = manager.validate_token("invalid.token.here");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_token_type() {
        let config = test_config();
        let manager = JwtManager::new(config).unwrap();

        let access_token = manager
            .generate_access_token(
                "user-123".to_string(),
                "tenant-456".to_string(),
                "eng".to_string(),
            )
            .unwrap();

        let result = manager.validate_refresh_token(&access_token);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_algorithm() {
        assert!(matches!(parse_algorithm("HS256"), Ok(Algorithm::HS256)));
        assert!(matches!(parse_algorithm("hs256"), Ok(Algorithm::HS256)));
        assert!(matches!(parse_algorithm("RS256"), Ok(Algorithm::RS256)));
        assert!(parse_algorithm("INVALID").is_err());
    }
}
