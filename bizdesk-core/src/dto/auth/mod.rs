//! Authentication DTOs

use serde::{Deserialize, Serialize};

/// Access/refresh token pair issued by the token endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Credentials exchanged for a token pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of a token refresh call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Response of a token refresh call
///
/// Servers that rotate refresh tokens include a new `refresh`; otherwise the
/// previous one stays valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

impl RefreshResponse {
    /// Merges the response into the pair it refreshed
    pub fn into_pair(self, previous: &TokenPair) -> TokenPair {
        TokenPair {
            access: self.access,
            refresh: self.refresh.unwrap_or_else(|| previous.refresh.clone()),
        }
    }
}
