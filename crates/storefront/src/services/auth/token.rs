//! Session tokens issued by the auth site.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marketstall_core::CustomerId;

use super::AuthError;

/// A JWT issued by the auth site plus the claims the storefront reads.
///
/// The signature is never verified here; the auth site and the commerce
/// backend do that. The payload is only decoded to learn whose token it is
/// and when it stops working.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthToken {
    /// The raw JWT.
    pub token: String,
    /// WordPress user id, which is also the commerce customer id.
    pub user_id: CustomerId,
    /// When the token expires, if it says.
    pub expires_at: Option<DateTime<Utc>>,
}

impl AuthToken {
    /// Decode the payload of `token`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] if the token is not a three-part
    /// JWT or its payload has no user id.
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|_| AuthError::InvalidToken)?;
        let claims: Claims = serde_json::from_slice(&bytes).map_err(|_| AuthError::InvalidToken)?;

        let user_id = claims
            .data
            .and_then(|d| d.user)
            .map(|u| u.id)
            .or(claims.sub)
            .and_then(|id| id.into_id())
            .ok_or(AuthError::InvalidToken)?;

        Ok(Self {
            token: token.to_string(),
            user_id: CustomerId::new(user_id),
            expires_at: claims
                .exp
                .and_then(|exp| DateTime::from_timestamp(exp, 0)),
        })
    }

    /// Whether the token has expired (with a 60s buffer).
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|exp| now >= exp - chrono::Duration::seconds(60))
    }
}

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    sub: Option<RawId>,
    #[serde(default)]
    data: Option<ClaimsData>,
}

#[derive(Deserialize)]
struct ClaimsData {
    #[serde(default)]
    user: Option<ClaimsUser>,
}

#[derive(Deserialize)]
struct ClaimsUser {
    id: RawId,
}

/// User ids arrive as either `"5"` or `5`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Text(String),
}

impl RawId {
    fn into_id(self) -> Option<i64> {
        match self {
            Self::Int(id) => Some(id),
            Self::Text(s) => s.trim().parse().ok(),
        }
        .filter(|id| *id > 0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    /// Build an unsigned token with the given payload.
    pub(crate) fn jwt(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{header}.{body}.signature")
    }

    #[test]
    fn test_decode_wordpress_claims() {
        let token = jwt(&serde_json::json!({
            "iss": "https://shop.example",
            "exp": 1_900_000_000,
            "data": {"user": {"id": "17"}}
        }));
        let decoded = AuthToken::decode(&token).unwrap();

        assert_eq!(decoded.user_id, CustomerId::new(17));
        assert_eq!(decoded.expires_at.unwrap().timestamp(), 1_900_000_000);
        assert_eq!(decoded.token, token);
    }

    #[test]
    fn test_decode_numeric_sub_claim() {
        let token = jwt(&serde_json::json!({"sub": 9}));
        let decoded = AuthToken::decode(&token).unwrap();
        assert_eq!(decoded.user_id, CustomerId::new(9));
        assert_eq!(decoded.expires_at, None);
        assert!(!decoded.is_expired());
    }

    #[test]
    fn test_decode_rejects_malformed_tokens() {
        assert!(AuthToken::decode("not-a-jwt").is_err());
        assert!(AuthToken::decode("a.b.c.d").is_err());
        assert!(AuthToken::decode("a.!!!.c").is_err());

        let no_user = jwt(&serde_json::json!({"exp": 1}));
        assert!(matches!(
            AuthToken::decode(&no_user),
            Err(AuthError::InvalidToken)
        ));

        let zero = jwt(&serde_json::json!({"data": {"user": {"id": "0"}}}));
        assert!(AuthToken::decode(&zero).is_err());
    }

    #[test]
    fn test_expiry_buffer() {
        let token = AuthToken {
            token: String::new(),
            user_id: CustomerId::new(1),
            expires_at: DateTime::from_timestamp(1_000, 0),
        };
        let before = DateTime::from_timestamp(900, 0).unwrap();
        let within_buffer = DateTime::from_timestamp(950, 0).unwrap();

        assert!(!token.is_expired_at(before));
        assert!(token.is_expired_at(within_buffer));
    }
}
