use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims issued by the identity provider.
///
/// `sub` is the stable user id and `username` the user's (lower-cased) login name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

impl Claims {
    pub fn new(user_id: Uuid, username: impl Into<String>, duration_secs: i64) -> Self {
        let now = Utc::now().timestamp();
        Self {
            sub: user_id,
            username: username.into(),
            iat: now,
            exp: now + duration_secs,
            jti: Uuid::now_v7(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

/// The acting identity of a request, resolved from its bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
    pub token_id: Uuid,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            username: claims.username.to_lowercase(),
            token_id: claims.jti,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_user_lowercases_username() {
        let claims = Claims::new(Uuid::now_v7(), "Alice", 60);
        let user = AuthUser::from(claims.clone());

        assert_eq!(user.id, claims.sub);
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn expiry_is_relative_to_now() {
        let mut claims = Claims::new(Uuid::now_v7(), "bob", 60);
        assert!(!claims.is_expired());

        claims.exp = Utc::now().timestamp() - 1;
        assert!(claims.is_expired());
    }
}
