use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Unique identifier for a user, wrapping a UUID v7 (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Account tier. Guests get a session without credentials and tighter limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Guest,
    Regular,
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserType::Guest => write!(f, "guest"),
            UserType::Regular => write!(f, "regular"),
        }
    }
}

impl FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "guest" => Ok(UserType::Guest),
            "regular" => Ok(UserType::Regular),
            other => Err(format!("invalid user type: '{other}'")),
        }
    }
}

/// A registered or guest user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    /// Argon2 PHC string. Never serialized into API responses.
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub user_type: UserType,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_guest(&self) -> bool {
        self.user_type == UserType::Guest
    }

    pub fn is_verified(&self) -> bool {
        self.email_verified_at.is_some()
    }
}

/// A login session. Only the SHA-256 of the bearer token is stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub id: Uuid,
    pub user_id: UserId,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What a one-time email token is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailTokenPurpose {
    VerifyEmail,
    PasswordReset,
}

impl fmt::Display for EmailTokenPurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmailTokenPurpose::VerifyEmail => write!(f, "verify_email"),
            EmailTokenPurpose::PasswordReset => write!(f, "password_reset"),
        }
    }
}

impl FromStr for EmailTokenPurpose {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "verify_email" => Ok(EmailTokenPurpose::VerifyEmail),
            "password_reset" => Ok(EmailTokenPurpose::PasswordReset),
            other => Err(format!("invalid email token purpose: '{other}'")),
        }
    }
}

/// A one-time token delivered by email (verification or password reset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailToken {
    pub id: Uuid,
    pub user_id: UserId,
    pub purpose: EmailTokenPurpose,
    pub token_hash: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
}

impl EmailToken {
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_user_type_roundtrip() {
        for t in [UserType::Guest, UserType::Regular] {
            let parsed: UserType = t.to_string().parse().unwrap();
            assert_eq!(parsed, t);
        }
        assert!("admin".parse::<UserType>().is_err());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: UserId::new(),
            email: "a@example.com".to_string(),
            password_hash: Some("$argon2id$secret".to_string()),
            user_type: UserType::Regular,
            email_verified_at: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2id"));
        assert!(json.contains("\"user_type\":\"regular\""));
    }

    #[test]
    fn test_email_token_usable() {
        let now = Utc::now();
        let mut token = EmailToken {
            id: Uuid::now_v7(),
            user_id: UserId::new(),
            purpose: EmailTokenPurpose::VerifyEmail,
            token_hash: "h".to_string(),
            created_at: now,
            expires_at: now + Duration::hours(1),
            consumed_at: None,
        };
        assert!(token.is_usable(now));
        assert!(!token.is_usable(now + Duration::hours(2)));
        token.consumed_at = Some(now);
        assert!(!token.is_usable(now));
    }
}
