//! Account service: registration, login, guest sessions, email
//! verification and password reset.
//!
//! Session and email tokens are opaque random strings handed to the client;
//! only their digests are stored.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use redflag_types::config::AuthConfig;
use redflag_types::error::{AuthError, RepositoryError};
use redflag_types::user::{AuthSession, EmailToken, EmailTokenPurpose, User, UserId, UserType};

use crate::email::{Mailer, OutgoingEmail, templates};
use crate::repository::user::UserRepository;
use crate::service::credentials::Credentials;

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_PASSWORD_CHARS: usize = 128;
const MAX_EMAIL_CHARS: usize = 254;

/// A newly issued login session.
#[derive(Debug, Clone)]
pub struct SessionGrant {
    pub user: User,
    /// Plaintext token; shown to the client once and never stored.
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub struct AuthService<U: UserRepository, C: Credentials, M: Mailer> {
    users: U,
    credentials: C,
    mailer: M,
    config: AuthConfig,
    app_url: String,
}

fn storage(e: RepositoryError) -> AuthError {
    AuthError::StorageError(e.to_string())
}

/// Trim and lowercase an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Structural check only: one `@`, a non-empty local part, a dotted domain.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().count() > MAX_EMAIL_CHARS {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&len) {
        return Err(AuthError::WeakPassword {
            min: MIN_PASSWORD_CHARS,
            max: MAX_PASSWORD_CHARS,
        });
    }
    Ok(())
}

impl<U: UserRepository, C: Credentials, M: Mailer> AuthService<U, C, M> {
    pub fn new(users: U, credentials: C, mailer: M, config: AuthConfig, app_url: String) -> Self {
        Self {
            users,
            credentials,
            mailer,
            config,
            app_url,
        }
    }

    /// Create a regular account, send the verification email and log in.
    pub async fn register(&self, email: &str, password: &str) -> Result<SessionGrant, AuthError> {
        let email = normalize_email(email);
        if !is_valid_email(&email) {
            return Err(AuthError::InvalidEmail);
        }
        validate_password(password)?;

        if self.users.get_user_by_email(&email).await.map_err(storage)?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let user = User {
            id: UserId::new(),
            email,
            password_hash: Some(self.credentials.hash_password(password)?),
            user_type: UserType::Regular,
            email_verified_at: None,
            created_at: Utc::now(),
        };
        let user = self.users.create_user(&user).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::EmailTaken,
            other => storage(other),
        })?;
        tracing::info!(user_id = %user.id, "user registered");

        let token = self
            .issue_email_token(
                &user,
                EmailTokenPurpose::VerifyEmail,
                Duration::hours(self.config.verify_token_ttl_hours),
            )
            .await?;
        let email = templates::verification_email(
            &user.email,
            &self.app_url,
            &token,
            self.config.verify_token_ttl_hours,
        );
        // The account exists either way; the user can ask for a new link.
        self.deliver(&email).await;

        self.start_session(user).await
    }

    /// Log in with email and password.
    ///
    /// Unknown emails, guest accounts and wrong passwords are indistinguishable.
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionGrant, AuthError> {
        let email = normalize_email(email);
        let user = self
            .users
            .get_user_by_email(&email)
            .await
            .map_err(storage)?
            .ok_or(AuthError::InvalidCredentials)?;

        let verified = user
            .password_hash
            .as_deref()
            .is_some_and(|hash| self.credentials.verify_password(password, hash));
        if !verified {
            tracing::debug!(user_id = %user.id, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        self.start_session(user).await
    }

    /// Create an anonymous guest account with a session.
    pub async fn guest(&self) -> Result<SessionGrant, AuthError> {
        let id = UserId::new();
        let user = User {
            id,
            email: format!("guest-{}@guest.local", id.0),
            password_hash: None,
            user_type: UserType::Guest,
            email_verified_at: None,
            created_at: Utc::now(),
        };
        let user = self.users.create_user(&user).await.map_err(storage)?;
        tracing::info!(user_id = %user.id, "guest user created");
        self.start_session(user).await
    }

    /// Resolve a session token to its user.
    pub async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        if token.is_empty() {
            return Err(AuthError::InvalidSession);
        }
        let now = Utc::now();
        let session = self
            .users
            .get_session_by_token_hash(&self.credentials.hash_token(token))
            .await
            .map_err(storage)?
            .ok_or(AuthError::InvalidSession)?;

        if session.is_expired(now) {
            if let Err(e) = self.users.delete_session(&session.id).await {
                tracing::warn!(session_id = %session.id, error = %e, "failed to delete expired session");
            }
            return Err(AuthError::InvalidSession);
        }

        let user = self
            .users
            .get_user(&session.user_id)
            .await
            .map_err(storage)?
            .ok_or(AuthError::InvalidSession)?;

        if let Err(e) = self.users.touch_session(&session.id, now).await {
            tracing::debug!(session_id = %session.id, error = %e, "failed to touch session");
        }
        Ok(user)
    }

    pub async fn find_user(&self, email: &str) -> Result<Option<User>, AuthError> {
        self.users
            .get_user_by_email(&normalize_email(email))
            .await
            .map_err(storage)
    }

    /// Revoke the session behind `token`. Unknown tokens are ignored.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        let hash = self.credentials.hash_token(token);
        if let Some(session) = self.users.get_session_by_token_hash(&hash).await.map_err(storage)? {
            self.users.delete_session(&session.id).await.map_err(storage)?;
            tracing::info!(user_id = %session.user_id, "session revoked");
        }
        Ok(())
    }

    /// Consume a verification token and mark the address verified.
    pub async fn verify_email(&self, token: &str) -> Result<User, AuthError> {
        let record = self.redeem(token, EmailTokenPurpose::VerifyEmail).await?;
        let now = Utc::now();
        self.consume(&record, now).await?;
        self.users
            .mark_email_verified(&record.user_id, now)
            .await
            .map_err(storage)?;

        let user = self
            .users
            .get_user(&record.user_id)
            .await
            .map_err(storage)?
            .ok_or(AuthError::InvalidToken)?;
        tracing::info!(user_id = %user.id, "email verified");
        Ok(user)
    }

    /// Send a reset link if the address belongs to a regular account.
    ///
    /// Always returns `Ok` for well-formed requests so callers cannot probe
    /// which addresses are registered.
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AuthError> {
        let email = normalize_email(email);
        let Some(user) = self.users.get_user_by_email(&email).await.map_err(storage)? else {
            tracing::debug!("password reset requested for unknown address");
            return Ok(());
        };
        if user.is_guest() {
            return Ok(());
        }

        let token = self
            .issue_email_token(
                &user,
                EmailTokenPurpose::PasswordReset,
                Duration::minutes(self.config.reset_token_ttl_minutes),
            )
            .await?;
        let email = templates::password_reset_email(
            &user.email,
            &self.app_url,
            &token,
            self.config.reset_token_ttl_minutes,
        );
        self.deliver(&email).await;
        Ok(())
    }

    /// Set a new password from a reset token and revoke every session.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        validate_password(new_password)?;
        let record = self.redeem(token, EmailTokenPurpose::PasswordReset).await?;

        let hash = self.credentials.hash_password(new_password)?;
        self.consume(&record, Utc::now()).await?;
        self.users
            .update_password(&record.user_id, &hash)
            .await
            .map_err(storage)?;
        let revoked = self
            .users
            .delete_sessions_for_user(&record.user_id)
            .await
            .map_err(storage)?;

        tracing::info!(user_id = %record.user_id, revoked, "password reset");
        Ok(())
    }

    async fn start_session(&self, user: User) -> Result<SessionGrant, AuthError> {
        let token = self.credentials.generate_token();
        let now = Utc::now();
        let session = AuthSession {
            id: Uuid::now_v7(),
            user_id: user.id,
            token_hash: self.credentials.hash_token(&token),
            created_at: now,
            expires_at: now + Duration::days(self.config.session_ttl_days),
        };
        self.users.create_session(&session).await.map_err(storage)?;

        Ok(SessionGrant {
            user,
            token,
            expires_at: session.expires_at,
        })
    }

    async fn issue_email_token(
        &self,
        user: &User,
        purpose: EmailTokenPurpose,
        ttl: Duration,
    ) -> Result<String, AuthError> {
        let token = self.credentials.generate_token();
        let now = Utc::now();
        let record = EmailToken {
            id: Uuid::now_v7(),
            user_id: user.id,
            purpose,
            token_hash: self.credentials.hash_token(&token),
            created_at: now,
            expires_at: now + ttl,
            consumed_at: None,
        };
        self.users.create_email_token(&record).await.map_err(storage)?;
        Ok(token)
    }

    async fn redeem(&self, token: &str, purpose: EmailTokenPurpose) -> Result<EmailToken, AuthError> {
        let record = self
            .users
            .get_email_token(&self.credentials.hash_token(token.trim()))
            .await
            .map_err(storage)?
            .ok_or(AuthError::InvalidToken)?;
        if record.purpose != purpose || !record.is_usable(Utc::now()) {
            return Err(AuthError::InvalidToken);
        }
        Ok(record)
    }

    /// Mark a redeemed token used. Losing a race to another request is
    /// reported as an invalid token.
    async fn consume(&self, record: &EmailToken, at: DateTime<Utc>) -> Result<(), AuthError> {
        match self.users.consume_email_token(&record.id, at).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(AuthError::InvalidToken),
            Err(e) => Err(storage(e)),
        }
    }

    async fn deliver(&self, email: &OutgoingEmail) {
        if let Err(e) = self.mailer.send(email).await {
            tracing::warn!(subject = %email.subject, error = %e, "failed to send email");
        }
    }
}
