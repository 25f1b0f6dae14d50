use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::watch;

use crate::entities::UserId;

pub mod memory;
pub mod mongo;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub uid: UserId,
    pub email: String,
}

#[async_trait]
pub trait AuthProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError>;
    async fn sign_out(&self);

    fn current(&self) -> Option<Session>;
    fn subscribe(&self) -> watch::Receiver<Option<Session>>;
}

#[derive(Debug)]
pub enum AuthError {
    EmailInUse,
    InvalidEmail,
    WeakPassword,
    InvalidCredentials,
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            AuthError::EmailInUse => write!(f, "Email already in use"),
            AuthError::InvalidEmail => write!(f, "Email address must be valid"),
            AuthError::WeakPassword => write!(f, "Password should be at least 6 characters"),
            AuthError::InvalidCredentials => write!(f, "Invalid email or password"),
            AuthError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for AuthError {}

/// current signed-in state, observable through `watch`.
pub(crate) struct SessionCell(watch::Sender<Option<Session>>);

impl SessionCell {
    pub(crate) fn new() -> Self { Self(watch::channel(None).0) }

    pub(crate) fn set(&self, session: Option<Session>) {
        tracing::debug!("session changed: {:?}", session.as_ref().map(|s| &s.uid));
        self.0.send_replace(session);
    }

    pub(crate) fn get(&self) -> Option<Session> { self.0.borrow().clone() }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Option<Session>> { self.0.subscribe() }
}

pub(crate) fn normalize_email(email: &str) -> Result<String, AuthError> {
    let email = email.trim().to_ascii_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AuthError::InvalidEmail),
    }
}

pub(crate) fn check_password(password: &str) -> Result<(), AuthError> {
    match password.chars().count() >= 6 {
        true => Ok(()),
        false => Err(AuthError::WeakPassword),
    }
}

pub(crate) fn password_hash(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn new_uid() -> UserId { UserId(uuid::Uuid::new_v4().simple().to_string()) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_must_have_both_parts() {
        assert_eq!(normalize_email(" A@B.com ").unwrap(), "a@b.com");
        assert!(matches!(normalize_email("ab.com"), Err(AuthError::InvalidEmail)));
        assert!(matches!(normalize_email("@b.com"), Err(AuthError::InvalidEmail)));
    }

    #[test]
    fn short_password_is_weak() {
        assert!(matches!(check_password("12345"), Err(AuthError::WeakPassword)));
        assert!(check_password("123456").is_ok());
    }
}
