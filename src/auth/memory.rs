use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};

use super::{
    check_password, new_uid, normalize_email, password_hash, AuthError, AuthProvider, Session,
    SessionCell,
};
use crate::entities::UserId;

struct Account {
    uid: UserId,
    salt: String,
    hash: String,
}

pub struct InMemoryAuth {
    accounts: Mutex<HashMap<String, Account>>,
    session: SessionCell,
}

impl InMemoryAuth {
    pub fn new() -> Self {
        Self {
            accounts: Mutex::new(HashMap::new()),
            session: SessionCell::new(),
        }
    }
}

impl Default for InMemoryAuth {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl AuthProvider for InMemoryAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;
        check_password(password)?;

        let mut guard = self.accounts.lock().await;
        if guard.contains_key(&email) {
            return Err(AuthError::EmailInUse);
        }

        let salt = uuid::Uuid::new_v4().to_string();
        let account = Account {
            uid: new_uid(),
            hash: password_hash(&salt, password),
            salt,
        };
        let session = Session {
            uid: account.uid.clone(),
            email: email.clone(),
        };
        guard.insert(email, account);

        self.session.set(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;

        let guard = self.accounts.lock().await;
        let account = guard.get(&email).ok_or(AuthError::InvalidCredentials)?;
        if password_hash(&account.salt, password) != account.hash {
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session {
            uid: account.uid.clone(),
            email,
        };
        self.session.set(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) { self.session.set(None); }

    fn current(&self) -> Option<Session> { self.session.get() }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> { self.session.subscribe() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_then_sign_in() {
        let auth = InMemoryAuth::new();
        let mut rx = auth.subscribe();

        let s = auth.sign_up("me@example.com", "secret1").await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref(), Some(&s));

        auth.sign_out().await;
        assert_eq!(auth.current(), None);

        assert!(matches!(
            auth.sign_in("me@example.com", "wrong!!").await,
            Err(AuthError::InvalidCredentials)
        ));
        let again = auth.sign_in("ME@example.com", "secret1").await.unwrap();
        assert_eq!(again.uid, s.uid);
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let auth = InMemoryAuth::new();
        auth.sign_up("me@example.com", "secret1").await.unwrap();

        assert!(matches!(
            auth.sign_up("me@example.com", "secret2").await,
            Err(AuthError::EmailInUse)
        ));
    }
}
