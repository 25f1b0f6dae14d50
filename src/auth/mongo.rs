use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::Instrument;

use super::{
    check_password, new_uid, normalize_email, password_hash, AuthError, AuthProvider, Session,
    SessionCell,
};
use crate::entities::UserId;
use crate::repositories::mongo::converters::try_unique_check;
use crate::repositories::mongo::helpers::initialize_coll;
use crate::repositories::RepositoryError;
use crate::utils::LetChain;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MongoCredentialModel {
    email: String,
    uid: String,
    salt: String,
    hash: String,
}

/// email/password accounts kept in the `credentials` collection.
pub struct MongoAuth {
    coll: Collection<MongoCredentialModel>,
    session: SessionCell,
}

impl MongoAuth {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll("credentials", "email", db).await?;

        Ok(Self {
            coll: db.collection("credentials"),
            session: SessionCell::new(),
        })
    }
}

fn internal(e: RepositoryError) -> AuthError {
    match e {
        RepositoryError::Internal(e) => AuthError::Internal(e),
        e => AuthError::Internal(::anyhow::anyhow!(e)),
    }
}

#[async_trait]
impl AuthProvider for MongoAuth {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;
        check_password(password)?;

        let salt = uuid::Uuid::new_v4().to_string();
        let model = MongoCredentialModel {
            email: email.clone(),
            uid: new_uid().0,
            hash: password_hash(&salt, password),
            salt,
        };
        let uid = UserId(model.uid.clone());

        let inserted = self
            .coll
            .insert_one(model, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(try_unique_check)
            .map_err(internal)?;
        if !inserted {
            return Err(AuthError::EmailInUse);
        }

        let session = Session { uid, email };
        self.session.set(Some(session.clone()));
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = normalize_email(email)?;

        let model = self
            .coll
            .find_one(doc! { "email": &email }, None)
            .instrument(tracing::trace_span!("find_one"))
            .await
            .map_err(|e| AuthError::Internal(e.into()))?
            .ok_or(AuthError::InvalidCredentials)?;
        if password_hash(&model.salt, password) != model.hash {
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session {
            uid: UserId(model.uid),
            email,
        };
        self.session.set(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) { self.session.set(None); }

    fn current(&self) -> Option<Session> { self.session.get() }

    fn subscribe(&self) -> watch::Receiver<Option<Session>> { self.session.subscribe() }
}
