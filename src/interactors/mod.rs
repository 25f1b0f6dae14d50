use std::sync::Arc;

use anyhow::{anyhow, bail, Error, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::alerts::Alerts;
use crate::blob::BlobStore;
use crate::config::LedgerConfig;
use crate::entities::{
    Bookmark, CartEntry, Notification, NotificationKind, SupportMessage, User, UserId,
};
use crate::repositories::{
    ContentRepository, InboxRepository, LedgerRepository, RepositoryError, UserRepository,
};

pub mod content;
pub mod inbox;
pub mod ledger;
pub mod user;

/// every collaborator a use case may touch, handed in at construction.
#[derive(Clone)]
pub struct Services {
    pub users: Arc<dyn UserRepository + Sync + Send>,
    pub contents: Arc<dyn ContentRepository + Sync + Send>,
    pub ledger: Arc<dyn LedgerRepository + Sync + Send>,
    pub notifications: Arc<dyn InboxRepository<Notification> + Sync + Send>,
    pub bookmarks: Arc<dyn InboxRepository<Bookmark> + Sync + Send>,
    pub carts: Arc<dyn InboxRepository<CartEntry> + Sync + Send>,
    pub supports: Arc<dyn InboxRepository<SupportMessage> + Sync + Send>,
    pub blobs: Arc<dyn BlobStore + Sync + Send>,
    pub alerts: Alerts,
    pub ledger_config: LedgerConfig,
}

fn user_err_fmt(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => anyhow!("cannot find user. not registered?"),
        e => anyhow!("repository error: {}", e),
    }
}

fn content_err_fmt(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => anyhow!("cannot find content."),
        e => anyhow!("repository error: {}", e),
    }
}

fn item_err_fmt(e: RepositoryError) -> Error {
    match e {
        RepositoryError::NotFound => anyhow!("cannot find item."),
        e => anyhow!("repository error: {}", e),
    }
}

fn ledger_err_fmt(e: RepositoryError) -> Error {
    match e {
        RepositoryError::InsufficientFunds { .. } => anyhow!("Insufficient balance."),
        e => user_err_fmt(e),
    }
}

/// every ledger operation passes here before touching a balance.
async fn verify_pin(services: &Services, id: &UserId, pin: &str) -> Result<User> {
    let user = services.users.find(id).await.map_err(user_err_fmt)?;

    match &user.pin {
        None => bail!("You don't have a pin, Go to settings"),
        Some(hash) if !hash.verify(id, pin) => bail!("Incorrect Pin, try again"),
        Some(_) => Ok(user),
    }
}

async fn display_name(services: &Services, id: &UserId) -> String {
    match services.users.find(id).await {
        Ok(u) => u.display_name().to_string(),
        Err(e) => {
            tracing::debug!("no profile for {}: {}", id, e);
            "Anonymous".to_string()
        },
    }
}

/// appends to the recipient's inbox. failures are logged, the caller's write
/// stays committed.
async fn notify(
    services: &Services,
    recipient: &UserId,
    actor: &UserId,
    actor_name: &str,
    kind: NotificationKind,
    note: String,
) {
    let notification = Notification {
        id: Uuid::new_v4(),
        actor: actor.clone(),
        actor_name: actor_name.to_string(),
        kind,
        note,
        created: Utc::now(),
    };

    if let Err(e) = services.notifications.push(recipient, notification).await {
        tracing::warn!("failed to notify {}: {}", recipient, e);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::alerts::RecordingNotifier;
    use crate::blob::InMemoryBlobs;
    use crate::entities::{Cents, Content, PinHash};
    use crate::repositories::mock::tests::user;
    use crate::repositories::mock::{InMemoryInbox, InMemoryLedger, InMemoryRepository};

    pub(crate) struct Fixture {
        pub services: Services,
        pub users: Arc<InMemoryRepository<User>>,
        pub contents: Arc<InMemoryRepository<Content>>,
        pub notifications: Arc<InMemoryInbox<Notification>>,
        pub alerts: Arc<RecordingNotifier>,
        pub blobs: Arc<InMemoryBlobs>,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            let users = Arc::new(InMemoryRepository::<User>::new());
            let contents = Arc::new(InMemoryRepository::<Content>::new());
            let notifications = Arc::new(InMemoryInbox::<Notification>::new());
            let alerts = Arc::new(RecordingNotifier::new());
            let blobs = Arc::new(InMemoryBlobs::new());

            let services = Services {
                users: users.clone(),
                contents: contents.clone(),
                ledger: Arc::new(InMemoryLedger::new(users.clone())),
                notifications: notifications.clone(),
                bookmarks: Arc::new(InMemoryInbox::<Bookmark>::new()),
                carts: Arc::new(InMemoryInbox::<CartEntry>::new()),
                supports: Arc::new(InMemoryInbox::<SupportMessage>::new()),
                blobs: blobs.clone(),
                alerts: Alerts::new(alerts.clone()),
                ledger_config: LedgerConfig::default(),
            };

            Self {
                services,
                users,
                contents,
                notifications,
                alerts,
                blobs,
            }
        }

        /// registered user with pin `1234`.
        pub(crate) async fn user(&self, id: &str, balance: Cents) -> UserId {
            let mut u = user(id, balance);
            u.pin = Some(PinHash::derive(&u.id, "1234").unwrap());
            let uid = u.id.clone();
            UserRepository::insert(&*self.users, u).await.unwrap();

            uid
        }

        pub(crate) async fn content(&self, c: Content) -> crate::entities::ContentId {
            let id = c.id;
            ContentRepository::insert(&*self.contents, c).await.unwrap();

            id
        }

        pub(crate) async fn fund(&self, id: &UserId, balance: Cents) {
            self.users.set_balance(id, balance).await;
        }

        pub(crate) async fn balance(&self, id: &UserId) -> Cents {
            self.services.ledger.balance(id).await.unwrap()
        }
    }

    #[tokio::test]
    async fn pin_checks() {
        let fx = Fixture::new();
        let with = fx.user("with", 0).await;
        let without = UserId::from("without");
        UserRepository::insert(&*fx.users, user("without", 0)).await.unwrap();

        assert!(verify_pin(&fx.services, &with, "1234").await.is_ok());
        assert_eq!(
            verify_pin(&fx.services, &with, "4321").await.unwrap_err().to_string(),
            "Incorrect Pin, try again"
        );
        assert_eq!(
            verify_pin(&fx.services, &without, "1234").await.unwrap_err().to_string(),
            "You don't have a pin, Go to settings"
        );
        assert_eq!(
            verify_pin(&fx.services, &UserId::from("ghost"), "1234")
                .await
                .unwrap_err()
                .to_string(),
            "cannot find user. not registered?"
        );
    }
}
