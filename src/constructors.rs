use std::sync::Arc;

use crate::alerts::{Alerts, ChatNotifier, DiscordWebhook, NullNotifier};
use crate::auth::memory::InMemoryAuth;
use crate::auth::mongo::MongoAuth;
use crate::blob::{BlobStore, FsBlobs, InMemoryBlobs};
use crate::conductors::Conductor;
use crate::config::{Backend, Config};
use crate::entities::{Bookmark, CartEntry, Content, Notification, SupportMessage, User};
use crate::handlers::Handler;
use crate::interactors::Services;
use crate::repositories::mock::{InMemoryInbox, InMemoryLedger, InMemoryRepository};
use crate::repositories::mongo::{
    MongoContentRepository, MongoInboxRepository, MongoUserRepository,
};

fn alerts(config: &Config) -> ::anyhow::Result<Alerts> {
    let notifier: Arc<dyn ChatNotifier + Sync + Send> = match &config.alerts.webhook_url {
        Some(url) => Arc::new(DiscordWebhook::new(url)?),
        None => Arc::new(NullNotifier),
    };

    Ok(Alerts::new(notifier))
}

fn blobs(config: &Config) -> Arc<dyn BlobStore + Sync + Send> {
    match &config.blobs.root {
        Some(root) => Arc::new(FsBlobs::new(root)),
        None => Arc::new(InMemoryBlobs::new()),
    }
}

pub fn in_memory(config: &Config) -> ::anyhow::Result<Conductor> {
    let users = Arc::new(InMemoryRepository::<User>::new());

    let services = Services {
        users: users.clone(),
        contents: Arc::new(InMemoryRepository::<Content>::new()),
        ledger: Arc::new(InMemoryLedger::new(users)),
        notifications: Arc::new(InMemoryInbox::<Notification>::new()),
        bookmarks: Arc::new(InMemoryInbox::<Bookmark>::new()),
        carts: Arc::new(InMemoryInbox::<CartEntry>::new()),
        supports: Arc::new(InMemoryInbox::<SupportMessage>::new()),
        blobs: blobs(config),
        alerts: alerts(config)?,
        ledger_config: config.ledger.clone(),
    };

    Ok(Conductor::new(Handler::new(
        Arc::new(InMemoryAuth::new()),
        services,
    )))
}

pub async fn mongo(config: &Config) -> ::anyhow::Result<Conductor> {
    let c = ::mongodb::Client::with_uri_str(&config.store.uri).await?;
    let db = c.database(&config.store.database);

    let users = Arc::new(MongoUserRepository::new_with(c, db.clone()).await?);

    let services = Services {
        users: users.clone(),
        contents: Arc::new(MongoContentRepository::new_with(db.clone()).await?),
        ledger: users,
        notifications: Arc::new(MongoInboxRepository::<Notification>::new_with(&db).await?),
        bookmarks: Arc::new(MongoInboxRepository::<Bookmark>::new_with(&db).await?),
        carts: Arc::new(MongoInboxRepository::<CartEntry>::new_with(&db).await?),
        supports: Arc::new(MongoInboxRepository::<SupportMessage>::new_with(&db).await?),
        blobs: blobs(config),
        alerts: alerts(config)?,
        ledger_config: config.ledger.clone(),
    };

    let auth = MongoAuth::new_with(&db).await?;

    Ok(Conductor::new(Handler::new(Arc::new(auth), services)))
}

pub async fn from_config(config: &Config) -> ::anyhow::Result<Conductor> {
    tracing::info!("using {:?} backend", config.store.backend);

    match config.store.backend {
        Backend::Memory => in_memory(config),
        Backend::Mongo => mongo(config).await,
    }
}
