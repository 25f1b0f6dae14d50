use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{content_err_fmt, display_name, item_err_fmt, notify, Services};
use crate::entities::{
    Bookmark, CartEntry, ContentSnapshot, NotificationKind, Pricing, SupportMessage, UserId,
};
use crate::usecases::inbox::{
    bookmark, bookmark_to_cart, bookmarks, cart, cart_add, cart_remove, cart_to_bookmark,
    notifications, support_open, support_send, unbookmark,
};
use crate::usecases::ledger::total;
use crate::utils::{AlsoChain, LetChain};

const SUPPORT_WELCOME: &str = "Welcome to customer support, how can i help you?";

pub struct InboxInteractor {
    pub services: Services,
}

impl InboxInteractor {
    async fn check_cartable(&self, owner: &UserId, snapshot: &ContentSnapshot) -> Result<()> {
        if snapshot.pricing == Pricing::Free {
            bail!("this {} is free, no need to buy it.", snapshot.reference.kind);
        }
        if &snapshot.reference.owner == owner {
            bail!("you cannot buy your own {}.", snapshot.reference.kind);
        }

        let in_cart = self
            .services
            .carts
            .list(owner)
            .await
            .map_err(item_err_fmt)?
            .iter()
            .any(|e| e.content.reference.id == snapshot.reference.id);
        if in_cart {
            bail!("already in cart.");
        }

        Ok(())
    }

    async fn check_bookmarkable(&self, owner: &UserId, snapshot: &ContentSnapshot) -> Result<()> {
        let bookmarked = self
            .services
            .bookmarks
            .list(owner)
            .await
            .map_err(item_err_fmt)?
            .iter()
            .any(|b| b.content.reference.id == snapshot.reference.id);
        if bookmarked {
            bail!("already bookmarked.");
        }

        Ok(())
    }
}

#[async_trait]
impl notifications::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: notifications::Input) -> Result<notifications::Output> {
        let notifications::Input { owner } = data;

        let mut items = self
            .services
            .notifications
            .list(&owner)
            .await
            .map_err(item_err_fmt)?;
        items.sort_by(|a, b| b.created.cmp(&a.created));

        Ok(notifications::Output { items })
    }
}

#[async_trait]
impl bookmark::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: bookmark::Input) -> Result<bookmark::Output> {
        let bookmark::Input {
            actor,
            content_id,
            note,
        } = data;

        let content = self
            .services
            .contents
            .find(content_id)
            .await
            .map_err(content_err_fmt)?;
        let snapshot = content.snapshot();
        self.check_bookmarkable(&actor, &snapshot).await?;

        let new_bookmark = Bookmark {
            id: Uuid::new_v4(),
            content: snapshot,
            note,
            created: Utc::now(),
        };
        self.services
            .bookmarks
            .push(&actor, new_bookmark.clone())
            .await
            .map_err(item_err_fmt)?;

        let name = display_name(&self.services, &actor).await;
        notify(
            &self.services,
            &actor,
            &actor,
            &name,
            NotificationKind::Bookmark {
                content: content.reference(),
            },
            format!("You bookmarked the {} \"{}\"", content.kind, content.title),
        )
        .await;

        bookmark::Output {
            bookmark: new_bookmark,
        }
        .also_(|o| tracing::trace!("output - {:?}", o))
        .let_(Ok)
    }
}

#[async_trait]
impl bookmarks::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: bookmarks::Input) -> Result<bookmarks::Output> {
        let bookmarks::Input { owner } = data;

        self.services
            .bookmarks
            .list(&owner)
            .await
            .map_err(item_err_fmt)?
            .also_(|items| items.sort_by(|a, b| b.created.cmp(&a.created)))
            .let_(|items| bookmarks::Output { items })
            .let_(Ok)
    }
}

#[async_trait]
impl unbookmark::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: unbookmark::Input) -> Result<unbookmark::Output> {
        let unbookmark::Input { owner, item_id } = data;

        self.services
            .bookmarks
            .remove(&owner, item_id)
            .await
            .map_err(item_err_fmt)?
            .let_(|bookmark| unbookmark::Output { bookmark })
            .let_(Ok)
    }
}

#[async_trait]
impl cart_add::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: cart_add::Input) -> Result<cart_add::Output> {
        let cart_add::Input { actor, content_id } = data;

        let snapshot = self
            .services
            .contents
            .find(content_id)
            .await
            .map_err(content_err_fmt)?
            .snapshot();
        self.check_cartable(&actor, &snapshot).await?;

        let entry = CartEntry {
            id: Uuid::new_v4(),
            content: snapshot,
            added: Utc::now(),
        };
        self.services
            .carts
            .push(&actor, entry.clone())
            .await
            .map_err(item_err_fmt)?;

        Ok(cart_add::Output { entry })
    }
}

#[async_trait]
impl cart::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: cart::Input) -> Result<cart::Output> {
        let cart::Input { owner } = data;

        let items = self
            .services
            .carts
            .list(&owner)
            .await
            .map_err(item_err_fmt)?;

        Ok(cart::Output {
            total: total(&items),
            items,
        })
    }
}

#[async_trait]
impl cart_remove::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: cart_remove::Input) -> Result<cart_remove::Output> {
        let cart_remove::Input { owner, item_id } = data;

        self.services
            .carts
            .remove(&owner, item_id)
            .await
            .map_err(item_err_fmt)?
            .let_(|entry| cart_remove::Output { entry })
            .let_(Ok)
    }
}

#[async_trait]
impl bookmark_to_cart::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: bookmark_to_cart::Input) -> Result<bookmark_to_cart::Output> {
        let bookmark_to_cart::Input { owner, item_id } = data;

        let source = match self
            .services
            .bookmarks
            .list(&owner)
            .await
            .map_err(item_err_fmt)?
            .into_iter()
            .find(|b| b.id == item_id)
        {
            Some(b) => b,
            None => bail!("cannot find item."),
        };
        self.check_cartable(&owner, &source.content).await?;

        let entry = CartEntry {
            id: Uuid::new_v4(),
            content: source.content,
            added: Utc::now(),
        };
        self.services
            .carts
            .push(&owner, entry.clone())
            .await
            .map_err(item_err_fmt)?;
        self.services
            .bookmarks
            .remove(&owner, item_id)
            .await
            .map_err(item_err_fmt)?;

        Ok(bookmark_to_cart::Output { entry })
    }
}

#[async_trait]
impl cart_to_bookmark::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: cart_to_bookmark::Input) -> Result<cart_to_bookmark::Output> {
        let cart_to_bookmark::Input { owner, item_id } = data;

        let source = match self
            .services
            .carts
            .list(&owner)
            .await
            .map_err(item_err_fmt)?
            .into_iter()
            .find(|e| e.id == item_id)
        {
            Some(e) => e,
            None => bail!("cannot find item."),
        };
        self.check_bookmarkable(&owner, &source.content).await?;

        let bookmark = Bookmark {
            id: Uuid::new_v4(),
            content: source.content,
            note: String::new(),
            created: Utc::now(),
        };
        self.services
            .bookmarks
            .push(&owner, bookmark.clone())
            .await
            .map_err(item_err_fmt)?;
        self.services
            .carts
            .remove(&owner, item_id)
            .await
            .map_err(item_err_fmt)?;

        Ok(cart_to_bookmark::Output { bookmark })
    }
}

#[async_trait]
impl support_open::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: support_open::Input) -> Result<support_open::Output> {
        let support_open::Input { owner } = data;

        let mut messages = self
            .services
            .supports
            .list(&owner)
            .await
            .map_err(item_err_fmt)?;

        if messages.is_empty() {
            messages.push(SupportMessage {
                id: Uuid::new_v4(),
                from_user: false,
                read: true,
                note: SUPPORT_WELCOME.to_string(),
                created: Utc::now(),
            });
        }
        messages
            .iter_mut()
            .filter(|m| !m.from_user)
            .for_each(|m| m.read = true);

        self.services
            .supports
            .replace(&owner, messages.clone())
            .await
            .map_err(item_err_fmt)?;

        let name = display_name(&self.services, &owner).await;
        self.services
            .alerts
            .send(format!("{} opened Support", name))
            .await;

        Ok(support_open::Output { messages })
    }
}

#[async_trait]
impl support_send::Usecase for InboxInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: support_send::Input) -> Result<support_send::Output> {
        let support_send::Input { owner, text } = data;

        let text = text.trim().to_string();
        if text.is_empty() {
            bail!("message cannot be empty");
        }

        self.services
            .supports
            .push(&owner, SupportMessage {
                id: Uuid::new_v4(),
                from_user: true,
                read: false,
                note: text,
                created: Utc::now(),
            })
            .await
            .map_err(item_err_fmt)?;

        self.services
            .supports
            .list(&owner)
            .await
            .map_err(item_err_fmt)?
            .let_(|messages| support_send::Output { messages })
            .let_(Ok)
    }
}
