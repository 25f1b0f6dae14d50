use std::sync::Arc;

use anyhow::{bail, Result};
use uuid::Uuid;

use crate::auth::{AuthProvider, Session};
use crate::entities::{CommentId, ContentId, ContentKind, Plan, Pricing, UserId};
use crate::handoff::Handoff;
use crate::interactors::content::ContentInteractor;
use crate::interactors::inbox::InboxInteractor;
use crate::interactors::ledger::LedgerInteractor;
use crate::interactors::user::{check_profile_fields, UserInteractor};
use crate::interactors::Services;
use crate::repositories::{ContentMutation, ContentQuery, UserQuery};
use crate::usecases::content::{self as content_uc, Upload};
use crate::usecases::inbox as inbox_uc;
use crate::usecases::ledger::{self as ledger_uc, WithdrawMethod};
use crate::usecases::user as user_uc;
use crate::utils::LetChain;

pub struct Handler {
    pub auth: Arc<dyn AuthProvider + Sync + Send>,
    pub user: UserInteractor,
    pub content: ContentInteractor,
    pub inbox: InboxInteractor,
    pub ledger: LedgerInteractor,
}

/// stricter than the auth provider's own minimum.
fn check_signup_password(password: &str) -> Result<()> {
    if password.chars().count() < 8 || !password.chars().any(|c| c.is_ascii_digit()) {
        bail!("Weak password, please add a number and ensure it is at least 8 characters long");
    }

    Ok(())
}

impl Handler {
    pub fn new(auth: Arc<dyn AuthProvider + Sync + Send>, services: Services) -> Self {
        Self {
            auth,
            user: UserInteractor {
                services: services.clone(),
            },
            content: ContentInteractor {
                services: services.clone(),
            },
            inbox: InboxInteractor {
                services: services.clone(),
            },
            ledger: LedgerInteractor { services },
        }
    }

    pub fn services(&self) -> &Services { &self.user.services }

    pub fn session(&self) -> Option<Session> { self.auth.current() }

    pub fn require_actor(&self, action: &str) -> Result<Session> {
        match self.auth.current() {
            Some(s) => Ok(s),
            None => bail!("You must be signed in to {}!", action),
        }
    }

    // --- auth ---

    pub async fn sign_up(
        &self,
        email: String,
        password: String,
        first_name: String,
        last_name: String,
        nationality: String,
    ) -> Result<user_uc::register::Output> {
        check_signup_password(&password)?;
        check_profile_fields(&first_name, &last_name, &nationality)?;

        let Session { uid, email } = self.auth.sign_up(&email, &password).await?;

        user_uc::register::Usecase::handle(&self.user, user_uc::register::Input {
            user_id: uid,
            email,
            first_name,
            last_name,
            nationality,
        })
        .await
    }

    pub async fn sign_in(&self, email: String, password: String) -> Result<Session> {
        Ok(self.auth.sign_in(&email, &password).await?)
    }

    pub async fn sign_out(&self) { self.auth.sign_out().await }

    // --- user ---

    pub async fn get_user(&self, user_id: Option<UserId>) -> Result<user_uc::get::Output> {
        let user_id = match user_id {
            Some(id) => id,
            None => self.require_actor("view your profile")?.uid,
        };

        user_uc::get::Usecase::handle(&self.user, user_uc::get::Input { user_id }).await
    }

    pub async fn get_users(&self, query: UserQuery, page: u32) -> Result<user_uc::gets::Output> {
        user_uc::gets::Usecase::handle(&self.user, user_uc::gets::Input { query, page }).await
    }

    pub async fn edit_user(
        &self,
        username: Option<String>,
        bio: Option<String>,
    ) -> Result<user_uc::edit::Output> {
        let actor = self.require_actor("edit your profile")?;

        user_uc::edit::Usecase::handle(&self.user, user_uc::edit::Input {
            user_id: actor.uid,
            username,
            bio,
        })
        .await
    }

    pub async fn profile_pic(&self, bytes: Vec<u8>) -> Result<user_uc::profile_pic::Output> {
        let actor = self.require_actor("change your picture")?;

        user_uc::profile_pic::Usecase::handle(&self.user, user_uc::profile_pic::Input {
            user_id: actor.uid,
            email: actor.email,
            bytes,
        })
        .await
    }

    pub async fn set_pin(
        &self,
        current: Option<String>,
        new: String,
        confirm: String,
    ) -> Result<user_uc::set_pin::Output> {
        let actor = self.require_actor("set a pin")?;

        user_uc::set_pin::Usecase::handle(&self.user, user_uc::set_pin::Input {
            user_id: actor.uid,
            current,
            new,
            confirm,
        })
        .await
    }

    pub async fn follow(&self, target: UserId) -> Result<user_uc::follow::Output> {
        let actor = self.require_actor("follow")?;

        user_uc::follow::Usecase::handle(&self.user, user_uc::follow::Input {
            actor: actor.uid,
            target,
        })
        .await
    }

    pub async fn unfollow(&self, target: UserId) -> Result<user_uc::unfollow::Output> {
        let actor = self.require_actor("unfollow")?;

        user_uc::unfollow::Usecase::handle(&self.user, user_uc::unfollow::Input {
            actor: actor.uid,
            target,
        })
        .await
    }

    pub async fn report_account(&self, target: UserId) -> Result<user_uc::report_account::Output> {
        let actor = self.require_actor("report")?;

        user_uc::report_account::Usecase::handle(&self.user, user_uc::report_account::Input {
            actor: actor.uid,
            target,
        })
        .await
    }

    // --- content ---

    pub async fn post_content(
        &self,
        kind: ContentKind,
        title: String,
        description: String,
        price: Option<i64>,
        creator_status: Option<String>,
        upload: Option<Upload>,
    ) -> Result<content_uc::post::Output> {
        let actor = self.require_actor("post")?;

        content_uc::post::Usecase::handle(&self.content, content_uc::post::Input {
            owner: actor.uid,
            email: actor.email,
            kind,
            title,
            description,
            pricing: price.map(Pricing::Paid).unwrap_or(Pricing::Free),
            creator_status,
            upload,
        })
        .await
    }

    pub async fn feed(
        &self,
        kind: ContentKind,
        query: ContentQuery,
    ) -> Result<content_uc::feed::Output> {
        content_uc::feed::Usecase::handle(&self.content, content_uc::feed::Input {
            kind,
            viewer: self.session().map(|s| s.uid),
            query,
        })
        .await
    }

    pub async fn my_content(&self, kind: ContentKind) -> Result<content_uc::mine::Output> {
        let actor = self.require_actor("see your uploads")?;

        content_uc::mine::Usecase::handle(&self.content, content_uc::mine::Input {
            owner: actor.uid,
            kind,
        })
        .await
    }

    pub async fn view_content(
        &self,
        handoff: Option<Handoff>,
        content_id: Option<ContentId>,
    ) -> Result<content_uc::view::Output> {
        content_uc::view::Usecase::handle(&self.content, content_uc::view::Input {
            viewer: self.session().map(|s| s.uid),
            handoff,
            content_id,
        })
        .await
    }

    pub async fn edit_content(
        &self,
        content_id: ContentId,
        mutation: ContentMutation,
    ) -> Result<content_uc::edit::Output> {
        let actor = self.require_actor("edit")?;

        content_uc::edit::Usecase::handle(&self.content, content_uc::edit::Input {
            owner: actor.uid,
            content_id,
            mutation,
        })
        .await
    }

    pub async fn like(&self, content_id: ContentId) -> Result<content_uc::like::Output> {
        let actor = self.require_actor("like")?;

        content_uc::like::Usecase::handle(&self.content, content_uc::like::Input {
            actor: actor.uid,
            content_id,
        })
        .await
    }

    pub async fn report_content(&self, content_id: ContentId) -> Result<content_uc::report::Output> {
        let actor = self.require_actor("report")?;

        content_uc::report::Usecase::handle(&self.content, content_uc::report::Input {
            actor: actor.uid,
            content_id,
        })
        .await
    }

    pub async fn comment(
        &self,
        content_id: ContentId,
        body: String,
    ) -> Result<content_uc::comment::Output> {
        let actor = self.require_actor("comment")?;

        content_uc::comment::Usecase::handle(&self.content, content_uc::comment::Input {
            actor: actor.uid,
            content_id,
            body,
        })
        .await
    }

    pub async fn delete_comment(
        &self,
        content_id: ContentId,
        comment_id: CommentId,
    ) -> Result<content_uc::delete_comment::Output> {
        let actor = self.require_actor("delete a comment")?;

        content_uc::delete_comment::Usecase::handle(
            &self.content,
            content_uc::delete_comment::Input {
                actor: actor.uid,
                content_id,
                comment_id,
            },
        )
        .await
    }

    pub async fn report_comment(
        &self,
        content_id: ContentId,
        comment_id: CommentId,
    ) -> Result<content_uc::report_comment::Output> {
        let actor = self.require_actor("report")?;

        content_uc::report_comment::Usecase::handle(
            &self.content,
            content_uc::report_comment::Input {
                actor: actor.uid,
                content_id,
                comment_id,
            },
        )
        .await
    }

    pub async fn withdraw_content(
        &self,
        content_id: ContentId,
    ) -> Result<content_uc::withdraw::Output> {
        let actor = self.require_actor("delete")?;

        content_uc::withdraw::Usecase::handle(&self.content, content_uc::withdraw::Input {
            owner: actor.uid,
            content_id,
        })
        .await
    }

    // --- inbox ---

    pub async fn notifications(&self) -> Result<inbox_uc::notifications::Output> {
        let actor = self.require_actor("see notifications")?;

        inbox_uc::notifications::Usecase::handle(&self.inbox, inbox_uc::notifications::Input {
            owner: actor.uid,
        })
        .await
    }

    pub async fn bookmark(
        &self,
        content_id: ContentId,
        note: String,
    ) -> Result<inbox_uc::bookmark::Output> {
        let actor = self.require_actor("bookmark")?;

        inbox_uc::bookmark::Usecase::handle(&self.inbox, inbox_uc::bookmark::Input {
            actor: actor.uid,
            content_id,
            note,
        })
        .await
    }

    pub async fn bookmarks(&self) -> Result<inbox_uc::bookmarks::Output> {
        let actor = self.require_actor("see bookmarks")?;

        inbox_uc::bookmarks::Usecase::handle(&self.inbox, inbox_uc::bookmarks::Input {
            owner: actor.uid,
        })
        .await
    }

    pub async fn unbookmark(&self, item_id: Uuid) -> Result<inbox_uc::unbookmark::Output> {
        let actor = self.require_actor("remove a bookmark")?;

        inbox_uc::unbookmark::Usecase::handle(&self.inbox, inbox_uc::unbookmark::Input {
            owner: actor.uid,
            item_id,
        })
        .await
    }

    pub async fn cart_add(&self, content_id: ContentId) -> Result<inbox_uc::cart_add::Output> {
        let actor = self.require_actor("add to cart")?;

        inbox_uc::cart_add::Usecase::handle(&self.inbox, inbox_uc::cart_add::Input {
            actor: actor.uid,
            content_id,
        })
        .await
    }

    pub async fn cart(&self) -> Result<inbox_uc::cart::Output> {
        let actor = self.require_actor("see your cart")?;

        inbox_uc::cart::Usecase::handle(&self.inbox, inbox_uc::cart::Input { owner: actor.uid })
            .await
    }

    pub async fn cart_remove(&self, item_id: Uuid) -> Result<inbox_uc::cart_remove::Output> {
        let actor = self.require_actor("edit your cart")?;

        inbox_uc::cart_remove::Usecase::handle(&self.inbox, inbox_uc::cart_remove::Input {
            owner: actor.uid,
            item_id,
        })
        .await
    }

    pub async fn bookmark_to_cart(
        &self,
        item_id: Uuid,
    ) -> Result<inbox_uc::bookmark_to_cart::Output> {
        let actor = self.require_actor("edit your cart")?;

        inbox_uc::bookmark_to_cart::Usecase::handle(
            &self.inbox,
            inbox_uc::bookmark_to_cart::Input {
                owner: actor.uid,
                item_id,
            },
        )
        .await
    }

    pub async fn cart_to_bookmark(
        &self,
        item_id: Uuid,
    ) -> Result<inbox_uc::cart_to_bookmark::Output> {
        let actor = self.require_actor("bookmark")?;

        inbox_uc::cart_to_bookmark::Usecase::handle(
            &self.inbox,
            inbox_uc::cart_to_bookmark::Input {
                owner: actor.uid,
                item_id,
            },
        )
        .await
    }

    pub async fn support_open(&self) -> Result<inbox_uc::support_open::Output> {
        let actor = self.require_actor("contact support")?;

        inbox_uc::support_open::Usecase::handle(&self.inbox, inbox_uc::support_open::Input {
            owner: actor.uid,
        })
        .await
    }

    pub async fn support_send(&self, text: String) -> Result<inbox_uc::support_send::Output> {
        let actor = self.require_actor("contact support")?;

        inbox_uc::support_send::Usecase::handle(&self.inbox, inbox_uc::support_send::Input {
            owner: actor.uid,
            text,
        })
        .await
    }

    // --- wallet ---

    pub async fn checkout(&self, pin: String) -> Result<ledger_uc::checkout::Output> {
        let actor = self.require_actor("buy")?;

        ledger_uc::checkout::Usecase::handle(&self.ledger, ledger_uc::checkout::Input {
            buyer: actor.uid,
            pin,
        })
        .await
    }

    pub async fn gift(
        &self,
        target: UserId,
        amount: i64,
        pin: String,
    ) -> Result<ledger_uc::gift::Output> {
        let actor = self.require_actor("gift")?;

        ledger_uc::gift::Usecase::handle(&self.ledger, ledger_uc::gift::Input {
            actor: actor.uid,
            target,
            amount,
            pin,
        })
        .await
    }

    pub async fn withdraw(
        &self,
        method: Option<WithdrawMethod>,
        account: String,
        amount: i64,
        pin: String,
    ) -> Result<ledger_uc::withdraw::Output> {
        let actor = self.require_actor("withdraw")?;

        ledger_uc::withdraw::Usecase::handle(&self.ledger, ledger_uc::withdraw::Input {
            actor: actor.uid,
            method,
            account,
            amount,
            pin,
        })
        .await
    }

    pub async fn subscribe(&self, plan: Plan, pin: String) -> Result<ledger_uc::subscribe::Output> {
        let actor = self.require_actor("change your plan")?;

        ledger_uc::subscribe::Usecase::handle(&self.ledger, ledger_uc::subscribe::Input {
            actor: actor.uid,
            plan,
            pin,
        })
        .await
    }

    pub async fn balance(&self) -> Result<i64> {
        let actor = self.require_actor("see your balance")?;

        self.services()
            .ledger
            .balance(&actor.uid)
            .await?
            .let_(Ok)
    }
}
