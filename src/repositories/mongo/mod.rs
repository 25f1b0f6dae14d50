use std::marker::PhantomData;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, to_bson, Document};
use mongodb::error::Result as MongoResult;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument, UpdateOptions};
use mongodb::{Client, Collection, Database};
use tracing::Instrument;
use uuid::Uuid;

use super::{
    ContentMutation, ContentQuery, ContentRepository, Debit, IdempotencyKey, InboxRepository,
    LedgerRepository, PlanPurchase, Receipt, RepositoryError, Result, Transfer, UserMutation,
    UserQuery, UserRepository,
};
use crate::entities::{
    Cents, Comment, CommentId, Content, ContentId, ContentKind, InboxItem, Plan, User, UserId,
};
use crate::utils::{AlsoChain, LetChain};

pub(crate) mod converters;
pub(crate) mod helpers;
mod models;
mod type_convert;

use converters::{convert_404_or, convert_repo_err, to_bool, try_unique_check};
use helpers::{
    abort_with, count_one, exec_transaction, get_one, initialize_coll, is_contains,
    make_session, modify_set, process_transaction, ModifyOpTy,
};
use models::{
    MongoCommentModel, MongoContentModel, MongoInboxModel, MongoLedgerModel, MongoUserModel,
};

fn after() -> Option<FindOneAndUpdateOptions> {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
        .let_(Some)
}

fn before() -> Option<FindOneAndUpdateOptions> {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::Before)
        .build()
        .let_(Some)
}

pub struct MongoUserRepository {
    client: Client,
    coll: Collection<MongoUserModel>,
    ledger: Collection<MongoLedgerModel>,
}

impl MongoUserRepository {
    pub async fn new_with(client: Client, db: Database) -> ::anyhow::Result<Self> {
        initialize_coll("user", "id", &db).await?;
        initialize_coll("ledger", "key", &db).await?;

        let coll = db.collection("user");
        let ledger = db.collection("ledger");

        Ok(Self {
            client,
            coll,
            ledger,
        })
    }

    /// moves `amount` from `from` to `to` (or out of the system when `to` is
    /// `None`) and records the receipt, all inside one transaction.
    async fn settle(
        &self,
        key: &IdempotencyKey,
        from: &UserId,
        to: Option<&UserId>,
        amount: Cents,
        also_set: Option<Document>,
    ) -> MongoResult<Result<Receipt>> {
        let mut session = make_session(&self.client).await?;

        if let Some(m) = self
            .ledger
            .find_one_with_session(doc! { "key": &key.0 }, None, &mut session)
            .instrument(tracing::trace_span!("find_one_with_session", key = %key.0))
            .await?
        {
            let receipt = Receipt::from(m).also_(|r| r.replayed = true);
            session.abort_transaction().await?;
            return Ok(Ok(receipt));
        }

        let payer = match self
            .coll
            .find_one_with_session(doc! { "id": &from.0 }, None, &mut session)
            .await?
        {
            Some(m) => m,
            None => return abort_with(&mut session, RepositoryError::NotFound).await,
        };
        let payee = match to {
            Some(to) => match self
                .coll
                .find_one_with_session(doc! { "id": &to.0 }, None, &mut session)
                .await?
            {
                Some(m) => Some(m),
                None => return abort_with(&mut session, RepositoryError::NotFound).await,
            },
            None => None,
        };

        if payer.balance < amount {
            let e = RepositoryError::InsufficientFunds {
                balance: payer.balance,
                required: amount,
            };
            return abort_with(&mut session, e).await;
        }

        let mut payer_update = doc! { "$inc": { "balance": -amount } };
        if let Some(set) = also_set {
            payer_update.insert("$set", set);
        }
        self.coll
            .update_one_with_session(
                doc! { "id": &from.0, "balance": { "$gte": amount } },
                payer_update,
                None,
                &mut session,
            )
            .instrument(tracing::trace_span!("update_one_with_session", side = "payer"))
            .await?;

        if let Some(payee) = &payee {
            self.coll
                .update_one_with_session(
                    doc! { "id": &payee.id },
                    doc! { "$inc": { "balance": amount } },
                    None,
                    &mut session,
                )
                .instrument(tracing::trace_span!("update_one_with_session", side = "payee"))
                .await?;
        }

        let receipt = Receipt {
            key: key.clone(),
            amount,
            from_before: payer.balance,
            from_after: payer.balance - amount,
            to_before: payee.as_ref().map(|p| p.balance),
            to_after: payee.as_ref().map(|p| p.balance + amount),
            replayed: false,
        };
        self.ledger
            .insert_one_with_session(MongoLedgerModel::from(&receipt), None, &mut session)
            .await?;

        process_transaction(&mut session).await?;

        Ok(Ok(receipt))
    }
}

fn check_amount(amount: Cents) -> Result<()> {
    match amount < 0 {
        true => Err(RepositoryError::Internal(anyhow!(
            "negative amount: {}",
            amount
        ))),
        false => Ok(()),
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, item: User) -> Result<bool> {
        let model: MongoUserModel = item.into();

        self.coll
            .insert_one(model, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(try_unique_check)
    }

    async fn is_exists(&self, id: &UserId) -> Result<bool> {
        count_one(&self.coll, doc! { "id": &id.0 }).await
    }

    async fn find(&self, id: &UserId) -> Result<User> {
        let user: User = get_one(&self.coll, doc! { "id": &id.0 }).await?.into();

        Ok(user)
    }

    async fn finds(&self, query: UserQuery) -> Result<Vec<User>> {
        let query_doc: Document = query.into();

        let res = self
            .coll
            .find(query_doc, None)
            .instrument(tracing::trace_span!("find"))
            .await
            .let_(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .let_(convert_repo_err)?
            .into_iter()
            .map(Into::into)
            .collect();

        Ok(res)
    }

    async fn update(&self, id: &UserId, mutation: UserMutation) -> Result<User> {
        let mutation_doc: Document = mutation.into();
        if mutation_doc.is_empty() {
            return self.find(id).await;
        }

        let user: User = self
            .coll
            .find_one_and_update(doc! { "id": &id.0 }, doc! { "$set": mutation_doc }, after())
            .instrument(tracing::trace_span!("find_one_and_update"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .into();

        Ok(user)
    }

    async fn insert_following(&self, id: &UserId, target: &UserId) -> Result<bool> {
        modify_set("followings", &self.coll, &id.0, &target.0, ModifyOpTy::Push).await
    }

    async fn delete_following(&self, id: &UserId, target: &UserId) -> Result<bool> {
        modify_set("followings", &self.coll, &id.0, &target.0, ModifyOpTy::Pull).await
    }

    async fn insert_follower(&self, id: &UserId, follower: &UserId) -> Result<bool> {
        modify_set("followers", &self.coll, &id.0, &follower.0, ModifyOpTy::Push).await
    }

    async fn delete_follower(&self, id: &UserId, follower: &UserId) -> Result<bool> {
        modify_set("followers", &self.coll, &id.0, &follower.0, ModifyOpTy::Pull).await
    }

    async fn adjust_count(&self, id: &UserId, kind: ContentKind, delta: i64) -> Result<()> {
        let field = format!("counts.{}s", kind.as_str());
        let current = format!("${}", field);

        // pipeline update so the counter clamps at zero server-side
        let res = self
            .coll
            .update_one(
                doc! { "id": &id.0 },
                vec![doc! {
                    "$set": { &field: { "$max": [0, { "$add": [current, delta] }] } }
                }],
                None,
            )
            .instrument(tracing::trace_span!("update_one", field = %field))
            .await
            .let_(convert_repo_err)?;

        match res.matched_count.let_(to_bool) {
            true => Ok(()),
            false => Err(RepositoryError::NotFound),
        }
    }

    async fn tick_plan(&self, id: &UserId, plan: Plan, next: u64) -> Result<bool> {
        let mut set = doc! { "remaining_secs": next as i64 };
        if next == 0 {
            set.insert("plan", Plan::Free.as_str());
        }

        let res = self
            .coll
            .update_one(
                doc! { "id": &id.0, "plan": plan.as_str() },
                doc! { "$set": set },
                None,
            )
            .instrument(tracing::trace_span!("update_one", plan = plan.as_str()))
            .await
            .let_(convert_repo_err)?;

        Ok(res.matched_count.let_(to_bool))
    }
}

#[async_trait]
impl LedgerRepository for MongoUserRepository {
    async fn balance(&self, id: &UserId) -> Result<Cents> {
        Ok(get_one(&self.coll, doc! { "id": &id.0 }).await?.balance)
    }

    async fn transfer(&self, Transfer { key, from, to, amount }: Transfer) -> Result<Receipt> {
        check_amount(amount)?;
        if from == to {
            return Err(RepositoryError::Internal(anyhow!(
                "cannot transfer to the same account"
            )));
        }

        exec_transaction(|| self.settle(&key, &from, Some(&to), amount, None))
            .await
            .let_(convert_repo_err)?
    }

    async fn debit(&self, Debit { key, from, amount }: Debit) -> Result<Receipt> {
        check_amount(amount)?;

        exec_transaction(|| self.settle(&key, &from, None, amount, None))
            .await
            .let_(convert_repo_err)?
    }

    async fn purchase_plan(
        &self,
        PlanPurchase {
            key,
            user,
            plan,
            price,
            remaining_secs,
        }: PlanPurchase,
    ) -> Result<Receipt> {
        check_amount(price)?;
        let set = doc! {
            "plan": plan.as_str(),
            "remaining_secs": remaining_secs as i64,
        };

        exec_transaction(|| self.settle(&key, &user, None, price, Some(set.clone())))
            .await
            .let_(convert_repo_err)?
    }
}

pub struct MongoContentRepository {
    coll: Collection<MongoContentModel>,
}

impl MongoContentRepository {
    pub async fn new_with(db: Database) -> ::anyhow::Result<Self> {
        initialize_coll("content", "id", &db).await?;

        let coll = db.collection("content");

        Ok(Self { coll })
    }
}

#[async_trait]
impl ContentRepository for MongoContentRepository {
    async fn insert(&self, item: Content) -> Result<bool> {
        let model: MongoContentModel = item.into();

        self.coll
            .insert_one(model, None)
            .instrument(tracing::trace_span!("insert_one"))
            .await
            .let_(try_unique_check)
    }

    async fn is_exists(&self, id: ContentId) -> Result<bool> {
        count_one(&self.coll, doc! { "id": id.to_string() }).await
    }

    async fn find(&self, id: ContentId) -> Result<Content> {
        get_one(&self.coll, doc! { "id": id.to_string() })
            .await?
            .try_into()
    }

    async fn finds(&self, query: ContentQuery) -> Result<Vec<Content>> {
        let query_doc: Document = query.into();

        self.coll
            .find(query_doc, None)
            .instrument(tracing::trace_span!("find"))
            .await
            .let_(convert_repo_err)?
            .try_collect::<Vec<_>>()
            .await
            .let_(convert_repo_err)?
            .into_iter()
            .map(Content::try_from)
            .collect()
    }

    async fn update(&self, id: ContentId, mutation: ContentMutation) -> Result<Content> {
        let mutation_doc: Document = mutation.into();
        if mutation_doc.is_empty() {
            return self.find(id).await;
        }

        self.coll
            .find_one_and_update(
                doc! { "id": id.to_string() },
                doc! { "$set": mutation_doc },
                after(),
            )
            .instrument(tracing::trace_span!("find_one_and_update"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .try_into()
    }

    async fn is_liked(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        is_contains("liked_by", &self.coll, id.to_string(), &user_id.0).await
    }

    async fn insert_liked(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        modify_set("liked_by", &self.coll, id.to_string(), &user_id.0, ModifyOpTy::Push).await
    }

    async fn delete_liked(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        modify_set("liked_by", &self.coll, id.to_string(), &user_id.0, ModifyOpTy::Pull).await
    }

    async fn insert_reported(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        modify_set("reported_by", &self.coll, id.to_string(), &user_id.0, ModifyOpTy::Push).await
    }

    async fn insert_viewed(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        modify_set("viewed_by", &self.coll, id.to_string(), &user_id.0, ModifyOpTy::Push).await
    }

    async fn insert_comment(&self, id: ContentId, comment: Comment) -> Result<()> {
        let model = MongoCommentModel::from(comment)
            .let_(|m| to_bson(&m))
            .let_(convert_repo_err)?;

        let res = self
            .coll
            .update_one(
                doc! { "id": id.to_string() },
                doc! { "$push": { "comments": model } },
                None,
            )
            .instrument(tracing::trace_span!("update_one"))
            .await
            .let_(convert_repo_err)?;

        match res.matched_count.let_(to_bool) {
            true => Ok(()),
            false => Err(RepositoryError::NotFound),
        }
    }

    async fn delete_comment(&self, id: ContentId, comment_id: CommentId) -> Result<Comment> {
        let cid = comment_id.to_string();

        let prev = self
            .coll
            .find_one_and_update(
                doc! { "id": id.to_string(), "comments.id": &cid },
                doc! { "$pull": { "comments": { "id": &cid } } },
                before(),
            )
            .instrument(tracing::trace_span!("find_one_and_update"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?;

        prev.comments
            .into_iter()
            .find(|c| c.id == cid)
            .let_(convert_404_or)?
            .try_into()
    }

    async fn insert_comment_reported(
        &self,
        id: ContentId,
        comment_id: CommentId,
        user_id: &UserId,
    ) -> Result<bool> {
        let cid = comment_id.to_string();

        let res = self
            .coll
            .update_one(
                doc! {
                    "id": id.to_string(),
                    "comments": {
                        "$elemMatch": { "id": &cid, "reported_by": { "$ne": &user_id.0 } }
                    }
                },
                doc! { "$addToSet": { "comments.$.reported_by": &user_id.0 } },
                None,
            )
            .instrument(tracing::trace_span!("update_one"))
            .await
            .let_(convert_repo_err)?;

        if res.modified_count.let_(to_bool) {
            return Ok(true);
        }

        match count_one(&self.coll, doc! { "id": id.to_string(), "comments.id": &cid }).await? {
            true => Ok(false),
            false => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: ContentId) -> Result<Content> {
        self.coll
            .find_one_and_delete(doc! { "id": id.to_string() }, None)
            .instrument(tracing::trace_span!("find_one_and_delete"))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .try_into()
    }
}

/// one document per owner holding every item of one kind.
pub struct MongoInboxRepository<T> {
    coll: Collection<MongoInboxModel<T>>,
    _item: PhantomData<T>,
}

impl<T: InboxItem> MongoInboxRepository<T> {
    pub async fn new_with(db: &Database) -> ::anyhow::Result<Self> {
        initialize_coll(T::BOX, "owner", db).await?;

        Ok(Self {
            coll: db.collection(T::BOX),
            _item: PhantomData,
        })
    }
}

fn upsert() -> Option<UpdateOptions> { UpdateOptions::builder().upsert(true).build().let_(Some) }

#[async_trait]
impl<T: InboxItem + 'static> InboxRepository<T> for MongoInboxRepository<T> {
    async fn push(&self, owner: &UserId, item: T) -> Result<()> {
        let item = to_bson(&item).let_(convert_repo_err)?;

        self.coll
            .update_one(
                doc! { "owner": &owner.0 },
                doc! { "$push": { "items": item } },
                upsert(),
            )
            .instrument(tracing::trace_span!("update_one", inbox = T::BOX))
            .await
            .let_(convert_repo_err)?;

        Ok(())
    }

    async fn list(&self, owner: &UserId) -> Result<Vec<T>> {
        let res = self
            .coll
            .find_one(doc! { "owner": &owner.0 }, None)
            .instrument(tracing::trace_span!("find_one", inbox = T::BOX))
            .await
            .let_(convert_repo_err)?
            .map(|m| m.items)
            .unwrap_or_default();

        Ok(res)
    }

    async fn remove(&self, owner: &UserId, item_id: Uuid) -> Result<T> {
        let iid = item_id.to_string();

        self.coll
            .find_one_and_update(
                doc! { "owner": &owner.0, "items.id": &iid },
                doc! { "$pull": { "items": { "id": &iid } } },
                before(),
            )
            .instrument(tracing::trace_span!("find_one_and_update", inbox = T::BOX))
            .await
            .let_(convert_repo_err)?
            .let_(convert_404_or)?
            .items
            .into_iter()
            .find(|i| i.item_id() == item_id)
            .let_(convert_404_or)
    }

    async fn replace(&self, owner: &UserId, items: Vec<T>) -> Result<()> {
        let items = to_bson(&items).let_(convert_repo_err)?;

        self.coll
            .update_one(
                doc! { "owner": &owner.0 },
                doc! { "$set": { "items": items } },
                upsert(),
            )
            .instrument(tracing::trace_span!("update_one", inbox = T::BOX))
            .await
            .let_(convert_repo_err)?;

        Ok(())
    }
}
