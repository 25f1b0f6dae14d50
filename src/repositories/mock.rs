use std::collections::HashMap;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{
    contains_range, ContentMutation, ContentQuery, ContentRepository, Debit, IdempotencyKey,
    InboxRepository, LedgerRepository, PlanPurchase, Receipt, RepositoryError, Result, Transfer,
    UserMutation, UserQuery, UserRepository,
};
use crate::entities::{
    Cents, Comment, CommentId, Content, ContentId, ContentKind, InboxItem, Plan, User, UserId,
};
use crate::utils::AlsoChain;

mod helpers;

use helpers::{find_index, find_mut, find_ref};

pub struct InMemoryRepository<T>(Mutex<Vec<T>>);

impl<T> InMemoryRepository<T> {
    pub fn new() -> Self { Self(Mutex::new(vec![])) }
}
impl<T> Default for InMemoryRepository<T> {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl UserRepository for InMemoryRepository<User> {
    async fn insert(&self, item: User) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn is_exists(&self, id: &UserId) -> Result<bool> {
        let guard = self.0.lock().await;

        match find_ref(&guard, |v| &v.id == id) {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn find(&self, id: &UserId) -> Result<User> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| &v.id == id)?.clone())
    }

    async fn finds(
        &self,
        UserQuery {
            username,
            email,
            plan,
            followers,
            followers_num,
        }: UserQuery,
    ) -> Result<Vec<User>> {
        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|u| {
                username
                    .as_ref()
                    .map(|r| r.is_match(&u.username))
                    .unwrap_or(true)
            })
            .filter(|u| email.as_ref().map(|e| e == &u.email).unwrap_or(true))
            .filter(|u| plan.map(|p| p == u.plan).unwrap_or(true))
            .filter(|u| {
                followers
                    .as_ref()
                    .map(|s| s.is_subset(&u.followers))
                    .unwrap_or(true)
            })
            .filter(|u| {
                followers_num
                    .as_ref()
                    .map(|b| contains_range(b, u.followers.len() as u32))
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: &UserId, mutation: UserMutation) -> Result<User> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| &v.id == id)?;

        let UserMutation {
            username,
            bio,
            pin,
            profile_pic,
            plan,
            remaining_secs,
        } = mutation;
        if let Some(val) = username {
            item.username = val;
        }
        if let Some(val) = bio {
            item.bio = val;
        }
        if let Some(val) = pin {
            item.pin = Some(val);
        }
        if let Some(val) = profile_pic {
            item.profile_pic = Some(val);
        }
        if let Some(val) = plan {
            item.plan = val;
        }
        if let Some(val) = remaining_secs {
            item.remaining_secs = val;
        }

        Ok(item.clone())
    }

    async fn insert_following(&self, id: &UserId, target: &UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |u| &u.id == id)?;

        Ok(item.followings.insert(target.clone()))
    }

    async fn delete_following(&self, id: &UserId, target: &UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |u| &u.id == id)?;

        Ok(item.followings.remove(target))
    }

    async fn insert_follower(&self, id: &UserId, follower: &UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |u| &u.id == id)?;

        Ok(item.followers.insert(follower.clone()))
    }

    async fn delete_follower(&self, id: &UserId, follower: &UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |u| &u.id == id)?;

        Ok(item.followers.remove(follower))
    }

    async fn adjust_count(&self, id: &UserId, kind: ContentKind, delta: i64) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |u| &u.id == id)?;

        let count = item.counts.get_mut(kind);
        *count = (*count as i64 + delta).max(0) as u32;

        Ok(())
    }

    async fn tick_plan(&self, id: &UserId, plan: Plan, next: u64) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |u| &u.id == id)?;

        if item.plan != plan {
            return Ok(false);
        }

        item.remaining_secs = next;
        if next == 0 {
            item.plan = Plan::Free;
        }

        Ok(true)
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository<Content> {
    async fn insert(&self, item: Content) -> Result<bool> {
        let mut guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == item.id) {
            Ok(_) => return Ok(false),
            Err(RepositoryError::NotFound) => (),
            Err(e) => return Err(e),
        }

        guard.push(item);
        Ok(true)
    }

    async fn is_exists(&self, id: ContentId) -> Result<bool> {
        let guard = self.0.lock().await;

        match find_ref(&guard, |v| v.id == id) {
            Ok(_) => Ok(true),
            Err(RepositoryError::NotFound) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn find(&self, id: ContentId) -> Result<Content> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |v| v.id == id)?.clone())
    }

    async fn finds(
        &self,
        ContentQuery {
            kind,
            owner,
            title,
            liked,
            liked_num,
        }: ContentQuery,
    ) -> Result<Vec<Content>> {
        Ok(self
            .0
            .lock()
            .await
            .iter()
            .filter(|c| kind.map(|k| k == c.kind).unwrap_or(true))
            .filter(|c| owner.as_ref().map(|o| o == &c.owner).unwrap_or(true))
            .filter(|c| title.as_ref().map(|r| r.is_match(&c.title)).unwrap_or(true))
            .filter(|c| {
                liked
                    .as_ref()
                    .map(|s| s.is_subset(&c.liked_by))
                    .unwrap_or(true)
            })
            .filter(|c| {
                liked_num
                    .as_ref()
                    .map(|b| contains_range(b, c.like_count()))
                    .unwrap_or(true)
            })
            .cloned()
            .collect())
    }

    async fn update(&self, id: ContentId, mutation: ContentMutation) -> Result<Content> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |v| v.id == id)?;

        let ContentMutation {
            title,
            description,
            pricing,
        } = mutation;
        if let Some(val) = title {
            item.title = val;
        }
        if let Some(val) = description {
            item.description = val;
        }
        if let Some(val) = pricing {
            item.pricing = val;
        }

        Ok(item.clone())
    }

    async fn is_liked(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        let guard = self.0.lock().await;

        Ok(find_ref(&guard, |c| c.id == id)?.liked_by.contains(user_id))
    }

    async fn insert_liked(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |c| c.id == id)?;

        Ok(item.liked_by.insert(user_id.clone()))
    }

    async fn delete_liked(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |c| c.id == id)?;

        Ok(item.liked_by.remove(user_id))
    }

    async fn insert_reported(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |c| c.id == id)?;

        Ok(item.reported_by.insert(user_id.clone()))
    }

    async fn insert_viewed(&self, id: ContentId, user_id: &UserId) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |c| c.id == id)?;

        Ok(item.viewed_by.insert(user_id.clone()))
    }

    async fn insert_comment(&self, id: ContentId, comment: Comment) -> Result<()> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |c| c.id == id)?;

        item.comments.push(comment);
        Ok(())
    }

    async fn delete_comment(&self, id: ContentId, comment_id: CommentId) -> Result<Comment> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |c| c.id == id)?;
        let index = find_index(&item.comments, |c| c.id == comment_id)?;

        Ok(item.comments.remove(index))
    }

    async fn insert_comment_reported(
        &self,
        id: ContentId,
        comment_id: CommentId,
        user_id: &UserId,
    ) -> Result<bool> {
        let mut guard = self.0.lock().await;
        let item = find_mut(&mut guard, |c| c.id == id)?;
        let comment = find_mut(&mut item.comments, |c| c.id == comment_id)?;

        Ok(comment.reported_by.insert(user_id.clone()))
    }

    async fn delete(&self, id: ContentId) -> Result<Content> {
        let mut guard = self.0.lock().await;
        let index = find_index(&guard, |v| v.id == id)?;

        Ok(guard.remove(index))
    }
}

pub struct InMemoryInbox<T>(Mutex<HashMap<UserId, Vec<T>>>);

impl<T> InMemoryInbox<T> {
    pub fn new() -> Self { Self(Mutex::new(HashMap::new())) }
}
impl<T> Default for InMemoryInbox<T> {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl<T: InboxItem + 'static> InboxRepository<T> for InMemoryInbox<T> {
    async fn push(&self, owner: &UserId, item: T) -> Result<()> {
        self.0
            .lock()
            .await
            .entry(owner.clone())
            .or_default()
            .push(item);

        Ok(())
    }

    async fn list(&self, owner: &UserId) -> Result<Vec<T>> {
        Ok(self
            .0
            .lock()
            .await
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }

    async fn remove(&self, owner: &UserId, item_id: Uuid) -> Result<T> {
        let mut guard = self.0.lock().await;
        let items = guard.get_mut(owner).ok_or(RepositoryError::NotFound)?;
        let index = find_index(items, |i| i.item_id() == item_id)?;

        Ok(items.remove(index))
    }

    async fn replace(&self, owner: &UserId, items: Vec<T>) -> Result<()> {
        self.0.lock().await.insert(owner.clone(), items);

        Ok(())
    }
}

/// ledger over the in-memory user store; one critical section per operation.
pub struct InMemoryLedger {
    users: Arc<InMemoryRepository<User>>,
    receipts: Mutex<HashMap<IdempotencyKey, Receipt>>,
}

impl InMemoryLedger {
    pub fn new(users: Arc<InMemoryRepository<User>>) -> Self {
        Self {
            users,
            receipts: Mutex::new(HashMap::new()),
        }
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
impl LedgerRepository for InMemoryLedger {
    async fn balance(&self, id: &UserId) -> Result<Cents> {
        let guard = self.users.0.lock().await;

        Ok(find_ref(&guard, |u| &u.id == id)?.balance)
    }

    async fn transfer(&self, Transfer { key, from, to, amount }: Transfer) -> Result<Receipt> {
        let mut receipts = self.receipts.lock().await;
        if let Some(r) = receipts.get(&key) {
            return Ok(r.clone().also_(|r| r.replayed = true));
        }
        check_amount(amount)?;
        if from == to {
            return Err(RepositoryError::Internal(anyhow!(
                "cannot transfer to the same account"
            )));
        }

        let mut users = self.users.0.lock().await;
        let from_i = find_index(&users, |u| u.id == from)?;
        let to_i = find_index(&users, |u| u.id == to)?;

        let from_before = users[from_i].balance;
        let to_before = users[to_i].balance;
        if from_before < amount {
            return Err(RepositoryError::InsufficientFunds {
                balance: from_before,
                required: amount,
            });
        }

        users[from_i].balance -= amount;
        users[to_i].balance += amount;

        let receipt = Receipt {
            key: key.clone(),
            amount,
            from_before,
            from_after: from_before - amount,
            to_before: Some(to_before),
            to_after: Some(to_before + amount),
            replayed: false,
        };
        receipts.insert(key, receipt.clone());

        Ok(receipt)
    }

    async fn debit(&self, Debit { key, from, amount }: Debit) -> Result<Receipt> {
        let mut receipts = self.receipts.lock().await;
        if let Some(r) = receipts.get(&key) {
            return Ok(r.clone().also_(|r| r.replayed = true));
        }
        check_amount(amount)?;

        let mut users = self.users.0.lock().await;
        let user = find_mut(&mut users, |u| u.id == from)?;

        let from_before = user.balance;
        if from_before < amount {
            return Err(RepositoryError::InsufficientFunds {
                balance: from_before,
                required: amount,
            });
        }
        user.balance -= amount;

        let receipt = Receipt {
            key: key.clone(),
            amount,
            from_before,
            from_after: user.balance,
            to_before: None,
            to_after: None,
            replayed: false,
        };
        receipts.insert(key, receipt.clone());

        Ok(receipt)
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
        let mut receipts = self.receipts.lock().await;
        if let Some(r) = receipts.get(&key) {
            return Ok(r.clone().also_(|r| r.replayed = true));
        }
        check_amount(price)?;

        let mut users = self.users.0.lock().await;
        let item = find_mut(&mut users, |u| u.id == user)?;

        let from_before = item.balance;
        if from_before < price {
            return Err(RepositoryError::InsufficientFunds {
                balance: from_before,
                required: price,
            });
        }
        item.balance -= price;
        item.plan = plan;
        item.remaining_secs = remaining_secs;

        let receipt = Receipt {
            key: key.clone(),
            amount: price,
            from_before,
            from_after: item.balance,
            to_before: None,
            to_after: None,
            replayed: false,
        };
        receipts.insert(key, receipt.clone());

        Ok(receipt)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::entities::{ContentCounts, Pricing};

    pub(crate) fn user(id: &str, balance: Cents) -> User {
        User {
            id: UserId::from(id),
            email: format!("{}@example.com", id),
            first_name: id.to_string(),
            last_name: String::new(),
            nationality: String::new(),
            username: format!("@{}", id),
            bio: "Hi, I am new here".to_string(),
            plan: Plan::Free,
            remaining_secs: 0,
            balance,
            pin: None,
            followers: HashSet::new(),
            followings: HashSet::new(),
            counts: ContentCounts::default(),
            profile_pic: None,
            active: true,
        }
    }

    impl InMemoryRepository<User> {
        pub(crate) async fn set_balance(&self, id: &UserId, balance: Cents) {
            let mut guard = self.0.lock().await;
            find_mut(&mut guard, |u| &u.id == id).unwrap().balance = balance;
        }
    }

    pub(crate) fn content(owner: &str, kind: ContentKind, title: &str) -> Content {
        Content {
            id: ContentId::new(),
            kind,
            owner: UserId::from(owner),
            owner_name: format!("@{}", owner),
            title: title.to_string(),
            description: String::new(),
            media: None,
            size: None,
            pricing: Pricing::Free,
            creator_status: None,
            liked_by: HashSet::new(),
            reported_by: HashSet::new(),
            viewed_by: HashSet::new(),
            comments: vec![],
            created: Some(::chrono::Utc::now()),
        }
    }

    #[tokio::test]
    async fn like_set_is_idempotent_per_user() {
        let repo = InMemoryRepository::<Content>::new();
        let c = content("owner", ContentKind::Quote, "hello");
        let id = c.id;
        repo.insert(c).await.unwrap();

        let a = UserId::from("a");
        assert!(repo.insert_liked(id, &a).await.unwrap());
        assert!(!repo.insert_liked(id, &a).await.unwrap());
        assert_eq!(repo.find(id).await.unwrap().like_count(), 1);

        assert!(repo.delete_liked(id, &a).await.unwrap());
        assert!(!repo.delete_liked(id, &a).await.unwrap());
        assert_eq!(repo.find(id).await.unwrap().like_count(), 0);
    }

    #[tokio::test]
    async fn deleting_keeps_other_references_valid() {
        let repo = InMemoryRepository::<Content>::new();
        let first = content("owner", ContentKind::Image, "first");
        let second = content("owner", ContentKind::Image, "second");
        let third = content("owner", ContentKind::Image, "third");
        let (first_id, second_id, third_id) = (first.id, second.id, third.id);
        for c in [first, second, third] {
            repo.insert(c).await.unwrap();
        }

        repo.delete(first_id).await.unwrap();

        assert_eq!(repo.find(second_id).await.unwrap().title, "second");
        assert_eq!(repo.find(third_id).await.unwrap().title, "third");
        assert!(matches!(
            repo.find(first_id).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn transfer_is_atomic_when_recipient_is_missing() {
        let users = Arc::new(InMemoryRepository::<User>::new());
        users.insert(user("buyer", 2000)).await.unwrap();
        let ledger = InMemoryLedger::new(users.clone());

        let res = ledger
            .transfer(Transfer {
                key: IdempotencyKey::new("test"),
                from: UserId::from("buyer"),
                to: UserId::from("ghost"),
                amount: 1500,
            })
            .await;

        assert!(matches!(res, Err(RepositoryError::NotFound)));
        assert_eq!(ledger.balance(&UserId::from("buyer")).await.unwrap(), 2000);
    }

    #[tokio::test]
    async fn transfer_replays_with_same_key() {
        let users = Arc::new(InMemoryRepository::<User>::new());
        users.insert(user("a", 1000)).await.unwrap();
        users.insert(user("b", 0)).await.unwrap();
        let ledger = InMemoryLedger::new(users.clone());

        let t = Transfer {
            key: IdempotencyKey::new("gift"),
            from: UserId::from("a"),
            to: UserId::from("b"),
            amount: 300,
        };
        let first = ledger.transfer(t.clone()).await.unwrap();
        let second = ledger.transfer(t).await.unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(ledger.balance(&UserId::from("a")).await.unwrap(), 700);
        assert_eq!(ledger.balance(&UserId::from("b")).await.unwrap(), 300);
    }

    #[tokio::test]
    async fn debit_rejects_overdraft() {
        let users = Arc::new(InMemoryRepository::<User>::new());
        users.insert(user("a", 500)).await.unwrap();
        let ledger = InMemoryLedger::new(users);

        let res = ledger
            .debit(Debit {
                key: IdempotencyKey::new("withdraw"),
                from: UserId::from("a"),
                amount: 501,
            })
            .await;

        assert!(matches!(
            res,
            Err(RepositoryError::InsufficientFunds {
                balance: 500,
                required: 501
            })
        ));
    }
}
