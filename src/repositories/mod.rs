use std::collections::HashSet;
use std::ops::Bound;

use async_trait::async_trait;
use regex::Regex;
use uuid::Uuid;

use crate::entities::{
    Cents, Comment, CommentId, Content, ContentId, ContentKind, InboxItem, PinHash, Plan, Pricing,
    User, UserId,
};

pub mod mock;
pub mod mongo;

pub(crate) type StdResult<T, E> = ::std::result::Result<T, E>;
pub type Result<T> = ::std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait UserRepository {
    async fn insert(&self, item: User) -> Result<bool>;
    async fn is_exists(&self, id: &UserId) -> Result<bool>;

    async fn find(&self, id: &UserId) -> Result<User>;
    async fn finds(&self, query: UserQuery) -> Result<Vec<User>>;

    async fn update(&self, id: &UserId, mutation: UserMutation) -> Result<User>;

    async fn insert_following(&self, id: &UserId, target: &UserId) -> Result<bool>;
    async fn delete_following(&self, id: &UserId, target: &UserId) -> Result<bool>;

    async fn insert_follower(&self, id: &UserId, follower: &UserId) -> Result<bool>;
    async fn delete_follower(&self, id: &UserId, follower: &UserId) -> Result<bool>;

    async fn adjust_count(&self, id: &UserId, kind: ContentKind, delta: i64) -> Result<()>;

    /// stores the next countdown value only while the stored plan is still
    /// `plan`; at zero the plan drops to FREE. false when the plan changed.
    async fn tick_plan(&self, id: &UserId, plan: Plan, next: u64) -> Result<bool>;
}

#[async_trait]
pub trait ContentRepository {
    async fn insert(&self, item: Content) -> Result<bool>;
    async fn is_exists(&self, id: ContentId) -> Result<bool>;

    async fn find(&self, id: ContentId) -> Result<Content>;
    async fn finds(&self, query: ContentQuery) -> Result<Vec<Content>>;

    async fn update(&self, id: ContentId, mutation: ContentMutation) -> Result<Content>;

    async fn is_liked(&self, id: ContentId, user_id: &UserId) -> Result<bool>;
    async fn insert_liked(&self, id: ContentId, user_id: &UserId) -> Result<bool>;
    async fn delete_liked(&self, id: ContentId, user_id: &UserId) -> Result<bool>;

    async fn insert_reported(&self, id: ContentId, user_id: &UserId) -> Result<bool>;
    async fn insert_viewed(&self, id: ContentId, user_id: &UserId) -> Result<bool>;

    async fn insert_comment(&self, id: ContentId, comment: Comment) -> Result<()>;
    async fn delete_comment(&self, id: ContentId, comment_id: CommentId) -> Result<Comment>;
    async fn insert_comment_reported(
        &self,
        id: ContentId,
        comment_id: CommentId,
        user_id: &UserId,
    ) -> Result<bool>;

    async fn delete(&self, id: ContentId) -> Result<Content>;
}

/// per-user list documents (notifications, bookmarks, carts, support threads).
#[async_trait]
pub trait InboxRepository<T: InboxItem> {
    async fn push(&self, owner: &UserId, item: T) -> Result<()>;
    async fn list(&self, owner: &UserId) -> Result<Vec<T>>;
    async fn remove(&self, owner: &UserId, item_id: Uuid) -> Result<T>;
    async fn replace(&self, owner: &UserId, items: Vec<T>) -> Result<()>;
}

/// balance mutations. every operation is atomic and replays its receipt when
/// called again with the same key.
#[async_trait]
pub trait LedgerRepository {
    async fn balance(&self, id: &UserId) -> Result<Cents>;
    async fn transfer(&self, transfer: Transfer) -> Result<Receipt>;
    async fn debit(&self, debit: Debit) -> Result<Receipt>;
    async fn purchase_plan(&self, purchase: PlanPurchase) -> Result<Receipt>;
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(pub String);

impl IdempotencyKey {
    pub fn new(scope: &str) -> Self { Self(format!("{}:{}", scope, Uuid::new_v4())) }

    pub fn child(&self, part: impl ::core::fmt::Display) -> Self {
        Self(format!("{}:{}", self.0, part))
    }
}

#[derive(Debug, Clone)]
pub struct Transfer {
    pub key: IdempotencyKey,
    pub from: UserId,
    pub to: UserId,
    pub amount: Cents,
}

#[derive(Debug, Clone)]
pub struct Debit {
    pub key: IdempotencyKey,
    pub from: UserId,
    pub amount: Cents,
}

#[derive(Debug, Clone)]
pub struct PlanPurchase {
    pub key: IdempotencyKey,
    pub user: UserId,
    pub plan: Plan,
    pub price: Cents,
    pub remaining_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub key: IdempotencyKey,
    pub amount: Cents,
    pub from_before: Cents,
    pub from_after: Cents,
    pub to_before: Option<Cents>,
    pub to_after: Option<Cents>,
    pub replayed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub username: Option<Regex>,
    pub email: Option<String>,
    pub plan: Option<Plan>,
    pub followers: Option<HashSet<UserId>>,
    pub followers_num: Option<(Bound<u32>, Bound<u32>)>,
}

#[derive(Debug, Clone, Default)]
pub struct ContentQuery {
    pub kind: Option<ContentKind>,
    pub owner: Option<UserId>,
    pub title: Option<Regex>,
    pub liked: Option<HashSet<UserId>>,
    pub liked_num: Option<(Bound<u32>, Bound<u32>)>,
}

#[derive(Debug, Clone, Default)]
pub struct UserMutation {
    pub username: Option<String>,
    pub bio: Option<String>,
    pub pin: Option<PinHash>,
    pub profile_pic: Option<String>,
    pub plan: Option<Plan>,
    pub remaining_secs: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct ContentMutation {
    pub title: Option<String>,
    pub description: Option<String>,
    pub pricing: Option<Pricing>,
}

#[derive(Debug)]
pub enum RepositoryError {
    NotFound,
    NoUnique { matched: u32 },
    InsufficientFunds { balance: Cents, required: Cents },
    Internal(anyhow::Error),
}

impl ::std::fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
        match self {
            RepositoryError::NotFound => write!(f, "cannot find object."),
            RepositoryError::NoUnique { matched } => write!(
                f,
                "expected unique object, found non-unique objects (matched: {})",
                matched
            ),
            RepositoryError::InsufficientFunds { balance, required } => write!(
                f,
                "insufficient funds (balance: {}, required: {})",
                crate::utils::format_cents(*balance),
                crate::utils::format_cents(*required)
            ),
            RepositoryError::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl ::std::error::Error for RepositoryError {}

pub(crate) fn contains_range(range: &(Bound<u32>, Bound<u32>), n: u32) -> bool {
    ::core::ops::RangeBounds::contains(range, &n)
}
