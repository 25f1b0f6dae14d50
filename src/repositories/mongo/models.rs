use std::collections::HashSet;

use crate::entities::{ContentKind, Plan};

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoUserModel {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub nationality: String,
    pub username: String,
    pub bio: String,
    pub plan: Plan,
    pub remaining_secs: i64,
    pub balance: i64,
    pub pin: Option<String>,
    pub followers: HashSet<String>,
    pub followers_size: i64,
    pub followings: HashSet<String>,
    pub followings_size: i64,
    pub counts: MongoCountsModel,
    pub profile_pic: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, Default, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoCountsModel {
    pub quotes: i64,
    pub images: i64,
    pub videos: i64,
    pub ebooks: i64,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoContentModel {
    pub id: String,
    pub kind: ContentKind,
    pub owner: String,
    pub owner_name: String,
    pub title: String,
    pub description: String,
    pub media: Option<String>,
    pub size: Option<i64>,
    /// `None` is free.
    pub price: Option<i64>,
    pub creator_status: Option<String>,
    pub liked_by: HashSet<String>,
    pub liked_by_size: i64,
    pub reported_by: HashSet<String>,
    pub reported_by_size: i64,
    pub viewed_by: HashSet<String>,
    pub viewed_by_size: i64,
    pub comments: Vec<MongoCommentModel>,
    pub created: Option<String>,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoCommentModel {
    pub id: String,
    pub author: String,
    pub author_name: String,
    pub body: String,
    pub reported_by: HashSet<String>,
    pub created: String,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoLedgerModel {
    pub key: String,
    pub amount: i64,
    pub from_before: i64,
    pub from_after: i64,
    pub to_before: Option<i64>,
    pub to_after: Option<i64>,
    pub settled: String,
}

#[derive(Debug, Clone, ::serde::Serialize, ::serde::Deserialize)]
pub struct MongoInboxModel<T> {
    pub owner: String,
    pub items: Vec<T>,
}
