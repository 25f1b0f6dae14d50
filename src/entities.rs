use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

pub type Date = DateTime<Utc>;

/// money is kept in cents.
pub type Cents = i64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self { Self(s.to_string()) }
}

impl FromStr for UserId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("empty user id".to_string()),
            s => Ok(Self(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentId(#[serde(with = "crate::utils::uuid_as_str")] pub Uuid);

impl ContentId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }
}

impl Default for ContentId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl FromStr for ContentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(s.parse()?)) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommentId(#[serde(with = "crate::utils::uuid_as_str")] pub Uuid);

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl FromStr for CommentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(s.parse()?)) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Quote,
    Image,
    Video,
    Ebook,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [Self::Quote, Self::Image, Self::Video, Self::Ebook];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::Image => "image",
            Self::Video => "video",
            Self::Ebook => "ebook",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "quote" | "quotes" | "post" => Ok(Self::Quote),
            "image" | "images" => Ok(Self::Image),
            "video" | "videos" => Ok(Self::Video),
            "ebook" | "ebooks" => Ok(Self::Ebook),
            o => Err(format!("unknown content kind: {}", o)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "price", rename_all = "lowercase")]
pub enum Pricing {
    Free,
    Paid(Cents),
}

impl Pricing {
    pub fn price(&self) -> Cents {
        match self {
            Self::Free => 0,
            Self::Paid(c) => *c,
        }
    }
}

/// stable reference to a content item; survives deletion of any other item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    pub kind: ContentKind,
    pub owner: UserId,
    pub id: ContentId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub author: UserId,
    pub author_name: String,
    pub body: String,
    pub reported_by: HashSet<UserId>,
    pub created: Date,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub id: ContentId,
    pub kind: ContentKind,
    pub owner: UserId,
    pub owner_name: String,
    pub title: String,
    pub description: String,
    pub media: Option<String>,
    pub size: Option<u64>,
    pub pricing: Pricing,
    pub creator_status: Option<String>,
    pub liked_by: HashSet<UserId>,
    pub reported_by: HashSet<UserId>,
    pub viewed_by: HashSet<UserId>,
    pub comments: Vec<Comment>,
    pub created: Option<Date>,
}

impl Content {
    pub fn reference(&self) -> ContentRef {
        ContentRef {
            kind: self.kind,
            owner: self.owner.clone(),
            id: self.id,
        }
    }

    pub fn like_count(&self) -> u32 { self.liked_by.len() as u32 }

    pub fn report_count(&self) -> u32 { self.reported_by.len() as u32 }

    pub fn views(&self) -> u32 { self.viewed_by.len() as u32 }

    pub fn snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            reference: self.reference(),
            title: self.title.clone(),
            owner_name: self.owner_name.clone(),
            pricing: self.pricing,
            media: self.media.clone(),
            creator_status: self.creator_status.clone(),
            size: self.size,
        }
    }
}

/// denormalized copy of a content item, embedded into bookmarks and carts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub reference: ContentRef,
    pub title: String,
    pub owner_name: String,
    pub pricing: Pricing,
    pub media: Option<String>,
    pub creator_status: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Plan {
    #[serde(rename = "FREE")]
    Free,
    #[serde(rename = "PRO")]
    Pro,
    #[serde(rename = "PRO+")]
    ProPlus,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "FREE",
            Self::Pro => "PRO",
            Self::ProPlus => "PRO+",
        }
    }

    pub fn price(&self) -> Cents {
        match self {
            Self::Free => 0,
            Self::Pro => 499,
            Self::ProPlus => 1099,
        }
    }

    /// `None` is unlimited.
    pub fn max_withdrawal(&self) -> Option<Cents> {
        match self {
            Self::Free => Some(5_000),
            Self::Pro => Some(50_000),
            Self::ProPlus => None,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FREE" => Ok(Self::Free),
            "PRO" => Ok(Self::Pro),
            "PRO+" | "PROPLUS" | "PRO_PLUS" => Ok(Self::ProPlus),
            o => Err(format!("unknown plan: {}", o)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinHash(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidPin;

impl fmt::Display for InvalidPin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pin must be exactly 4 digits")
    }
}

impl ::std::error::Error for InvalidPin {}

impl PinHash {
    /// salted with the owner id so equal pins never share a hash.
    pub fn derive(owner: &UserId, pin: &str) -> Result<Self, InvalidPin> {
        if pin.len() != 4 || !pin.chars().all(|c| c.is_ascii_digit()) {
            return Err(InvalidPin);
        }

        Ok(Self(digest(owner, pin)))
    }

    pub fn verify(&self, owner: &UserId, input: &str) -> bool { digest(owner, input) == self.0 }
}

fn digest(owner: &UserId, pin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(owner.0.as_bytes());
    hasher.update(b":");
    hasher.update(pin.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentCounts {
    pub quotes: u32,
    pub images: u32,
    pub videos: u32,
    pub ebooks: u32,
}

impl ContentCounts {
    pub fn get(&self, kind: ContentKind) -> u32 {
        match kind {
            ContentKind::Quote => self.quotes,
            ContentKind::Image => self.images,
            ContentKind::Video => self.videos,
            ContentKind::Ebook => self.ebooks,
        }
    }

    pub fn get_mut(&mut self, kind: ContentKind) -> &mut u32 {
        match kind {
            ContentKind::Quote => &mut self.quotes,
            ContentKind::Image => &mut self.images,
            ContentKind::Video => &mut self.videos,
            ContentKind::Ebook => &mut self.ebooks,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub nationality: String,
    pub username: String,
    pub bio: String,
    pub plan: Plan,
    pub remaining_secs: u64,
    pub balance: Cents,
    pub pin: Option<PinHash>,
    pub followers: HashSet<UserId>,
    pub followings: HashSet<UserId>,
    pub counts: ContentCounts,
    pub profile_pic: Option<String>,
    pub active: bool,
}

impl User {
    pub fn display_name(&self) -> &str {
        match self.username.is_empty() {
            true => "Anonymous",
            false => &self.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NotificationKind {
    Like { content: ContentRef, like_count: u32 },
    Comment { content: ContentRef, comment: String },
    Follow { followers: u32 },
    Gift { amount: Cents },
    Purchase { content: ContentRef, amount: Cents },
    Bookmark { content: ContentRef },
}

/// `actor` is whoever caused it; the recipient is the inbox owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(with = "crate::utils::uuid_as_str")]
    pub id: Uuid,
    pub actor: UserId,
    pub actor_name: String,
    pub kind: NotificationKind,
    pub note: String,
    pub created: Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmark {
    #[serde(with = "crate::utils::uuid_as_str")]
    pub id: Uuid,
    pub content: ContentSnapshot,
    pub note: String,
    pub created: Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartEntry {
    #[serde(with = "crate::utils::uuid_as_str")]
    pub id: Uuid,
    pub content: ContentSnapshot,
    pub added: Date,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportMessage {
    #[serde(with = "crate::utils::uuid_as_str")]
    pub id: Uuid,
    /// `false` when written by the support team.
    pub from_user: bool,
    pub read: bool,
    pub note: String,
    pub created: Date,
}

/// records appended by value into a per-user list document.
pub trait InboxItem:
    Clone + Send + Sync + Unpin + Serialize + ::serde::de::DeserializeOwned + fmt::Debug
{
    const BOX: &'static str;

    fn item_id(&self) -> Uuid;
}

impl InboxItem for Notification {
    const BOX: &'static str = "notifications";

    fn item_id(&self) -> Uuid { self.id }
}

impl InboxItem for Bookmark {
    const BOX: &'static str = "bookmarks";

    fn item_id(&self) -> Uuid { self.id }
}

impl InboxItem for CartEntry {
    const BOX: &'static str = "carts";

    fn item_id(&self) -> Uuid { self.id }
}

impl InboxItem for SupportMessage {
    const BOX: &'static str = "supports";

    fn item_id(&self) -> Uuid { self.id }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_hash_is_salted_and_verifies() {
        let a = UserId::from("a");
        let b = UserId::from("b");

        let ha = PinHash::derive(&a, "1234").unwrap();
        let hb = PinHash::derive(&b, "1234").unwrap();

        assert_ne!(ha, hb);
        assert!(ha.verify(&a, "1234"));
        assert!(!ha.verify(&a, "4321"));
        assert!(!ha.verify(&b, "1234"));
    }

    #[test]
    fn pin_must_be_four_digits() {
        let a = UserId::from("a");

        assert_eq!(PinHash::derive(&a, "123"), Err(InvalidPin));
        assert_eq!(PinHash::derive(&a, "12a4"), Err(InvalidPin));
        assert_eq!(PinHash::derive(&a, "12345"), Err(InvalidPin));
    }

    #[test]
    fn kind_and_plan_parse() {
        assert_eq!("Images".parse::<ContentKind>(), Ok(ContentKind::Image));
        assert_eq!("pro+".parse::<Plan>(), Ok(Plan::ProPlus));
        assert!("gold".parse::<Plan>().is_err());
    }

    #[test]
    fn notification_serializes_ids_as_strings() {
        let n = Notification {
            id: Uuid::new_v4(),
            actor: UserId::from("a"),
            actor_name: "@a".to_string(),
            kind: NotificationKind::Gift { amount: 100 },
            note: "gift".to_string(),
            created: Utc::now(),
        };

        let v = serde_json::to_value(&n).unwrap();
        assert_eq!(v["id"], serde_json::Value::String(n.id.to_string()));
        assert_eq!(v["kind"]["type"], "gift");

        let back: Notification = serde_json::from_value(v).unwrap();
        assert_eq!(back, n);
    }
}
