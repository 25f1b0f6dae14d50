use std::ops::Bound;

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Bson, Document};

use super::converters::malformed;
use super::models::{
    MongoCommentModel, MongoContentModel, MongoCountsModel, MongoLedgerModel, MongoUserModel,
};
use super::{
    ContentMutation, ContentQuery, LetChain, Receipt, RepositoryError, UserMutation, UserQuery,
};
use crate::entities::{
    Comment, Content, ContentCounts, ContentId, Date, PinHash, Pricing, User, UserId,
};
use crate::repositories::IdempotencyKey;

fn bound_doc((g, l): (Bound<u32>, Bound<u32>)) -> Document {
    let mut q = doc! {};

    match g {
        Bound::Unbounded => (),
        Bound::Included(n) => q.insert("$gte", n).let_(::core::mem::drop),
        Bound::Excluded(n) => q.insert("$gt", n).let_(::core::mem::drop),
    }

    match l {
        Bound::Unbounded => (),
        Bound::Included(n) => q.insert("$lte", n).let_(::core::mem::drop),
        Bound::Excluded(n) => q.insert("$lt", n).let_(::core::mem::drop),
    }

    q
}

fn pricing_bson(p: Pricing) -> Bson {
    match p {
        Pricing::Free => Bson::Null,
        Pricing::Paid(c) => Bson::Int64(c),
    }
}

fn parse_date(raw: &str) -> Result<Date, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| malformed("date", raw))
}

fn ids(set: impl IntoIterator<Item = UserId>) -> ::std::collections::HashSet<String> {
    set.into_iter().map(|u| u.0).collect()
}

impl From<UserQuery> for Document {
    fn from(
        UserQuery {
            username,
            email,
            plan,
            followers,
            followers_num,
        }: UserQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(r) = username {
            query.insert("username", doc! { "$regex": r.as_str() });
        }

        if let Some(e) = email {
            query.insert("email", e);
        }

        if let Some(p) = plan {
            query.insert("plan", p.as_str());
        }

        if let Some(set_raw) = followers {
            if !set_raw.is_empty() {
                let set = set_raw.into_iter().map(|i| i.0).collect::<Vec<_>>();
                query.insert("followers", doc! { "$all": set });
            }
        }

        if let Some(range) = followers_num {
            let q = bound_doc(range);
            if !q.is_empty() {
                query.insert("followers_size", q);
            }
        }

        query
    }
}

impl From<ContentQuery> for Document {
    fn from(
        ContentQuery {
            kind,
            owner,
            title,
            liked,
            liked_num,
        }: ContentQuery,
    ) -> Self {
        let mut query = doc! {};

        if let Some(k) = kind {
            query.insert("kind", k.as_str());
        }

        if let Some(o) = owner {
            query.insert("owner", o.0);
        }

        if let Some(r) = title {
            query.insert("title", doc! { "$regex": r.as_str() });
        }

        if let Some(set_raw) = liked {
            if !set_raw.is_empty() {
                let set = set_raw.into_iter().map(|i| i.0).collect::<Vec<_>>();
                query.insert("liked_by", doc! { "$all": set });
            }
        }

        if let Some(range) = liked_num {
            let q = bound_doc(range);
            if !q.is_empty() {
                query.insert("liked_by_size", q);
            }
        }

        query
    }
}

impl From<UserMutation> for Document {
    fn from(
        UserMutation {
            username,
            bio,
            pin,
            profile_pic,
            plan,
            remaining_secs,
        }: UserMutation,
    ) -> Self {
        let mut mutation = doc! {};

        if let Some(val) = username {
            mutation.insert("username", val);
        }
        if let Some(val) = bio {
            mutation.insert("bio", val);
        }
        if let Some(val) = pin {
            mutation.insert("pin", val.0);
        }
        if let Some(val) = profile_pic {
            mutation.insert("profile_pic", val);
        }
        if let Some(val) = plan {
            mutation.insert("plan", val.as_str());
        }
        if let Some(val) = remaining_secs {
            mutation.insert("remaining_secs", val as i64);
        }

        mutation
    }
}

impl From<ContentMutation> for Document {
    fn from(
        ContentMutation {
            title,
            description,
            pricing,
        }: ContentMutation,
    ) -> Self {
        let mut mutation = doc! {};

        if let Some(val) = title {
            mutation.insert("title", val);
        }
        if let Some(val) = description {
            mutation.insert("description", val);
        }
        if let Some(val) = pricing {
            mutation.insert("price", pricing_bson(val));
        }

        mutation
    }
}

impl From<User> for MongoUserModel {
    fn from(
        User {
            id,
            email,
            first_name,
            last_name,
            nationality,
            username,
            bio,
            plan,
            remaining_secs,
            balance,
            pin,
            followers,
            followings,
            counts,
            profile_pic,
            active,
        }: User,
    ) -> Self {
        MongoUserModel {
            id: id.0,
            email,
            first_name,
            last_name,
            nationality,
            username,
            bio,
            plan,
            remaining_secs: remaining_secs as i64,
            balance,
            pin: pin.map(|p| p.0),
            followers_size: followers.len() as i64,
            followers: ids(followers),
            followings_size: followings.len() as i64,
            followings: ids(followings),
            counts: MongoCountsModel {
                quotes: counts.quotes as i64,
                images: counts.images as i64,
                videos: counts.videos as i64,
                ebooks: counts.ebooks as i64,
            },
            profile_pic,
            active,
        }
    }
}

impl From<MongoUserModel> for User {
    fn from(
        MongoUserModel {
            id,
            email,
            first_name,
            last_name,
            nationality,
            username,
            bio,
            plan,
            remaining_secs,
            balance,
            pin,
            followers,
            followers_size: _,
            followings,
            followings_size: _,
            counts,
            profile_pic,
            active,
        }: MongoUserModel,
    ) -> Self {
        User {
            id: UserId(id),
            email,
            first_name,
            last_name,
            nationality,
            username,
            bio,
            plan,
            remaining_secs: remaining_secs.max(0) as u64,
            balance,
            pin: pin.map(PinHash),
            followers: followers.into_iter().map(UserId).collect(),
            followings: followings.into_iter().map(UserId).collect(),
            counts: ContentCounts {
                quotes: counts.quotes.max(0) as u32,
                images: counts.images.max(0) as u32,
                videos: counts.videos.max(0) as u32,
                ebooks: counts.ebooks.max(0) as u32,
            },
            profile_pic,
            active,
        }
    }
}

impl From<Comment> for MongoCommentModel {
    fn from(
        Comment {
            id,
            author,
            author_name,
            body,
            reported_by,
            created,
        }: Comment,
    ) -> Self {
        MongoCommentModel {
            id: id.to_string(),
            author: author.0,
            author_name,
            body,
            reported_by: ids(reported_by),
            created: created.to_rfc3339(),
        }
    }
}

impl TryFrom<MongoCommentModel> for Comment {
    type Error = RepositoryError;

    fn try_from(
        MongoCommentModel {
            id,
            author,
            author_name,
            body,
            reported_by,
            created,
        }: MongoCommentModel,
    ) -> Result<Self, Self::Error> {
        Ok(Comment {
            id: id.parse().map_err(|_| malformed("comment id", &id))?,
            author: UserId(author),
            author_name,
            body,
            reported_by: reported_by.into_iter().map(UserId).collect(),
            created: parse_date(&created)?,
        })
    }
}

impl From<Content> for MongoContentModel {
    fn from(
        Content {
            id,
            kind,
            owner,
            owner_name,
            title,
            description,
            media,
            size,
            pricing,
            creator_status,
            liked_by,
            reported_by,
            viewed_by,
            comments,
            created,
        }: Content,
    ) -> Self {
        MongoContentModel {
            id: id.to_string(),
            kind,
            owner: owner.0,
            owner_name,
            title,
            description,
            media,
            size: size.map(|s| s as i64),
            price: match pricing {
                Pricing::Free => None,
                Pricing::Paid(c) => Some(c),
            },
            creator_status,
            liked_by_size: liked_by.len() as i64,
            liked_by: ids(liked_by),
            reported_by_size: reported_by.len() as i64,
            reported_by: ids(reported_by),
            viewed_by_size: viewed_by.len() as i64,
            viewed_by: ids(viewed_by),
            comments: comments.into_iter().map(Into::into).collect(),
            created: created.map(|d| d.to_rfc3339()),
        }
    }
}

impl TryFrom<MongoContentModel> for Content {
    type Error = RepositoryError;

    fn try_from(
        MongoContentModel {
            id,
            kind,
            owner,
            owner_name,
            title,
            description,
            media,
            size,
            price,
            creator_status,
            liked_by,
            liked_by_size: _,
            reported_by,
            reported_by_size: _,
            viewed_by,
            viewed_by_size: _,
            comments,
            created,
        }: MongoContentModel,
    ) -> Result<Self, Self::Error> {
        Ok(Content {
            id: id
                .parse::<ContentId>()
                .map_err(|_| malformed("content id", &id))?,
            kind,
            owner: UserId(owner),
            owner_name,
            title,
            description,
            media,
            size: size.map(|s| s.max(0) as u64),
            pricing: match price {
                Some(c) => Pricing::Paid(c),
                None => Pricing::Free,
            },
            creator_status,
            liked_by: liked_by.into_iter().map(UserId).collect(),
            reported_by: reported_by.into_iter().map(UserId).collect(),
            viewed_by: viewed_by.into_iter().map(UserId).collect(),
            comments: comments
                .into_iter()
                .map(Comment::try_from)
                .collect::<Result<_, _>>()?,
            // older documents may lack a creation time; they sort last.
            created: match created {
                Some(raw) => parse_date(&raw).ok(),
                None => None,
            },
        })
    }
}

impl From<&Receipt> for MongoLedgerModel {
    fn from(r: &Receipt) -> Self {
        MongoLedgerModel {
            key: r.key.0.clone(),
            amount: r.amount,
            from_before: r.from_before,
            from_after: r.from_after,
            to_before: r.to_before,
            to_after: r.to_after,
            settled: Utc::now().to_rfc3339(),
        }
    }
}

impl From<MongoLedgerModel> for Receipt {
    fn from(
        MongoLedgerModel {
            key,
            amount,
            from_before,
            from_after,
            to_before,
            to_after,
            settled: _,
        }: MongoLedgerModel,
    ) -> Self {
        Receipt {
            key: IdempotencyKey(key),
            amount,
            from_before,
            from_after,
            to_before,
            to_after,
            replayed: false,
        }
    }
}
