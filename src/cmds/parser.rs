use core::num::NonZeroU32;
use core::ops::Bound;
use std::collections::HashSet;

use regex::Regex;

use crate::entities::{ContentId, Plan, Pricing, UserId};
use crate::repositories::{ContentMutation, ContentQuery, UserQuery};
use crate::utils::{parse_cents, LetChain};

/// a row of the last loaded feed (1-based) or a content id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Row(u32),
    Id(ContentId),
}

pub fn parse_target(s: &str) -> ::core::result::Result<Target, String> {
    match s.parse::<NonZeroU32>() {
        Ok(n) => n.get().let_(Target::Row).let_(Ok),
        Err(_) => s
            .parse::<ContentId>()
            .map(Target::Id)
            .map_err(|e| format!("neither a row nor a content id: {}", e)),
    }
}

pub fn parse_nonzero_num(
    s: &str,
) -> ::core::result::Result<u32, <NonZeroU32 as ::core::str::FromStr>::Err> {
    Ok(s.parse::<::core::num::NonZeroU32>()?.get())
}

/// `3`, `3..`, `..10`, `3..10`, `3..=10`.
pub fn parse_range(s: &str) -> ::core::result::Result<(Bound<u32>, Bound<u32>), String> {
    let num = |t: &str| t.trim().parse::<u32>().map_err(|e| format!("{}: {:?}", e, t));

    let (start, end) = match s.split_once("..") {
        None => {
            let n = num(s)?;
            return Ok((Bound::Included(n), Bound::Included(n)));
        },
        Some(pair) => pair,
    };

    let start = match start.trim() {
        "" => Bound::Unbounded,
        t => Bound::Included(num(t)?),
    };
    let end = match end.strip_prefix('=') {
        Some(t) => Bound::Included(num(t)?),
        None => match end.trim() {
            "" => Bound::Unbounded,
            t => Bound::Excluded(num(t)?),
        },
    };

    Ok((start, end))
}

pub fn parse_user_query(s: &str) -> ::core::result::Result<UserQuery, String> {
    #[derive(::serde::Deserialize)]
    struct UserQueryModel<'a> {
        username: Option<&'a str>,
        email: Option<String>,
        plan: Option<&'a str>,
        followers: Option<HashSet<String>>,
        followers_num: Option<&'a str>,
    }

    // --- parsing json ---

    let UserQueryModel {
        username: username_raw,
        email,
        plan: plan_raw,
        followers: followers_raw,
        followers_num: followers_num_raw,
    } = serde_json::from_str(s).map_err(|e| e.to_string())?;

    // --- converting ---

    let username = username_raw
        .map(|s| Regex::new(s).map_err(|e| e.to_string()))
        .transpose()?;

    let plan = plan_raw.map(|s| s.parse::<Plan>()).transpose()?;

    let followers = followers_raw.map(|mut s| s.drain().map(UserId).collect());

    let followers_num = followers_num_raw.map(parse_range).transpose()?;

    // --- finalize ---

    Ok(UserQuery {
        username,
        email,
        plan,
        followers,
        followers_num,
    })
}

pub fn parse_content_query(s: &str) -> ::core::result::Result<ContentQuery, String> {
    #[derive(::serde::Deserialize)]
    struct ContentQueryModel<'a> {
        owner: Option<String>,
        title: Option<&'a str>,
        liked: Option<HashSet<String>>,
        liked_num: Option<&'a str>,
    }

    // --- parsing json ---

    let ContentQueryModel {
        owner: owner_raw,
        title: title_raw,
        liked: liked_raw,
        liked_num: liked_num_raw,
    } = serde_json::from_str(s).map_err(|e| e.to_string())?;

    // --- converting ---

    let owner = owner_raw.map(UserId);

    let title = title_raw
        .map(|s| Regex::new(s).map_err(|e| e.to_string()))
        .transpose()?;

    let liked = liked_raw.map(|mut s| s.drain().map(UserId).collect());

    let liked_num = liked_num_raw.map(parse_range).transpose()?;

    // --- finalize ---

    Ok(ContentQuery {
        kind: None,
        owner,
        title,
        liked,
        liked_num,
    })
}

pub fn parse_content_mutation(s: &str) -> ::core::result::Result<ContentMutation, String> {
    #[derive(::serde::Deserialize)]
    struct ContentMutationModel<'a> {
        title: Option<String>,
        description: Option<String>,
        price: Option<&'a str>,
    }

    // --- parsing json ---

    let ContentMutationModel {
        title,
        description,
        price: price_raw,
    } = serde_json::from_str(s).map_err(|e| e.to_string())?;

    // --- converting ---

    let pricing = price_raw
        .map(|s| match s.trim().eq_ignore_ascii_case("free") {
            true => Ok(Pricing::Free),
            false => parse_cents(s).map(Pricing::Paid),
        })
        .transpose()?;

    // --- finalize ---

    Ok(ContentMutation {
        title,
        description,
        pricing,
    })
}
