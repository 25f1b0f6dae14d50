use std::fmt::Display;

use clap::Parser;

use super::Response;
use crate::cmds::App;
use crate::entities::{
    Bookmark, CartEntry, Comment, Content, Notification, Pricing, SupportMessage, User,
};
use crate::feed::FeedRow;
use crate::handoff::DetailView;
use crate::interaction::{Optimistic, Phase};
use crate::repositories::Receipt;
use crate::utils::format_cents;

pub(crate) const PREFIX: &str = "mtemple";

pub(crate) enum Parsed {
    Command(App),
    /// help or version text.
    Showing(String),
    Error(String),
}

/// `None` for blank lines.
pub(crate) fn parse_line(line: &str) -> Option<Parsed> {
    let mut splitted = match shell_words::split(line) {
        Ok(o) => o,
        Err(e) => return Some(Parsed::Error(e.to_string())),
    };
    if splitted.is_empty() {
        return None;
    }
    if splitted[0] != PREFIX {
        splitted.insert(0, PREFIX.to_string());
    }

    let parsed = match App::try_parse_from(splitted) {
        Ok(app) => Parsed::Command(app),
        Err(e) => match e.kind() {
            clap::ErrorKind::DisplayHelp | clap::ErrorKind::DisplayVersion =>
                Parsed::Showing(e.to_string()),
            _ => Parsed::Error(e.to_string()),
        },
    };

    Some(parsed)
}

fn price_str(p: &Pricing) -> String {
    match p {
        Pricing::Free => "free".to_string(),
        Pricing::Paid(c) => format_cents(*c),
    }
}

fn field(name: impl Display, value: impl Display) -> (String, String) {
    (name.to_string(), value.to_string())
}

pub fn resp_from_user(
    title: impl Display,
    description: impl Display,
    rgb: (u8, u8, u8),
    user: User,
) -> Response {
    let User {
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
    } = user;

    Response {
        title: title.to_string(),
        rgb,
        description: description.to_string(),
        fields: vec![
            field("id", id),
            field("username", username),
            field("name", format!("{} {}", first_name, last_name).trim()),
            field("email", email),
            field("nationality", nationality),
            field("bio", bio),
            field("plan", format!("{} ({}s left)", plan, remaining_secs)),
            field("balance", format_cents(balance)),
            field("pin", if pin.is_some() { "set" } else { "not set" }),
            field("followers", followers.len()),
            field("followings", followings.len()),
            field(
                "posts",
                format!(
                    "quotes: {}, images: {}, videos: {}, ebooks: {}",
                    counts.quotes, counts.images, counts.videos, counts.ebooks
                ),
            ),
            field("picture", profile_pic.unwrap_or_else(|| "-".to_string())),
            field("active", active),
        ],
    }
}

pub fn resp_from_content(
    title: impl Display,
    description: impl Display,
    rgb: (u8, u8, u8),
    content: &Content,
) -> Response {
    let mut fields = vec![
        field("id", content.id),
        field("kind", content.kind),
        field("title", &content.title),
        field("owner", format!("{} ({})", content.owner_name, content.owner)),
        field("price", price_str(&content.pricing)),
        field("likes", content.like_count()),
        field("views", content.views()),
        field("comments", content.comments.len()),
    ];
    if !content.description.is_empty() {
        fields.push(field("description", &content.description));
    }
    if let Some(m) = &content.media {
        fields.push(field("media", m));
    }
    if let Some(s) = &content.creator_status {
        fields.push(field("creator", s));
    }

    Response {
        title: title.to_string(),
        rgb,
        description: description.to_string(),
        fields,
    }
}

/// `num` is the 1-based row number used by row targets.
pub fn field_from_row(num: usize, row: &Optimistic<FeedRow>) -> (String, String) {
    let FeedRow {
        content, is_liked, ..
    } = row.get();

    let heart = if *is_liked { "♥" } else { "♡" };
    let created = content
        .created
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());

    field(
        format!("[{}] {}", num, content.title),
        format!(
            "{} {} | {} | {} | {} | {}",
            heart,
            content.like_count(),
            content.owner_name,
            price_str(&content.pricing),
            created,
            content.id
        ),
    )
}

pub fn phase_str(phase: &Phase) -> String {
    match phase {
        Phase::Settled => "settled".to_string(),
        Phase::Pending => "pending".to_string(),
        Phase::Committed => "committed".to_string(),
        Phase::RolledBack { reason } => format!("rolled back: {}", reason),
    }
}

pub fn resp_from_detail(description: impl Display, rgb: (u8, u8, u8), detail: &DetailView) -> Response {
    let DetailView {
        handoff,
        comments,
        like_count,
        views,
        is_liked,
    } = detail;

    let mut fields = vec![
        field("id", handoff.reference.id),
        field("owner", &handoff.owner_name),
        field("price", price_str(&handoff.pricing)),
        field("likes", format!("{}{}", like_count, if *is_liked { " (liked)" } else { "" })),
        field("views", views),
    ];
    if !handoff.description.is_empty() {
        fields.push(field("description", &handoff.description));
    }
    if let Some(m) = &handoff.media {
        fields.push(field("media", m));
    }
    comments
        .iter()
        .for_each(|c| fields.push(field_from_comment(c)));

    Response {
        title: format!("{}: {}", handoff.reference.kind, handoff.title),
        rgb,
        description: description.to_string(),
        fields,
    }
}

pub fn field_from_comment(c: &Comment) -> (String, String) {
    field(
        format!("comment by {}", c.author_name),
        format!("{} ({})", c.body, c.id),
    )
}

pub fn field_from_notification(n: &Notification) -> (String, String) {
    field(n.created.format("%Y-%m-%d %H:%M"), &n.note)
}

pub fn field_from_bookmark(b: &Bookmark) -> (String, String) {
    let note = match b.note.is_empty() {
        true => String::new(),
        false => format!(" | {}", b.note),
    };

    field(
        format!("{} \"{}\"", b.content.reference.kind, b.content.title),
        format!("{} | {}{} ({})", b.content.owner_name, price_str(&b.content.pricing), note, b.id),
    )
}

pub fn field_from_cart(e: &CartEntry) -> (String, String) {
    field(
        format!("{} \"{}\"", e.content.reference.kind, e.content.title),
        format!("{} | {} ({})", e.content.owner_name, price_str(&e.content.pricing), e.id),
    )
}

pub fn field_from_support(m: &SupportMessage) -> (String, String) {
    let who = match m.from_user {
        true => "you",
        false => "support",
    };

    field(
        format!("{} {}", who, m.created.format("%H:%M")),
        format!("{}{}", m.note, if m.read { "" } else { " (unread)" }),
    )
}

pub fn fields_from_receipt(r: &Receipt) -> Vec<(String, String)> {
    let mut fields = vec![
        field("amount", format_cents(r.amount)),
        field(
            "balance",
            format!("{} -> {}", format_cents(r.from_before), format_cents(r.from_after)),
        ),
    ];
    if r.replayed {
        fields.push(field("replayed", true));
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmds::RootMod;

    #[test]
    fn prefix_is_optional() {
        let with = parse_line("mtemple route /plan");
        let without = parse_line("route /plan");

        for p in [with, without] {
            match p {
                Some(Parsed::Command(App {
                    cmd: RootMod::Route { path },
                })) => assert_eq!(path, "/plan"),
                _ => panic!("not a route command"),
            }
        }
    }

    #[test]
    fn blank_and_bad_lines() {
        assert!(parse_line("   ").is_none());
        assert!(matches!(parse_line("nonsense"), Some(Parsed::Error(_))));
        assert!(matches!(parse_line("--help"), Some(Parsed::Showing(_))));
        assert!(matches!(parse_line("\"unclosed"), Some(Parsed::Error(_))));
    }
}
