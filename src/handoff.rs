use crate::entities::{Comment, Content, ContentRef, Date, Pricing};
use crate::feed::FeedRow;

/// what a feed row passes on to its detail view. the detail view trusts these
/// fields and only re-reads comments and counters.
#[derive(Debug, Clone, PartialEq)]
pub struct Handoff {
    pub reference: ContentRef,
    pub title: String,
    pub description: String,
    pub owner_name: String,
    pub pricing: Pricing,
    pub media: Option<String>,
    pub creator_status: Option<String>,
    pub like_count: u32,
    pub views: u32,
    pub created: Option<Date>,
}

impl Handoff {
    pub fn from_content(c: &Content) -> Self {
        Self {
            reference: c.reference(),
            title: c.title.clone(),
            description: c.description.clone(),
            owner_name: c.owner_name.clone(),
            pricing: c.pricing,
            media: c.media.clone(),
            creator_status: c.creator_status.clone(),
            like_count: c.like_count(),
            views: c.views(),
            created: c.created,
        }
    }
}

impl From<&FeedRow> for Handoff {
    fn from(row: &FeedRow) -> Self { Self::from_content(&row.content) }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailView {
    pub handoff: Handoff,
    pub comments: Vec<Comment>,
    pub like_count: u32,
    pub views: u32,
    pub is_liked: bool,
}

impl DetailView {
    /// merges the fresh counters into the handed-off fields.
    pub fn refresh(handoff: Handoff, fresh: &Content, is_liked: bool) -> Self {
        Self {
            comments: fresh.comments.clone(),
            like_count: fresh.like_count(),
            views: fresh.views(),
            is_liked,
            handoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ContentKind, UserId};
    use crate::feed::build_rows;
    use crate::repositories::mock::tests::content;

    #[test]
    fn detail_keeps_handoff_and_takes_fresh_counters() {
        let c = content("owner", ContentKind::Video, "clip");
        let row = build_rows(vec![c.clone()], None).remove(0);
        let handoff = Handoff::from(&row);

        let mut fresh = c;
        fresh.title = "renamed".to_string();
        fresh.liked_by.insert(UserId::from("x"));
        fresh.viewed_by.insert(UserId::from("y"));

        let view = DetailView::refresh(handoff, &fresh, false);
        assert_eq!(view.handoff.title, "clip");
        assert_eq!(view.like_count, 1);
        assert_eq!(view.views, 1);
    }
}
