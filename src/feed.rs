use std::cmp::Ordering;

use crate::entities::{Content, ContentRef, UserId};

#[derive(Debug, Clone, PartialEq)]
pub struct FeedRow {
    pub reference: ContentRef,
    pub content: Content,
    pub is_liked: bool,
}

/// tags every item with its reference and the viewer's like, newest first.
/// items without a timestamp go last; ties keep store order.
pub fn build_rows(items: Vec<Content>, viewer: Option<&UserId>) -> Vec<FeedRow> {
    let mut rows = items
        .into_iter()
        .map(|content| FeedRow {
            reference: content.reference(),
            is_liked: viewer
                .map(|v| content.liked_by.contains(v))
                .unwrap_or(false),
            content,
        })
        .collect::<Vec<_>>();

    rows.sort_by(|a, b| recency(&a.content, &b.content));
    rows
}

fn recency(a: &Content, b: &Content) -> Ordering {
    match (&a.created, &b.created) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::entities::ContentKind;
    use crate::repositories::mock::tests::content;

    #[test]
    fn newest_first_and_undated_last() {
        let now = Utc::now();
        let mut old = content("a", ContentKind::Image, "old");
        old.created = Some(now - Duration::hours(1));
        let mut new = content("b", ContentKind::Image, "new");
        new.created = Some(now);
        let mut undated = content("c", ContentKind::Image, "undated");
        undated.created = None;

        let rows = build_rows(vec![undated, old, new], None);
        let titles = rows.iter().map(|r| r.content.title.as_str()).collect::<Vec<_>>();

        assert_eq!(titles, ["new", "old", "undated"]);
    }

    #[test]
    fn is_liked_is_per_viewer() {
        let me = UserId::from("me");
        let mut c = content("a", ContentKind::Quote, "q");
        c.liked_by.insert(me.clone());

        assert!(build_rows(vec![c.clone()], Some(&me))[0].is_liked);
        assert!(!build_rows(vec![c.clone()], Some(&UserId::from("you")))[0].is_liked);
        assert!(!build_rows(vec![c], None)[0].is_liked);
    }
}
