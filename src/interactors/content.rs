use std::collections::HashSet;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{content_err_fmt, display_name, notify, user_err_fmt, Services};
use crate::blob::media_path;
use crate::entities::{
    Comment, CommentId, Content, ContentId, ContentKind, NotificationKind, Pricing, UserId,
};
use crate::feed::build_rows;
use crate::handoff::{DetailView, Handoff};
use crate::repositories::ContentQuery;
use crate::usecases::content::{
    comment, delete_comment, edit, feed, like, mine, post, report, report_comment, view, withdraw,
};
use crate::utils::{AlsoChain, LetChain};

pub struct ContentInteractor {
    pub services: Services,
}

fn article(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Image | ContentKind::Ebook => "An",
        ContentKind::Quote | ContentKind::Video => "A",
    }
}

fn check_pricing(pricing: &Pricing) -> Result<()> {
    if let Pricing::Paid(c) = pricing {
        if *c <= 0 {
            bail!("price must be greater than $0.00");
        }
    }

    Ok(())
}

impl ContentInteractor {
    async fn find_owned(&self, owner: &UserId, id: ContentId) -> Result<Content> {
        let content = self
            .services
            .contents
            .find(id)
            .await
            .map_err(content_err_fmt)?;
        if &content.owner != owner {
            bail!("you are not the owner of this {}.", content.kind);
        }

        Ok(content)
    }
}

#[async_trait]
impl post::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self, data), fields(owner = %data.owner, kind = %data.kind))]
    async fn handle(&self, data: post::Input) -> Result<post::Output> {
        let post::Input {
            owner,
            email,
            kind,
            title,
            description,
            pricing,
            creator_status,
            upload,
        } = data;

        if title.trim().is_empty() {
            bail!("title is required");
        }
        check_pricing(&pricing)?;

        let (media, size) = match (kind, upload) {
            (ContentKind::Quote, _) => (None, None),
            (_, None) => bail!("Please select a file to upload"),
            (_, Some(upload)) => {
                let size = upload.bytes.len() as u64;
                let path = media_path(&email, kind, &upload.name);
                let url = self.services.blobs.upload(&path, upload.bytes).await?;
                tracing::debug!("uploaded {}", url);
                (Some(path), Some(size))
            },
        };

        let owner_name = self
            .services
            .users
            .find(&owner)
            .await
            .map_err(user_err_fmt)?
            .display_name()
            .to_string();

        let new_content = Content {
            id: ContentId::new(),
            kind,
            owner: owner.clone(),
            owner_name,
            title: title.trim().to_string(),
            description,
            media,
            size,
            pricing,
            creator_status,
            liked_by: HashSet::new(),
            reported_by: HashSet::new(),
            viewed_by: HashSet::new(),
            comments: vec![],
            created: Some(Utc::now()),
        };

        let can_insert = self
            .services
            .contents
            .insert(new_content.clone())
            .await
            .map_err(content_err_fmt)?;
        if !can_insert {
            bail!("content already exists.");
        }

        self.services
            .users
            .adjust_count(&owner, kind, 1)
            .await
            .map_err(user_err_fmt)?;

        post::Output {
            content: new_content,
        }
        .also_(|o| tracing::trace!("output - {:?}", o))
        .let_(Ok)
    }
}

#[async_trait]
impl feed::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: feed::Input) -> Result<feed::Output> {
        let feed::Input {
            kind,
            viewer,
            query,
        } = data;

        let items = self
            .services
            .contents
            .finds(ContentQuery {
                kind: Some(kind),
                ..query
            })
            .await
            .map_err(content_err_fmt)?;

        feed::Output {
            rows: build_rows(items, viewer.as_ref()),
        }
        .also_(|o| tracing::trace!("loaded {} rows", o.rows.len()))
        .let_(Ok)
    }
}

#[async_trait]
impl mine::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: mine::Input) -> Result<mine::Output> {
        let mine::Input { owner, kind } = data;

        self.services
            .contents
            .finds(ContentQuery {
                kind: Some(kind),
                owner: Some(owner.clone()),
                ..Default::default()
            })
            .await
            .map_err(content_err_fmt)?
            .let_(|items| build_rows(items, Some(&owner)))
            .into_iter()
            .map(|r| r.content)
            .collect::<Vec<_>>()
            .let_(|items| mine::Output { items })
            .let_(Ok)
    }
}

#[async_trait]
impl view::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: view::Input) -> Result<view::Output> {
        let view::Input {
            viewer,
            handoff,
            content_id,
        } = data;

        let id = match (&handoff, content_id) {
            (Some(h), _) => h.reference.id,
            (None, Some(id)) => id,
            (None, None) => bail!("missing navigation state"),
        };

        if let Some(v) = &viewer {
            let first = self
                .services
                .contents
                .insert_viewed(id, v)
                .await
                .map_err(content_err_fmt)?;
            tracing::trace!("first view: {}", first);
        }

        let fresh = self
            .services
            .contents
            .find(id)
            .await
            .map_err(content_err_fmt)?;
        let is_liked = viewer
            .as_ref()
            .map(|v| fresh.liked_by.contains(v))
            .unwrap_or(false);
        let handoff = handoff.unwrap_or_else(|| Handoff::from_content(&fresh));

        view::Output {
            detail: DetailView::refresh(handoff, &fresh, is_liked),
        }
        .let_(Ok)
    }
}

#[async_trait]
impl edit::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: edit::Input) -> Result<edit::Output> {
        let edit::Input {
            owner,
            content_id,
            mutation,
        } = data;

        if let Some(t) = &mutation.title {
            if t.trim().is_empty() {
                bail!("title is required");
            }
        }
        if let Some(p) = &mutation.pricing {
            check_pricing(p)?;
        }

        self.find_owned(&owner, content_id).await?;

        self.services
            .contents
            .update(content_id, mutation)
            .await
            .map_err(content_err_fmt)?
            .let_(|content| edit::Output { content })
            .let_(Ok)
    }
}

#[async_trait]
impl like::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: like::Input) -> Result<like::Output> {
        let like::Input { actor, content_id } = data;

        let contents = &self.services.contents;
        let was_liked = contents
            .is_liked(content_id, &actor)
            .await
            .map_err(content_err_fmt)?;

        let changed = match was_liked {
            true => contents.delete_liked(content_id, &actor).await,
            false => contents.insert_liked(content_id, &actor).await,
        }
        .map_err(content_err_fmt)?;

        let content = contents.find(content_id).await.map_err(content_err_fmt)?;
        let liked = content.liked_by.contains(&actor);

        if changed && liked && content.owner != actor {
            let name = display_name(&self.services, &actor).await;
            notify(
                &self.services,
                &content.owner,
                &actor,
                &name,
                NotificationKind::Like {
                    content: content.reference(),
                    like_count: content.like_count(),
                },
                format!("{} liked your {} \"{}\"", name, content.kind, content.title),
            )
            .await;
        }

        like::Output { content, liked }
            .also_(|o| tracing::trace!("liked: {}, count: {}", o.liked, o.content.like_count()))
            .let_(Ok)
    }
}

#[async_trait]
impl report::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: report::Input) -> Result<report::Output> {
        let report::Input { actor, content_id } = data;

        let first = self
            .services
            .contents
            .insert_reported(content_id, &actor)
            .await
            .map_err(content_err_fmt)?;
        let content = self
            .services
            .contents
            .find(content_id)
            .await
            .map_err(content_err_fmt)?;

        if first {
            let reporter = display_name(&self.services, &actor).await;
            let subject = match content.kind {
                ContentKind::Quote => format!("A quote saying \"{}\"", content.title),
                k => format!("{} {} titled \"{}\"", article(k), k, content.title),
            };
            self.services
                .alerts
                .send(format!(
                    "{} was reported. The owner of the post is {}, and it was reported by {}.",
                    subject, content.owner_name, reporter
                ))
                .await;
        }

        Ok(report::Output { content, first })
    }
}

#[async_trait]
impl comment::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: comment::Input) -> Result<comment::Output> {
        let comment::Input {
            actor,
            content_id,
            body,
        } = data;

        let body = body.trim().to_string();
        if body.is_empty() {
            bail!("comment cannot be empty");
        }

        let content = self
            .services
            .contents
            .find(content_id)
            .await
            .map_err(content_err_fmt)?;
        let name = display_name(&self.services, &actor).await;

        let new_comment = Comment {
            id: CommentId(Uuid::new_v4()),
            author: actor.clone(),
            author_name: name.clone(),
            body: body.clone(),
            reported_by: HashSet::new(),
            created: Utc::now(),
        };
        self.services
            .contents
            .insert_comment(content_id, new_comment.clone())
            .await
            .map_err(content_err_fmt)?;

        if content.owner != actor {
            notify(
                &self.services,
                &content.owner,
                &actor,
                &name,
                NotificationKind::Comment {
                    content: content.reference(),
                    comment: body,
                },
                format!(
                    "{} commented on your {} \"{}\"",
                    name, content.kind, content.title
                ),
            )
            .await;
        }

        Ok(comment::Output {
            comment: new_comment,
        })
    }
}

#[async_trait]
impl delete_comment::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: delete_comment::Input) -> Result<delete_comment::Output> {
        let delete_comment::Input {
            actor,
            content_id,
            comment_id,
        } = data;

        let content = self
            .services
            .contents
            .find(content_id)
            .await
            .map_err(content_err_fmt)?;
        match content.comments.iter().find(|c| c.id == comment_id) {
            None => bail!("cannot find comment."),
            Some(c) if c.author != actor => bail!("you can only delete your own comment."),
            Some(_) => (),
        }

        self.services
            .contents
            .delete_comment(content_id, comment_id)
            .await
            .map_err(content_err_fmt)?
            .let_(|comment| delete_comment::Output { comment })
            .let_(Ok)
    }
}

#[async_trait]
impl report_comment::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: report_comment::Input) -> Result<report_comment::Output> {
        let report_comment::Input {
            actor,
            content_id,
            comment_id,
        } = data;

        let content = self
            .services
            .contents
            .find(content_id)
            .await
            .map_err(content_err_fmt)?;
        let target = match content.comments.iter().find(|c| c.id == comment_id) {
            Some(c) => c.clone(),
            None => bail!("cannot find comment."),
        };

        let first = self
            .services
            .contents
            .insert_comment_reported(content_id, comment_id, &actor)
            .await
            .map_err(content_err_fmt)?;

        if first {
            let reporter = display_name(&self.services, &actor).await;
            self.services
                .alerts
                .send(format!(
                    "Report: Under the {} \"{}\" by {}, a comment saying \"{}\" was reported. The \
                     owner of the comment is {} and it was reported by {}.",
                    content.kind,
                    content.title,
                    content.owner_name,
                    target.body,
                    target.author_name,
                    reporter
                ))
                .await;
        }

        Ok(report_comment::Output { first })
    }
}

#[async_trait]
impl withdraw::Usecase for ContentInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: withdraw::Input) -> Result<withdraw::Output> {
        let withdraw::Input { owner, content_id } = data;

        self.find_owned(&owner, content_id).await?;

        let content = self
            .services
            .contents
            .delete(content_id)
            .await
            .map_err(content_err_fmt)?;
        self.services
            .users
            .adjust_count(&owner, content.kind, -1)
            .await
            .map_err(user_err_fmt)?;

        withdraw::Output { content }
            .also_(|o| tracing::trace!("output - {:?}", o))
            .let_(Ok)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use futures::future::join_all;

    use super::*;
    use crate::interactors::tests::Fixture;
    use crate::repositories::mock::tests::content;
    use crate::repositories::{ContentRepository, InboxRepository, UserRepository};
    use crate::usecases::content::Upload;

    fn interactor(fx: &Fixture) -> ContentInteractor {
        ContentInteractor {
            services: fx.services.clone(),
        }
    }

    async fn toggle(i: &ContentInteractor, actor: &UserId, id: ContentId) -> like::Output {
        like::Usecase::handle(i, like::Input {
            actor: actor.clone(),
            content_id: id,
        })
        .await
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_likes_are_all_counted() {
        let fx = Fixture::new();
        let i = Arc::new(interactor(&fx));
        fx.user("owner", 0).await;
        let id = fx.content(content("owner", ContentKind::Quote, "crowd")).await;

        let mut fans = vec![];
        for n in 0..12 {
            fans.push(fx.user(&format!("fan{}", n), 0).await);
        }

        let tasks = fans.iter().cloned().map(|actor| {
            let i = i.clone();
            tokio::spawn(async move { toggle(&i, &actor, id).await.liked })
        });
        for liked in join_all(tasks).await {
            assert!(liked.unwrap());
        }

        let stored = ContentRepository::find(&*fx.contents, id).await.unwrap();
        assert_eq!(stored.like_count(), fans.len() as u32);
        assert!(fans.iter().all(|f| stored.liked_by.contains(f)));

        let inbox = fx.notifications.list(&UserId::from("owner")).await.unwrap();
        assert_eq!(inbox.len(), fans.len());
    }

    #[tokio::test]
    async fn like_then_unlike() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;
        let b = fx.user("b", 0).await;
        let id = fx.content(content("b", ContentKind::Image, "sunset")).await;

        let liked = toggle(&i, &a, id).await;
        assert!(liked.liked);
        assert_eq!(liked.content.liked_by, HashSet::from([a.clone()]));
        assert_eq!(liked.content.like_count(), 1);

        let inbox = fx.notifications.list(&b).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].actor, a);
        assert_eq!(inbox[0].note, "@a liked your image \"sunset\"");
        assert_eq!(inbox[0].kind, NotificationKind::Like {
            content: liked.content.reference(),
            like_count: 1,
        });

        let unliked = toggle(&i, &a, id).await;
        assert!(!unliked.liked);
        assert!(unliked.content.liked_by.is_empty());
        assert_eq!(unliked.content.like_count(), 0);
        assert_eq!(fx.notifications.list(&b).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn self_like_is_silent() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let b = fx.user("b", 0).await;
        let id = fx.content(content("b", ContentKind::Quote, "hello")).await;

        assert!(toggle(&i, &b, id).await.liked);
        assert!(fx.notifications.list(&b).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn like_by_profileless_actor_reads_anonymous() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let b = fx.user("b", 0).await;
        let id = fx.content(content("b", ContentKind::Video, "clip")).await;

        toggle(&i, &UserId::from("ghost"), id).await;
        let inbox = fx.notifications.list(&b).await.unwrap();
        assert_eq!(inbox[0].actor_name, "Anonymous");
    }

    #[tokio::test]
    async fn report_alerts_once() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;
        fx.user("b", 0).await;
        let id = fx.content(content("b", ContentKind::Image, "sunset")).await;

        for _ in 0..2 {
            report::Usecase::handle(&i, report::Input {
                actor: a.clone(),
                content_id: id,
            })
            .await
            .unwrap();
        }

        assert_eq!(fx.alerts.messages().await, [
            "An image titled \"sunset\" was reported. The owner of the post is @b, and it was \
             reported by @a."
        ]);
        assert_eq!(fx.contents.find(id).await.unwrap().report_count(), 1);
    }

    #[tokio::test]
    async fn post_uploads_and_counts() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;

        let out = post::Usecase::handle(&i, post::Input {
            owner: a.clone(),
            email: "a@example.com".to_string(),
            kind: ContentKind::Ebook,
            title: "Guide".to_string(),
            description: "a guide".to_string(),
            pricing: Pricing::Paid(1_500),
            creator_status: None,
            upload: Some(Upload {
                name: "guide.pdf".to_string(),
                bytes: vec![1, 2, 3],
            }),
        })
        .await
        .unwrap();

        assert_eq!(
            out.content.media.as_deref(),
            Some("a@example.com/ebook/guide.pdf")
        );
        assert_eq!(out.content.size, Some(3));
        assert_eq!(
            fx.blobs.get("a@example.com/ebook/guide.pdf").await,
            Some(vec![1, 2, 3])
        );
        assert_eq!(fx.users.find(&a).await.unwrap().counts.ebooks, 1);

        withdraw::Usecase::handle(&i, withdraw::Input {
            owner: a.clone(),
            content_id: out.content.id,
        })
        .await
        .unwrap();
        assert_eq!(fx.users.find(&a).await.unwrap().counts.ebooks, 0);
    }

    #[tokio::test]
    async fn media_post_needs_a_file() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;

        let res = post::Usecase::handle(&i, post::Input {
            owner: a,
            email: "a@example.com".to_string(),
            kind: ContentKind::Video,
            title: "clip".to_string(),
            description: String::new(),
            pricing: Pricing::Free,
            creator_status: None,
            upload: None,
        })
        .await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn deleting_keeps_other_references() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;
        let first = fx.content(content("a", ContentKind::Image, "one")).await;
        let second = fx.content(content("a", ContentKind::Image, "two")).await;

        let rows = feed::Usecase::handle(&i, feed::Input {
            kind: ContentKind::Image,
            viewer: None,
            query: ContentQuery::default(),
        })
        .await
        .unwrap()
        .rows;
        let kept = rows
            .iter()
            .find(|r| r.reference.id == second)
            .map(Handoff::from)
            .unwrap();

        withdraw::Usecase::handle(&i, withdraw::Input {
            owner: a.clone(),
            content_id: first,
        })
        .await
        .unwrap();

        let detail = view::Usecase::handle(&i, view::Input {
            viewer: Some(a.clone()),
            handoff: Some(kept),
            content_id: None,
        })
        .await
        .unwrap()
        .detail;
        assert_eq!(detail.handoff.title, "two");
        assert_eq!(detail.views, 1);

        let gone = view::Usecase::handle(&i, view::Input {
            viewer: None,
            handoff: None,
            content_id: Some(first),
        })
        .await;
        assert_eq!(gone.unwrap_err().to_string(), "cannot find content.");
    }

    #[tokio::test]
    async fn view_without_state_fails() {
        let fx = Fixture::new();
        let i = interactor(&fx);

        let res = view::Usecase::handle(&i, view::Input {
            viewer: None,
            handoff: None,
            content_id: None,
        })
        .await;
        assert_eq!(res.unwrap_err().to_string(), "missing navigation state");
    }

    #[tokio::test]
    async fn comments_notify_and_only_author_deletes() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;
        let b = fx.user("b", 0).await;
        let id = fx.content(content("b", ContentKind::Image, "sunset")).await;

        let c = comment::Usecase::handle(&i, comment::Input {
            actor: a.clone(),
            content_id: id,
            body: "nice".to_string(),
        })
        .await
        .unwrap()
        .comment;
        assert_eq!(
            fx.notifications.list(&b).await.unwrap()[0].note,
            "@a commented on your image \"sunset\""
        );

        let first = report_comment::Usecase::handle(&i, report_comment::Input {
            actor: b.clone(),
            content_id: id,
            comment_id: c.id,
        })
        .await
        .unwrap()
        .first;
        let again = report_comment::Usecase::handle(&i, report_comment::Input {
            actor: b.clone(),
            content_id: id,
            comment_id: c.id,
        })
        .await
        .unwrap()
        .first;
        assert!(first && !again);
        assert_eq!(fx.alerts.messages().await.len(), 1);

        assert!(delete_comment::Usecase::handle(&i, delete_comment::Input {
            actor: b.clone(),
            content_id: id,
            comment_id: c.id,
        })
        .await
        .is_err());
        delete_comment::Usecase::handle(&i, delete_comment::Input {
            actor: a.clone(),
            content_id: id,
            comment_id: c.id,
        })
        .await
        .unwrap();
        assert!(fx.contents.find(id).await.unwrap().comments.is_empty());
    }

    #[tokio::test]
    async fn only_owner_edits() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;
        fx.user("b", 0).await;
        let id = fx.content(content("b", ContentKind::Quote, "hello")).await;

        let res = edit::Usecase::handle(&i, edit::Input {
            owner: a,
            content_id: id,
            mutation: crate::repositories::ContentMutation {
                title: Some("mine now".to_string()),
                ..Default::default()
            },
        })
        .await;
        assert!(res.is_err());
        assert_eq!(fx.contents.find(id).await.unwrap().title, "hello");
    }
}
