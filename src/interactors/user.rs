use std::collections::HashSet;

use anyhow::{bail, Result};
use async_trait::async_trait;
use smallvec::SmallVec;

use super::{display_name, notify, user_err_fmt, Services};
use crate::blob::profile_pic_path;
use crate::entities::{ContentCounts, NotificationKind, PinHash, Plan, User};
use crate::repositories::{UserMutation, UserQuery};
use crate::usecases::user::{
    edit, follow, get, gets, profile_pic, register, report_account, set_pin, unfollow,
};
use crate::utils::{page_count, paginate, AlsoChain, LetChain};

const PAGE_ITEMS: usize = 10;

pub struct UserInteractor {
    pub services: Services,
}

/// `@` first, 5 to 11 characters, at least one letter.
fn check_username(name: &str) -> Result<()> {
    let len = name.chars().count();
    if !name.starts_with('@') || !(5..=11).contains(&len) || !name.chars().any(|c| c.is_ascii_alphabetic())
    {
        bail!("Username not supported, include an \"@\" at the beginning");
    }

    Ok(())
}

/// runs before any credential exists, so a rejected form leaves no account.
pub(crate) fn check_profile_fields(first_name: &str, last_name: &str, nationality: &str) -> Result<()> {
    if first_name.trim().is_empty() {
        bail!("First name is required");
    }
    if last_name.trim().is_empty() {
        bail!("Last name is required");
    }
    if nationality.trim().is_empty() {
        bail!("Nationality is required");
    }

    Ok(())
}

#[async_trait]
impl register::Usecase for UserInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: register::Input) -> Result<register::Output> {
        let register::Input {
            user_id,
            email,
            first_name,
            last_name,
            nationality,
        } = data;

        check_profile_fields(&first_name, &last_name, &nationality)?;

        let new_user = User {
            id: user_id,
            email: email.clone(),
            username: format!("@{}", first_name.trim()),
            first_name: first_name.trim().to_string(),
            last_name: last_name.trim().to_string(),
            nationality: nationality.trim().to_string(),
            bio: "Hi, I am new here".to_string(),
            plan: Plan::Free,
            remaining_secs: 0,
            balance: 0,
            pin: None,
            followers: HashSet::new(),
            followings: HashSet::new(),
            counts: ContentCounts::default(),
            profile_pic: None,
            active: true,
        };

        let can_insert = self
            .services
            .users
            .insert(new_user.clone())
            .await
            .map_err(user_err_fmt)?;
        if !can_insert {
            bail!("already registered.");
        }

        self.services
            .alerts
            .send(format!(
                "{} just signed up for M-Temple.\n\nEmail: {}",
                new_user.first_name, email
            ))
            .await;

        register::Output { user: new_user }
            .also_(|o| tracing::trace!("output - {:?}", o))
            .let_(Ok)
    }
}

#[async_trait]
impl get::Usecase for UserInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: get::Input) -> Result<get::Output> {
        let get::Input { user_id } = data;

        self.services
            .users
            .find(&user_id)
            .await
            .map_err(user_err_fmt)?
            .let_(|user| get::Output { user })
            .let_(Ok)
    }
}

#[async_trait]
impl gets::Usecase for UserInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: gets::Input) -> Result<gets::Output> {
        let gets::Input { query, page } = data;

        let mut found = self.services.users.finds(query).await.map_err(user_err_fmt)?;
        found.sort_by(|a, b| a.username.cmp(&b.username));

        let lim = paginate(found.len(), page, PAGE_ITEMS)?;
        let pages = page_count(found.len(), PAGE_ITEMS) as u32;

        gets::Output {
            users: found.drain(lim).collect::<SmallVec<_>>(),
            page,
            pages,
        }
        .also_(|o| tracing::trace!("output - {:?}", o))
        .let_(Ok)
    }
}

#[async_trait]
impl edit::Usecase for UserInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: edit::Input) -> Result<edit::Output> {
        let edit::Input {
            user_id,
            username,
            bio,
        } = data;

        let username = match username {
            Some(raw) => {
                let name = raw.trim().to_string();
                check_username(&name)?;

                let current = self.services.users.find(&user_id).await.map_err(user_err_fmt)?;
                if current.username != name {
                    let taken = self
                        .services
                        .users
                        .finds(UserQuery {
                            username: Some(regex::Regex::new(&format!(
                                "^{}$",
                                regex::escape(&name)
                            ))?),
                            ..Default::default()
                        })
                        .await
                        .map_err(user_err_fmt)?;
                    if !taken.is_empty() {
                        bail!("Username already exists");
                    }
                }

                Some(name)
            },
            None => None,
        };

        if let Some(b) = &bio {
            if b.chars().count() > 100 {
                bail!("Bio cannot be more than 100 characters");
            }
        }

        self.services
            .users
            .update(&user_id, UserMutation {
                username,
                bio,
                ..Default::default()
            })
            .await
            .map_err(user_err_fmt)?
            .let_(|user| edit::Output { user })
            .let_(Ok)
    }
}

#[async_trait]
impl profile_pic::Usecase for UserInteractor {
    #[tracing::instrument(skip(self, data), fields(user = %data.user_id))]
    async fn handle(&self, data: profile_pic::Input) -> Result<profile_pic::Output> {
        let profile_pic::Input {
            user_id,
            email,
            bytes,
        } = data;

        if bytes.is_empty() {
            bail!("empty file");
        }

        let url = self
            .services
            .blobs
            .upload(&profile_pic_path(&email), bytes)
            .await?;

        let user = self
            .services
            .users
            .update(&user_id, UserMutation {
                profile_pic: Some(url.clone()),
                ..Default::default()
            })
            .await
            .map_err(user_err_fmt)?;

        Ok(profile_pic::Output { user, url })
    }
}

#[async_trait]
impl set_pin::Usecase for UserInteractor {
    #[tracing::instrument(skip(self, data), fields(user = %data.user_id))]
    async fn handle(&self, data: set_pin::Input) -> Result<set_pin::Output> {
        let set_pin::Input {
            user_id,
            current,
            new,
            confirm,
        } = data;

        let user = self.services.users.find(&user_id).await.map_err(user_err_fmt)?;

        if let Some(existing) = &user.pin {
            match current {
                Some(c) if existing.verify(&user_id, &c) => (),
                _ => bail!("Incorrect current pin. Please try again."),
            }
        }

        let hash = match PinHash::derive(&user_id, &new) {
            Ok(h) => h,
            Err(_) => bail!("Pin must be exactly 4 digits."),
        };
        if new != confirm {
            bail!("Pins do not match. Please try again.");
        }

        self.services
            .users
            .update(&user_id, UserMutation {
                pin: Some(hash),
                ..Default::default()
            })
            .await
            .map_err(user_err_fmt)?
            .let_(|user| set_pin::Output { user })
            .let_(Ok)
    }
}

#[async_trait]
impl follow::Usecase for UserInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: follow::Input) -> Result<follow::Output> {
        let follow::Input { actor, target } = data;

        if actor == target {
            bail!("You cannot follow yourself");
        }

        let me = self.services.users.find(&actor).await.map_err(user_err_fmt)?;
        if !self.services.users.is_exists(&target).await.map_err(user_err_fmt)? {
            bail!("cannot find user. not registered?");
        }

        let added = self
            .services
            .users
            .insert_following(&actor, &target)
            .await
            .map_err(user_err_fmt)?;
        if !added {
            bail!("already following.");
        }
        self.services
            .users
            .insert_follower(&target, &actor)
            .await
            .map_err(user_err_fmt)?;

        let target = self.services.users.find(&target).await.map_err(user_err_fmt)?;
        let follow_back = me.followers.contains(&target.id);

        let name = match me.username.is_empty() {
            true => "A user",
            false => me.username.as_str(),
        };
        notify(
            &self.services,
            &target.id,
            &actor,
            name,
            NotificationKind::Follow {
                followers: target.followers.len() as u32,
            },
            format!("{} started following you", name),
        )
        .await;

        Ok(follow::Output {
            target,
            follow_back,
        })
    }
}

#[async_trait]
impl unfollow::Usecase for UserInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: unfollow::Input) -> Result<unfollow::Output> {
        let unfollow::Input { actor, target } = data;

        let removed = self
            .services
            .users
            .delete_following(&actor, &target)
            .await
            .map_err(user_err_fmt)?;
        if !removed {
            bail!("not following.");
        }
        self.services
            .users
            .delete_follower(&target, &actor)
            .await
            .map_err(user_err_fmt)?;

        self.services
            .users
            .find(&target)
            .await
            .map_err(user_err_fmt)?
            .let_(|target| unfollow::Output { target })
            .let_(Ok)
    }
}

#[async_trait]
impl report_account::Usecase for UserInteractor {
    #[tracing::instrument(skip(self))]
    async fn handle(&self, data: report_account::Input) -> Result<report_account::Output> {
        let report_account::Input { actor, target } = data;

        if actor == target {
            bail!("You cannot report yourself");
        }

        let target = self.services.users.find(&target).await.map_err(user_err_fmt)?;
        let reporter = display_name(&self.services, &actor).await;

        self.services
            .alerts
            .send(format!(
                "An Account '{}' with email of {} and balance of '{}' was just reported by {}",
                target.username,
                target.email,
                crate::utils::format_cents(target.balance),
                reporter
            ))
            .await;

        Ok(report_account::Output { target })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::UserId;
    use crate::interactors::tests::Fixture;
    use crate::repositories::UserRepository;

    fn interactor(fx: &Fixture) -> UserInteractor {
        UserInteractor {
            services: fx.services.clone(),
        }
    }

    #[tokio::test]
    async fn register_creates_defaults_and_alerts() {
        let fx = Fixture::new();
        let i = interactor(&fx);

        let out = register::Usecase::handle(&i, register::Input {
            user_id: UserId::from("u1"),
            email: "ann@example.com".to_string(),
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            nationality: "KE".to_string(),
        })
        .await
        .unwrap();

        assert_eq!(out.user.username, "@Ann");
        assert_eq!(out.user.bio, "Hi, I am new here");
        assert_eq!(out.user.plan, Plan::Free);
        assert_eq!(out.user.balance, 0);
        assert_eq!(
            fx.alerts.messages().await,
            ["Ann just signed up for M-Temple.\n\nEmail: ann@example.com"]
        );
    }

    #[tokio::test]
    async fn username_rules() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;
        fx.user("b", 0).await;

        for bad in ["nope", "@abc", "@1234", "@waytoolongname", "@ñ1234", "@日本語です"] {
            let res = edit::Usecase::handle(&i, edit::Input {
                user_id: a.clone(),
                username: Some(bad.to_string()),
                bio: None,
            })
            .await;
            assert!(res.is_err(), "{} accepted", bad);
        }

        // fixture usernames are `@<id>`; take b's name after renaming it to something valid
        fx.users
            .update(&UserId::from("b"), UserMutation {
                username: Some("@bravo".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        let taken = edit::Usecase::handle(&i, edit::Input {
            user_id: a.clone(),
            username: Some("@bravo".to_string()),
            bio: None,
        })
        .await;
        assert_eq!(taken.unwrap_err().to_string(), "Username already exists");

        let ok = edit::Usecase::handle(&i, edit::Input {
            user_id: a,
            username: Some("@alpha".to_string()),
            bio: Some("hello".to_string()),
        })
        .await
        .unwrap();
        assert_eq!(ok.user.username, "@alpha");
        assert_eq!(ok.user.bio, "hello");
    }

    #[tokio::test]
    async fn changing_pin_needs_current() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;

        let wrong = set_pin::Usecase::handle(&i, set_pin::Input {
            user_id: a.clone(),
            current: Some("0000".to_string()),
            new: "5678".to_string(),
            confirm: "5678".to_string(),
        })
        .await;
        assert_eq!(
            wrong.unwrap_err().to_string(),
            "Incorrect current pin. Please try again."
        );

        let mismatch = set_pin::Usecase::handle(&i, set_pin::Input {
            user_id: a.clone(),
            current: Some("1234".to_string()),
            new: "5678".to_string(),
            confirm: "5679".to_string(),
        })
        .await;
        assert!(mismatch.is_err());

        let out = set_pin::Usecase::handle(&i, set_pin::Input {
            user_id: a.clone(),
            current: Some("1234".to_string()),
            new: "5678".to_string(),
            confirm: "5678".to_string(),
        })
        .await
        .unwrap();
        assert!(out.user.pin.unwrap().verify(&a, "5678"));
    }

    #[tokio::test]
    async fn follow_updates_both_sides() {
        let fx = Fixture::new();
        let i = interactor(&fx);
        let a = fx.user("a", 0).await;
        let b = fx.user("b", 0).await;

        let out = follow::Usecase::handle(&i, follow::Input {
            actor: a.clone(),
            target: b.clone(),
        })
        .await
        .unwrap();
        assert!(out.target.followers.contains(&a));
        assert!(!out.follow_back);
        assert!(fx.users.find(&a).await.unwrap().followings.contains(&b));

        let back = follow::Usecase::handle(&i, follow::Input {
            actor: b.clone(),
            target: a.clone(),
        })
        .await
        .unwrap();
        assert!(back.follow_back);

        assert!(follow::Usecase::handle(&i, follow::Input {
            actor: a.clone(),
            target: a.clone(),
        })
        .await
        .is_err());

        unfollow::Usecase::handle(&i, unfollow::Input {
            actor: a.clone(),
            target: b.clone(),
        })
        .await
        .unwrap();
        assert!(!fx.users.find(&b).await.unwrap().followers.contains(&a));
    }
}
