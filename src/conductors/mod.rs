use std::fmt;
use std::path::Path;

use anyhow::{anyhow, bail, Context as _, Result};
use serenity::utils::Colour;
use tokio::sync::Mutex;

use crate::cmds::parser::Target;
use crate::cmds::{
    App, AuthMod, AuthSignupCmd, ContentFeedCmd, ContentMod, ContentPostCmd, InboxMod, RootMod,
    UserGetsCmd, UserMod, WalletMod,
};
use crate::countdown::Countdown;
use crate::entities::{ContentId, Plan, User};
use crate::feed::FeedRow;
use crate::handlers::Handler;
use crate::handoff::Handoff;
use crate::interaction::Optimistic;
use crate::routes::{resolve, Resolved};
use crate::usecases::content::Upload;
use crate::utils::{format_cents, page_count, paginate, LetChain};

mod command_colors;
mod helper;

use helper::Parsed;

/// what the shell keeps between commands: the last loaded feed, the open
/// detail and the plan countdown of the signed-in user.
#[derive(Default)]
struct ViewState {
    feed: Vec<Optimistic<FeedRow>>,
    handoff: Option<Handoff>,
    countdown: Option<Countdown>,
}

pub struct Conductor {
    pub handler: Handler,
    state: Mutex<ViewState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub title: String,
    pub rgb: (u8, u8, u8),
    pub description: String,
    pub fields: Vec<(String, String)>,
}

impl Response {
    pub fn is_error(&self) -> bool { self.rgb == command_colors::ERROR }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (r, g, b) = self.rgb;
        writeln!(f, "[{}] #{}", self.title, Colour::from_rgb(r, g, b).hex())?;
        if !self.description.is_empty() {
            writeln!(f, "{}", self.description)?;
        }
        for (name, value) in &self.fields {
            writeln!(f, "  {}: {}", name, value)?;
        }

        Ok(())
    }
}

fn resp(title: impl fmt::Display, rgb: (u8, u8, u8), description: impl fmt::Display) -> Response {
    Response {
        title: title.to_string(),
        rgb,
        description: description.to_string(),
        fields: vec![],
    }
}

async fn read_upload(path: &Path) -> Result<Upload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| anyhow!("not a file: {}", path.display()))?;

    Ok(Upload { name, bytes })
}

impl Conductor {
    pub fn new(handler: Handler) -> Self {
        Self {
            handler,
            state: Mutex::new(ViewState::default()),
        }
    }

    /// `None` for blank input.
    pub async fn conduct_line(&self, line: &str) -> Option<Vec<Response>> {
        let res = match helper::parse_line(line)? {
            Parsed::Command(app) => self.conduct(app).await,
            Parsed::Showing(s) => resp("help", command_colors::SHOWING, s).let_(|r| vec![r]),
            Parsed::Error(e) => resp("response", command_colors::ERROR, e).let_(|r| vec![r]),
        };

        Some(res)
    }

    pub async fn conduct(&self, cmd: App) -> Vec<Response> {
        let shows = match self.handler.session() {
            Some(s) => format!("as: {}", s.email),
            None => "as: guest".to_string(),
        };

        self.dispatch(cmd, shows).await.unwrap_or_else(|e| {
            tracing::debug!("command failed: {:#}", e);
            resp("response", command_colors::ERROR, e).let_(|r| vec![r])
        })
    }

    /// remaining plan time, when a countdown runs.
    pub async fn remaining_secs(&self) -> Option<u64> {
        self.state
            .lock()
            .await
            .countdown
            .as_ref()
            .map(|c| c.remaining())
    }

    async fn restart_countdown(&self, user: &User) {
        let mut state = self.state.lock().await;
        state.countdown = match (user.plan, user.remaining_secs) {
            (Plan::Free, _) | (_, 0) => None,
            (plan, secs) => {
                let users = self.handler.services().users.clone();
                Countdown::spawn(users, user.id.clone(), plan, secs).let_(Some)
            },
        };
    }

    async fn reset_view(&self) {
        let mut state = self.state.lock().await;
        *state = ViewState::default();
    }

    async fn target_id(&self, target: Target) -> Result<ContentId> {
        match target {
            Target::Id(id) => Ok(id),
            Target::Row(n) => self
                .state
                .lock()
                .await
                .feed
                .get(n as usize - 1)
                .map(|r| r.get().reference.id)
                .ok_or_else(|| anyhow!("no row {} in the loaded feed.", n)),
        }
    }

    async fn dispatch(&self, cmd: App, shows: String) -> Result<Vec<Response>> {
        use command_colors::*;

        let App { cmd } = cmd;

        let res = match cmd {
            RootMod::Auth { cmd } => match cmd {
                AuthMod::Signup(AuthSignupCmd {
                    email,
                    password,
                    first_name,
                    last_name,
                    nationality,
                }) => {
                    let user = self
                        .handler
                        .sign_up(email, password, first_name, last_name, nationality)
                        .await?
                        .user;
                    self.reset_view().await;

                    helper::resp_from_user("registered", shows, USER_CREATE, user)
                        .let_(|r| vec![r])
                },

                AuthMod::Signin { email, password } => {
                    self.handler.sign_in(email, password).await?;
                    self.reset_view().await;

                    let user = self.handler.get_user(None).await?.user;
                    self.restart_countdown(&user).await;

                    helper::resp_from_user("signed in", shows, AUTH, user).let_(|r| vec![r])
                },

                AuthMod::Signout => {
                    self.handler.sign_out().await;
                    self.reset_view().await;

                    resp("signed out", AUTH, shows).let_(|r| vec![r])
                },

                AuthMod::Whoami => match self.handler.session() {
                    Some(s) => Response {
                        title: "session".to_string(),
                        rgb: AUTH,
                        description: shows,
                        fields: vec![
                            ("uid".to_string(), s.uid.to_string()),
                            ("email".to_string(), s.email),
                        ],
                    },
                    None => resp("session", AUTH, "not signed in."),
                }
                .let_(|r| vec![r]),
            },

            RootMod::User { cmd } => match cmd {
                UserMod::Get { user_id } => {
                    let user = self.handler.get_user(user_id).await?.user;

                    helper::resp_from_user("showing user", shows, USER_READ, user)
                        .let_(|r| vec![r])
                },

                UserMod::Gets(UserGetsCmd { page, query }) => {
                    let out = self.handler.get_users(query, page).await?;
                    let (page, pages) = (out.page, out.pages);

                    out.users
                        .into_iter()
                        .enumerate()
                        .map(|(i, u)| {
                            helper::resp_from_user(
                                format!("showing users: [{}] | {}/{}", i, page, pages),
                                shows.as_str(),
                                USER_READ,
                                u,
                            )
                        })
                        .collect()
                },

                UserMod::Edit { username, bio } => {
                    let user = self.handler.edit_user(username, bio).await?.user;

                    helper::resp_from_user("updated user", shows, USER_UPDATE, user)
                        .let_(|r| vec![r])
                },

                UserMod::Pic { file } => {
                    let Upload { bytes, .. } = read_upload(&file).await?;
                    let out = self.handler.profile_pic(bytes).await?;

                    helper::resp_from_user(
                        "updated picture",
                        format!("{}\nurl: {}", shows, out.url),
                        USER_UPDATE,
                        out.user,
                    )
                    .let_(|r| vec![r])
                },

                UserMod::Pin {
                    new,
                    confirm,
                    current,
                } => {
                    self.handler.set_pin(current, new, confirm).await?;

                    resp("pin updated", USER_UPDATE, shows).let_(|r| vec![r])
                },

                UserMod::Follow { user_id } => {
                    let out = self.handler.follow(user_id).await?;
                    let title = match out.follow_back {
                        true => "followed back",
                        false => "following",
                    };

                    helper::resp_from_user(title, shows, FOLLOW, out.target).let_(|r| vec![r])
                },

                UserMod::Unfollow { user_id } => {
                    let out = self.handler.unfollow(user_id).await?;

                    helper::resp_from_user("unfollowed", shows, FOLLOW, out.target)
                        .let_(|r| vec![r])
                },

                UserMod::Report { user_id } => {
                    let out = self.handler.report_account(user_id).await?;

                    resp(
                        "reported",
                        REPORT,
                        format!("{}\nthanks, {} was reported.", shows, out.target.username),
                    )
                    .let_(|r| vec![r])
                },
            },

            RootMod::Content { cmd } => match cmd {
                ContentMod::Post(ContentPostCmd {
                    kind,
                    title,
                    description,
                    price,
                    status,
                    file,
                }) => {
                    let upload = match file {
                        Some(f) => read_upload(&f).await?.let_(Some),
                        None => None,
                    };
                    let content = self
                        .handler
                        .post_content(kind, title, description, price, status, upload)
                        .await?
                        .content;

                    helper::resp_from_content("posted content", shows, POST, &content)
                        .let_(|r| vec![r])
                },

                ContentMod::Feed(ContentFeedCmd { kind, page, query }) => {
                    let rows = self.handler.feed(kind, query).await?.rows;
                    let page_size = self.handler.services().ledger_config.page_size;

                    let lim = paginate(rows.len(), page, page_size)?;
                    let pages = page_count(rows.len(), page_size);

                    let mut state = self.state.lock().await;
                    state.feed = rows.into_iter().map(Optimistic::new).collect();
                    state.handoff = None;

                    let mut fields = vec![("page".to_string(), format!("{}/{}", page, pages))];
                    state
                        .feed
                        .iter()
                        .enumerate()
                        .skip(lim.start)
                        .take(lim.len())
                        .for_each(|(i, r)| fields.push(helper::field_from_row(i + 1, r)));

                    Response {
                        title: format!("showing {}s", kind),
                        rgb: CONTENT_READ,
                        description: shows,
                        fields,
                    }
                    .let_(|r| vec![r])
                },

                ContentMod::Mine { kind } => {
                    let items = self.handler.my_content(kind).await?.items;
                    if items.is_empty() {
                        bail!("You have no {}s yet.", kind);
                    }

                    items
                        .iter()
                        .enumerate()
                        .map(|(i, c)| {
                            helper::resp_from_content(
                                format!("your {}s: [{}]", kind, i + 1),
                                shows.as_str(),
                                CONTENT_READ,
                                c,
                            )
                        })
                        .collect()
                },

                ContentMod::Open { target } => {
                    let (handoff, content_id) = match target {
                        Target::Row(n) => {
                            let state = self.state.lock().await;
                            let row = state
                                .feed
                                .get(n as usize - 1)
                                .ok_or_else(|| anyhow!("no row {} in the loaded feed.", n))?;
                            (Some(Handoff::from(row.get())), None)
                        },
                        Target::Id(id) => (None, Some(id)),
                    };

                    let detail = self.handler.view_content(handoff, content_id).await?.detail;
                    self.state.lock().await.handoff = Some(detail.handoff.clone());

                    helper::resp_from_detail(shows, CONTENT_READ, &detail).let_(|r| vec![r])
                },

                ContentMod::Edit {
                    content_id,
                    mutation,
                } => {
                    let content = self
                        .handler
                        .edit_content(content_id, mutation)
                        .await?
                        .content;

                    helper::resp_from_content("updated content", shows, CONTENT_UPDATE, &content)
                        .let_(|r| vec![r])
                },

                ContentMod::Like { target } => self.like(target, shows).await?,

                ContentMod::Report { target } => {
                    let id = self.target_id(target).await?;
                    let out = self.handler.report_content(id).await?;

                    let description = match out.first {
                        true => format!("{}\nthanks, the {} was reported.", shows, out.content.kind),
                        false => format!("You have already reported this {}!", out.content.kind),
                    };
                    resp("report", REPORT, description).let_(|r| vec![r])
                },

                ContentMod::Comment { target, body } => {
                    let id = self.target_id(target).await?;
                    let c = self.handler.comment(id, body).await?.comment;

                    Response {
                        title: "commented".to_string(),
                        rgb: COMMENT,
                        description: shows,
                        fields: vec![helper::field_from_comment(&c)],
                    }
                    .let_(|r| vec![r])
                },

                ContentMod::Uncomment {
                    content_id,
                    comment_id,
                } => {
                    let c = self
                        .handler
                        .delete_comment(content_id, comment_id)
                        .await?
                        .comment;

                    Response {
                        title: "deleted comment".to_string(),
                        rgb: COMMENT,
                        description: shows,
                        fields: vec![helper::field_from_comment(&c)],
                    }
                    .let_(|r| vec![r])
                },

                ContentMod::ReportComment {
                    content_id,
                    comment_id,
                } => {
                    let first = self
                        .handler
                        .report_comment(content_id, comment_id)
                        .await?
                        .first;

                    let description = match first {
                        true => format!("{}\nthanks, the comment was reported.", shows),
                        false => "You have already reported this comment!".to_string(),
                    };
                    resp("report", REPORT, description).let_(|r| vec![r])
                },

                ContentMod::Withdraw { content_id } => {
                    let content = self.handler.withdraw_content(content_id).await?.content;

                    let mut state = self.state.lock().await;
                    state.feed.retain(|r| r.get().reference.id != content_id);
                    if state.handoff.as_ref().map(|h| h.reference.id) == Some(content_id) {
                        state.handoff = None;
                    }

                    helper::resp_from_content("deleted content", shows, CONTENT_DELETE, &content)
                        .let_(|r| vec![r])
                },
            },

            RootMod::Inbox { cmd } => self.inbox(cmd, shows).await?,

            RootMod::Wallet { cmd } => self.wallet(cmd, shows).await?,

            RootMod::Route { path } => match resolve(&path, self.handler.session().is_some()) {
                Resolved::Show(r) => resp(r.path, ROUTE, format!("showing {}", r.screen)),
                Resolved::Redirect(to) => resp(path, ROUTE, format!("redirect to {}", to)),
                Resolved::NotFound => resp(path, ROUTE, "page not found"),
            }
            .let_(|r| vec![r]),
        };

        Ok(res)
    }

    /// toggles on the loaded row first and settles once the store answers.
    async fn like(&self, target: Target, shows: String) -> Result<Vec<Response>> {
        use command_colors::*;

        let n = match target {
            Target::Row(n) => n as usize,
            Target::Id(id) => {
                let out = self.handler.like(id).await?;
                let title = if out.liked { "liked" } else { "unliked" };

                return helper::resp_from_content(title, shows, LIKE, &out.content)
                    .let_(|r| vec![r])
                    .let_(Ok);
            },
        };

        let actor = self.handler.require_actor("like")?.uid;

        let id = {
            let mut state = self.state.lock().await;
            let row = n
                .checked_sub(1)
                .and_then(|i| state.feed.get_mut(i))
                .ok_or_else(|| anyhow!("no row {} in the loaded feed.", n))?;

            let began = row.begin(|r| {
                r.is_liked = !r.is_liked;
                match r.is_liked {
                    true => r.content.liked_by.insert(actor.clone()),
                    false => r.content.liked_by.remove(&actor),
                };
            });
            if !began {
                bail!("still waiting for the previous change.");
            }

            row.get().reference.id
        };

        // the view stays usable while the store answers
        let confirmed = self.handler.like(id).await.map(|out| {
            Some(FeedRow {
                reference: out.content.reference(),
                is_liked: out.liked,
                content: out.content,
            })
        });
        let err = confirmed.as_ref().err().map(|e| e.to_string());
        let liked = confirmed.as_ref().ok().and_then(|r| r.as_ref()).map(|r| r.is_liked);

        let mut state = self.state.lock().await;
        // the feed may have been reloaded meanwhile; settle the row by id
        let pending = state
            .feed
            .iter_mut()
            .enumerate()
            .find(|(_, r)| r.is_pending() && r.get().reference.id == id);
        let fields = match pending {
            Some((i, row)) => {
                row.settle(confirmed);
                vec![
                    helper::field_from_row(i + 1, row),
                    ("state".to_string(), helper::phase_str(row.phase())),
                ]
            },
            None => vec![],
        };
        let title = match (&err, liked) {
            (Some(_), _) => "like failed",
            (None, Some(false)) => "unliked",
            (None, _) => "liked",
        };

        Response {
            title: title.to_string(),
            rgb: match err {
                Some(_) => ERROR,
                None => LIKE,
            },
            description: err.unwrap_or(shows),
            fields,
        }
        .let_(|r| vec![r])
        .let_(Ok)
    }

    async fn inbox(&self, cmd: InboxMod, shows: String) -> Result<Vec<Response>> {
        use command_colors::*;

        let res = match cmd {
            InboxMod::Notifications { page } => {
                let items = self.handler.notifications().await?.items;
                let page_size = self.handler.services().ledger_config.page_size;
                let lim = paginate(items.len(), page, page_size)?;

                let mut fields = vec![(
                    "page".to_string(),
                    format!("{}/{}", page, page_count(items.len(), page_size)),
                )];
                items[lim]
                    .iter()
                    .for_each(|n| fields.push(helper::field_from_notification(n)));

                Response {
                    title: "notifications".to_string(),
                    rgb: NOTIFICATION,
                    description: shows,
                    fields,
                }
            },

            InboxMod::Bookmark { target, note } => {
                let id = self.target_id(target).await?;
                let b = self.handler.bookmark(id, note).await?.bookmark;

                Response {
                    title: "bookmarked".to_string(),
                    rgb: BOOKMARK,
                    description: shows,
                    fields: vec![helper::field_from_bookmark(&b)],
                }
            },

            InboxMod::Bookmarks => Response {
                title: "bookmarks".to_string(),
                rgb: BOOKMARK,
                description: shows,
                fields: self
                    .handler
                    .bookmarks()
                    .await?
                    .items
                    .iter()
                    .map(helper::field_from_bookmark)
                    .collect(),
            },

            InboxMod::Unbookmark { item_id } => {
                let b = self.handler.unbookmark(item_id).await?.bookmark;

                Response {
                    title: "removed bookmark".to_string(),
                    rgb: BOOKMARK,
                    description: shows,
                    fields: vec![helper::field_from_bookmark(&b)],
                }
            },

            InboxMod::CartAdd { target } => {
                let id = self.target_id(target).await?;
                let e = self.handler.cart_add(id).await?.entry;

                Response {
                    title: "added to cart".to_string(),
                    rgb: CART,
                    description: shows,
                    fields: vec![helper::field_from_cart(&e)],
                }
            },

            InboxMod::Cart => {
                let out = self.handler.cart().await?;

                let mut fields = out
                    .items
                    .iter()
                    .map(helper::field_from_cart)
                    .collect::<Vec<_>>();
                fields.push(("total".to_string(), format_cents(out.total)));

                Response {
                    title: "cart".to_string(),
                    rgb: CART,
                    description: shows,
                    fields,
                }
            },

            InboxMod::CartRemove { item_id } => {
                let e = self.handler.cart_remove(item_id).await?.entry;

                Response {
                    title: "removed from cart".to_string(),
                    rgb: CART,
                    description: shows,
                    fields: vec![helper::field_from_cart(&e)],
                }
            },

            InboxMod::ToCart { item_id } => {
                let e = self.handler.bookmark_to_cart(item_id).await?.entry;

                Response {
                    title: "moved to cart".to_string(),
                    rgb: CART,
                    description: shows,
                    fields: vec![helper::field_from_cart(&e)],
                }
            },

            InboxMod::ToBookmarks { item_id } => {
                let b = self.handler.cart_to_bookmark(item_id).await?.bookmark;

                Response {
                    title: "moved to bookmarks".to_string(),
                    rgb: BOOKMARK,
                    description: shows,
                    fields: vec![helper::field_from_bookmark(&b)],
                }
            },

            InboxMod::Support => Response {
                title: "support".to_string(),
                rgb: SUPPORT,
                description: shows,
                fields: self
                    .handler
                    .support_open()
                    .await?
                    .messages
                    .iter()
                    .map(helper::field_from_support)
                    .collect(),
            },

            InboxMod::SupportSend { text } => Response {
                title: "support".to_string(),
                rgb: SUPPORT,
                description: shows,
                fields: self
                    .handler
                    .support_send(text)
                    .await?
                    .messages
                    .iter()
                    .map(helper::field_from_support)
                    .collect(),
            },
        };

        Ok(vec![res])
    }

    async fn wallet(&self, cmd: WalletMod, shows: String) -> Result<Vec<Response>> {
        use command_colors::*;

        let res = match cmd {
            WalletMod::Balance => {
                let balance = self.handler.balance().await?;

                resp("balance", WALLET, format!("{}\n{}", shows, format_cents(balance)))
            },

            WalletMod::Checkout { pin } => {
                let out = self.handler.checkout(pin).await?;

                let mut fields = vec![];
                out.purchased.iter().for_each(|p| {
                    fields.push((
                        format!("bought \"{}\"", p.entry.content.title),
                        format!(
                            "{} | download: {}",
                            format_cents(p.entry.content.pricing.price()),
                            p.download_url.as_deref().unwrap_or("-")
                        ),
                    ))
                });
                out.failed.iter().for_each(|f| {
                    fields.push((
                        format!("failed \"{}\"", f.entry.content.title),
                        f.reason.clone(),
                    ))
                });
                fields.push(("balance".to_string(), format_cents(out.balance)));

                Response {
                    title: "checkout".to_string(),
                    rgb: match out.failed.is_empty() {
                        true => WALLET,
                        false => ERROR,
                    },
                    description: shows,
                    fields,
                }
            },

            WalletMod::Gift {
                user_id,
                amount,
                pin,
            } => {
                let receipt = self.handler.gift(user_id.clone(), amount, pin).await?.receipt;

                Response {
                    title: "gift sent".to_string(),
                    rgb: WALLET,
                    description: format!("{}\nto: {}", shows, user_id),
                    fields: helper::fields_from_receipt(&receipt),
                }
            },

            WalletMod::Withdraw {
                amount,
                pin,
                method,
                account,
            } => {
                let receipt = self
                    .handler
                    .withdraw(method, account, amount, pin)
                    .await?
                    .receipt;

                Response {
                    title: "withdraw".to_string(),
                    rgb: WALLET,
                    description: format!("Sucessfully withdrawal of {}", format_cents(amount)),
                    fields: helper::fields_from_receipt(&receipt),
                }
            },

            WalletMod::Subscribe { plan, pin } => {
                let running = self.state.lock().await.countdown.take();
                if let Some(countdown) = running {
                    countdown.stop().await;
                }

                let out = match self.handler.subscribe(plan, pin).await {
                    Ok(out) => out,
                    Err(e) => {
                        if let Ok(current) = self.handler.get_user(None).await {
                            self.restart_countdown(&current.user).await;
                        }
                        return Err(e);
                    },
                };
                self.restart_countdown(&out.user).await;

                Response {
                    title: "plan".to_string(),
                    rgb: WALLET,
                    description: format!(
                        "Plan Updated: {}, New Balance: {}",
                        out.user.plan,
                        format_cents(out.user.balance)
                    ),
                    fields: helper::fields_from_receipt(&out.receipt),
                }
            },

            WalletMod::Plan => {
                let user = self.handler.get_user(None).await?.user;
                let left = self.remaining_secs().await.unwrap_or(user.remaining_secs);

                resp(
                    "plan",
                    WALLET,
                    format!(
                        "{}\n{}: {}d {}h {}m {}s left",
                        shows,
                        user.plan,
                        left / 86_400,
                        left % 86_400 / 3_600,
                        left % 3_600 / 60,
                        left % 60
                    ),
                )
            },
        };

        Ok(vec![res])
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;
    use uuid::Uuid;

    use super::*;
    use crate::auth::memory::InMemoryAuth;
    use crate::entities::{Notification, UserId};
    use crate::interactors::tests::Fixture;
    use crate::repositories::mock::InMemoryInbox;
    use crate::repositories::{
        ContentRepository, InboxRepository, Result as RepoResult, UserRepository,
    };

    fn conductor(fx: &Fixture) -> Conductor {
        Conductor::new(Handler::new(
            Arc::new(InMemoryAuth::new()),
            fx.services.clone(),
        ))
    }

    async fn ok(c: &Conductor, line: &str) -> Response {
        let mut resps = c.conduct_line(line).await.unwrap();
        assert!(!resps[0].is_error(), "{:?} failed: {:?}", line, resps);

        resps.remove(0)
    }

    async fn signup(c: &Conductor, first: &str) -> UserId {
        ok(
            c,
            &format!("auth signup {}@example.com password1 {} Doe KE", first, first),
        )
        .await;

        c.handler.session().unwrap().uid
    }

    #[tokio::test]
    async fn checkout_moves_money_and_empties_cart() {
        let fx = Fixture::new();
        let c = conductor(&fx);

        let ann = signup(&c, "ann").await;
        ok(&c, "content post quote wisdom -p 15").await;

        let bob = signup(&c, "bob").await;
        fx.fund(&bob, 2_000).await;
        ok(&c, "user pin 1234 1234").await;
        ok(&c, "content feed quote").await;
        ok(&c, "inbox cart-add 1").await;

        let out = ok(&c, "wallet checkout 1234").await;
        assert_eq!(out.title, "checkout");
        assert_eq!(out.fields.last().unwrap().1, "$5.00");
        assert!(out.fields[0].0.starts_with("bought"));

        assert_eq!(fx.balance(&bob).await, 500);
        assert_eq!(fx.balance(&ann).await, 1_500);

        let cart = ok(&c, "inbox cart").await;
        assert_eq!(cart.fields, vec![("total".to_string(), "$0.00".to_string())]);
    }

    #[tokio::test]
    async fn row_like_rolls_back_when_store_fails() {
        let fx = Fixture::new();
        let c = conductor(&fx);

        signup(&c, "ann").await;
        let id = ok(&c, "content post quote gone")
            .await
            .fields[0]
            .1
            .parse::<ContentId>()
            .unwrap();

        signup(&c, "bob").await;
        ok(&c, "content feed quote").await;
        ContentRepository::delete(&*fx.contents, id).await.unwrap();

        let resps = c.conduct_line("content like 1").await.unwrap();
        let r = &resps[0];
        assert!(r.is_error());
        assert_eq!(r.title, "like failed");
        assert!(r.fields[0].1.starts_with("♡ 0"));
        assert!(r.fields[1].1.starts_with("rolled back"));
    }

    /// notification inbox whose pushes wait for `open` once armed.
    #[derive(Default)]
    struct HeldInbox {
        inner: InMemoryInbox<Notification>,
        armed: AtomicBool,
        entered: Notify,
        open: Notify,
    }

    #[async_trait]
    impl InboxRepository<Notification> for HeldInbox {
        async fn push(&self, owner: &UserId, item: Notification) -> RepoResult<()> {
            if self.armed.load(Ordering::SeqCst) {
                self.entered.notify_one();
                self.open.notified().await;
            }
            self.inner.push(owner, item).await
        }

        async fn list(&self, owner: &UserId) -> RepoResult<Vec<Notification>> {
            self.inner.list(owner).await
        }

        async fn remove(&self, owner: &UserId, item_id: Uuid) -> RepoResult<Notification> {
            self.inner.remove(owner, item_id).await
        }

        async fn replace(&self, owner: &UserId, items: Vec<Notification>) -> RepoResult<()> {
            self.inner.replace(owner, items).await
        }
    }

    #[tokio::test]
    async fn view_stays_usable_while_a_like_is_in_flight() {
        let mut fx = Fixture::new();
        let held = Arc::new(HeldInbox::default());
        fx.services.notifications = held.clone();
        let c = conductor(&fx);

        signup(&c, "ann").await;
        ok(&c, "content post quote patience").await;
        signup(&c, "bob").await;
        ok(&c, "content feed quote").await;
        held.armed.store(true, Ordering::SeqCst);

        let meanwhile = async {
            held.entered.notified().await;
            let second = c.conduct_line("content like 1").await.unwrap();
            held.open.notify_one();
            second
        };
        let (first, second) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(c.conduct_line("content like 1"), meanwhile)
        })
        .await
        .expect("the row like kept the view locked");

        assert!(second[0].is_error());
        assert_eq!(second[0].description, "still waiting for the previous change.");

        let first = first.unwrap();
        assert_eq!(first[0].title, "liked");
        assert!(first[0].fields[0].1.starts_with("♥ 1"));
        assert_eq!(first[0].fields[1].1, "committed");
    }

    #[tokio::test]
    async fn row_targets_need_a_loaded_feed() {
        let fx = Fixture::new();
        let c = conductor(&fx);
        signup(&c, "ann").await;

        let resps = c.conduct_line("content open 1").await.unwrap();
        assert!(resps[0].is_error());
        assert_eq!(resps[0].description, "no row 1 in the loaded feed.");
    }

    #[tokio::test]
    async fn subscribing_starts_the_countdown() {
        let fx = Fixture::new();
        let c = conductor(&fx);

        let ann = signup(&c, "ann").await;
        fx.fund(&ann, 1_000).await;
        ok(&c, "user pin 1234 1234").await;
        assert_eq!(c.remaining_secs().await, None);

        let out = ok(&c, "wallet subscribe pro 1234").await;
        assert_eq!(out.description, "Plan Updated: PRO, New Balance: $5.01");

        let plan_secs = fx.services.ledger_config.plan_secs();
        let left = c.remaining_secs().await.unwrap();
        assert!(left <= plan_secs && left + 5 > plan_secs);

        ok(&c, "auth signout").await;
        assert_eq!(c.remaining_secs().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn resubscribing_replaces_the_running_countdown() {
        let fx = Fixture::new();
        let c = conductor(&fx);

        let ann = signup(&c, "ann").await;
        fx.fund(&ann, 5_000).await;
        ok(&c, "user pin 1234 1234").await;
        ok(&c, "wallet subscribe pro 1234").await;
        tokio::time::sleep(std::time::Duration::from_millis(3_500)).await;

        ok(&c, "wallet subscribe pro+ 1234").await;
        tokio::time::sleep(std::time::Duration::from_millis(2_500)).await;

        let plan_secs = fx.services.ledger_config.plan_secs();
        let stored = UserRepository::find(&*fx.users, &ann).await.unwrap();
        assert_eq!(stored.plan, Plan::ProPlus);
        assert_eq!(stored.remaining_secs, plan_secs - 2);
        assert_eq!(c.remaining_secs().await, Some(plan_secs - 2));

        ok(&c, "wallet subscribe free 1234").await;
        tokio::time::sleep(std::time::Duration::from_secs(3)).await;

        let stored = UserRepository::find(&*fx.users, &ann).await.unwrap();
        assert_eq!(stored.plan, Plan::Free);
        assert_eq!(stored.remaining_secs, 0);
        assert_eq!(c.remaining_secs().await, None);
    }

    #[tokio::test]
    async fn duplicate_report_is_explained() {
        let fx = Fixture::new();
        let c = conductor(&fx);

        signup(&c, "ann").await;
        ok(&c, "content post quote loud").await;
        signup(&c, "bob").await;
        ok(&c, "content feed quote").await;

        let first = ok(&c, "content report 1").await;
        assert!(first.description.contains("was reported"));
        let again = ok(&c, "content report 1").await;
        assert_eq!(again.description, "You have already reported this quote!");
        // two signups and the first report
        assert_eq!(fx.alerts.messages().await.len(), 3);
    }
}
