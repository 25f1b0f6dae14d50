use std::path::PathBuf;

use uuid::Uuid;

use crate::entities::{CommentId, ContentId, ContentKind, Plan, UserId};
use crate::repositories::{ContentMutation, ContentQuery, UserQuery};
use crate::usecases::ledger::WithdrawMethod;

pub mod parser;

use parser::*;

/// this is M-Temple.
#[derive(Debug, Clone, ::clap::Parser)]
#[clap(name = "mtemple", author, version)]
pub struct App {
    #[clap(subcommand)]
    pub cmd: RootMod,
}

#[derive(Debug, Clone, ::clap::Subcommand)]
pub enum RootMod {
    /// sign up, sign in and out.
    #[clap(short_flag = 'A')]
    Auth {
        #[clap(subcommand)]
        cmd: AuthMod,
    },

    /// about user.
    #[clap(short_flag = 'U')]
    User {
        #[clap(subcommand)]
        cmd: UserMod,
    },

    /// about content.
    #[clap(short_flag = 'C')]
    Content {
        #[clap(subcommand)]
        cmd: ContentMod,
    },

    /// notifications, bookmarks, cart and support.
    #[clap(short_flag = 'I')]
    Inbox {
        #[clap(subcommand)]
        cmd: InboxMod,
    },

    /// balance, checkout, gifts, withdrawals and plans.
    #[clap(short_flag = 'W')]
    Wallet {
        #[clap(subcommand)]
        cmd: WalletMod,
    },

    /// resolve a page path against the session gate.
    #[clap(short_flag = 'R')]
    Route {
        #[clap(name = "PATH")]
        path: String,
    },
}

#[derive(Debug, Clone, ::clap::Subcommand)]
pub enum AuthMod {
    /// create an account and its profile.
    Signup(AuthSignupCmd),

    Signin {
        #[clap(name = "EMAIL")]
        email: String,

        #[clap(name = "PASSWORD")]
        password: String,
    },

    Signout,

    /// show the signed-in session.
    Whoami,
}

#[derive(Debug, Clone, ::clap::Args)]
pub struct AuthSignupCmd {
    #[clap(name = "EMAIL")]
    pub email: String,

    /// at least 8 characters with a number.
    #[clap(name = "PASSWORD")]
    pub password: String,

    #[clap(name = "FIRST_NAME")]
    pub first_name: String,

    #[clap(name = "LAST_NAME")]
    pub last_name: String,

    #[clap(name = "NATIONALITY")]
    pub nationality: String,
}

#[derive(Debug, Clone, ::clap::Subcommand)]
pub enum UserMod {
    /// get user with id.
    /// if not given id, fallback to signed-in user's id.
    #[clap(short_flag = 'g')]
    Get {
        #[clap(name = "USER_ID")]
        user_id: Option<UserId>,
    },

    /// get users with query.
    #[clap(short_flag = 'q')]
    Gets(UserGetsCmd),

    /// edit own username and bio.
    #[clap(short_flag = 'e')]
    Edit {
        #[clap(long)]
        username: Option<String>,

        #[clap(long)]
        bio: Option<String>,
    },

    /// upload a profile picture.
    Pic {
        #[clap(name = "FILE")]
        file: PathBuf,
    },

    /// set or change the 4 digit pin.
    Pin {
        #[clap(name = "NEW")]
        new: String,

        #[clap(name = "CONFIRM")]
        confirm: String,

        /// required when a pin is already set.
        #[clap(long)]
        current: Option<String>,
    },

    Follow {
        #[clap(name = "USER_ID")]
        user_id: UserId,
    },

    Unfollow {
        #[clap(name = "USER_ID")]
        user_id: UserId,
    },

    Report {
        #[clap(name = "USER_ID")]
        user_id: UserId,
    },
}

#[derive(Debug, Clone, ::clap::Args)]
pub struct UserGetsCmd {
    /// u32 (1 =< n)
    #[clap(name = "PAGE", default_value = "1", parse(try_from_str = parse_nonzero_num))]
    pub page: u32,

    /// json
    ///
    /// schema: {
    ///   username?: regex,
    ///   email?: string,
    ///   plan?: "FREE" | "PRO" | "PRO+",
    ///   followers?: [user_id],
    ///   followers_num?: range<u32>,
    /// }
    #[clap(name = "QUERY", default_value = "{}", parse(try_from_str = parse_user_query))]
    pub query: UserQuery,
}

#[derive(Debug, Clone, ::clap::Subcommand)]
pub enum ContentMod {
    #[clap(short_flag = 'c')]
    Post(ContentPostCmd),

    /// load a feed and show one page of it.
    #[clap(short_flag = 'q')]
    Feed(ContentFeedCmd),

    /// list own items of a kind.
    Mine {
        #[clap(name = "KIND")]
        kind: ContentKind,
    },

    /// open the detail view of a feed row or an id.
    #[clap(short_flag = 'g')]
    Open {
        #[clap(name = "TARGET", parse(try_from_str = parse_target))]
        target: Target,
    },

    #[clap(short_flag = 'e')]
    Edit {
        #[clap(name = "CONTENT_ID")]
        content_id: ContentId,

        /// json
        ///
        /// schema: {
        ///   title?: string,
        ///   description?: string,
        ///   price?: "free" | amount,
        /// }
        #[clap(name = "MUTATION", parse(try_from_str = parse_content_mutation))]
        mutation: ContentMutation,
    },

    /// like, or unlike when already liked.
    #[clap(short_flag = 'l')]
    Like {
        #[clap(name = "TARGET", parse(try_from_str = parse_target))]
        target: Target,
    },

    Report {
        #[clap(name = "TARGET", parse(try_from_str = parse_target))]
        target: Target,
    },

    Comment {
        #[clap(name = "TARGET", parse(try_from_str = parse_target))]
        target: Target,

        #[clap(name = "BODY")]
        body: String,
    },

    Uncomment {
        #[clap(name = "CONTENT_ID")]
        content_id: ContentId,

        #[clap(name = "COMMENT_ID")]
        comment_id: CommentId,
    },

    ReportComment {
        #[clap(name = "CONTENT_ID")]
        content_id: ContentId,

        #[clap(name = "COMMENT_ID")]
        comment_id: CommentId,
    },

    #[clap(short_flag = 'd')]
    Withdraw {
        #[clap(name = "CONTENT_ID")]
        content_id: ContentId,
    },
}

#[derive(Debug, Clone, ::clap::Args)]
pub struct ContentPostCmd {
    #[clap(name = "KIND")]
    pub kind: ContentKind,

    #[clap(name = "TITLE")]
    pub title: String,

    #[clap(long, short, default_value = "")]
    pub description: String,

    /// omitted for free items.
    #[clap(long, short, parse(try_from_str = crate::utils::parse_cents))]
    pub price: Option<i64>,

    #[clap(long)]
    pub status: Option<String>,

    /// media to upload; required except for quotes.
    #[clap(long, short)]
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, ::clap::Args)]
pub struct ContentFeedCmd {
    #[clap(name = "KIND")]
    pub kind: ContentKind,

    /// u32 (1 =< n)
    #[clap(name = "PAGE", default_value = "1", parse(try_from_str = parse_nonzero_num))]
    pub page: u32,

    /// json
    ///
    /// schema: {
    ///   owner?: user_id,
    ///   title?: regex,
    ///   liked?: [user_id],
    ///   liked_num?: range<u32>,
    /// }
    #[clap(long, short, default_value = "{}", parse(try_from_str = parse_content_query))]
    pub query: ContentQuery,
}

#[derive(Debug, Clone, ::clap::Subcommand)]
pub enum InboxMod {
    Notifications {
        /// u32 (1 =< n)
        #[clap(name = "PAGE", default_value = "1", parse(try_from_str = parse_nonzero_num))]
        page: u32,
    },

    Bookmark {
        #[clap(name = "TARGET", parse(try_from_str = parse_target))]
        target: Target,

        #[clap(long, short, default_value = "")]
        note: String,
    },

    Bookmarks,

    Unbookmark {
        #[clap(name = "ITEM_ID")]
        item_id: Uuid,
    },

    CartAdd {
        #[clap(name = "TARGET", parse(try_from_str = parse_target))]
        target: Target,
    },

    Cart,

    CartRemove {
        #[clap(name = "ITEM_ID")]
        item_id: Uuid,
    },

    /// move a bookmark into the cart.
    ToCart {
        #[clap(name = "ITEM_ID")]
        item_id: Uuid,
    },

    /// move a cart entry into the bookmarks.
    ToBookmarks {
        #[clap(name = "ITEM_ID")]
        item_id: Uuid,
    },

    /// open the support thread.
    Support,

    SupportSend {
        #[clap(name = "TEXT")]
        text: String,
    },
}

#[derive(Debug, Clone, ::clap::Subcommand)]
pub enum WalletMod {
    Balance,

    /// buy everything in the cart.
    Checkout {
        #[clap(name = "PIN")]
        pin: String,
    },

    Gift {
        #[clap(name = "USER_ID")]
        user_id: UserId,

        #[clap(name = "AMOUNT", parse(try_from_str = crate::utils::parse_cents))]
        amount: i64,

        #[clap(name = "PIN")]
        pin: String,
    },

    Withdraw {
        #[clap(name = "AMOUNT", parse(try_from_str = crate::utils::parse_cents))]
        amount: i64,

        #[clap(name = "PIN")]
        pin: String,

        /// paypal, google-pay or wire.
        #[clap(long, short)]
        method: Option<WithdrawMethod>,

        #[clap(long, short, default_value = "")]
        account: String,
    },

    Subscribe {
        #[clap(name = "PLAN")]
        plan: Plan,

        #[clap(name = "PIN")]
        pin: String,
    },

    /// remaining subscription time.
    Plan,
}
