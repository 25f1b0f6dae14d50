#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

usecase! {
    post : {
        pub owner: entities::UserId,
        pub email: String,
        pub kind: entities::ContentKind,
        pub title: String,
        pub description: String,
        pub pricing: entities::Pricing,
        pub creator_status: Option<String>,
        pub upload: Option<super::Upload>,
    } => {
        pub content: entities::Content,
    }
}

usecase! {
    feed : {
        pub kind: entities::ContentKind,
        pub viewer: Option<entities::UserId>,
        pub query: crate::repositories::ContentQuery,
    } => {
        pub rows: Vec<crate::feed::FeedRow>,
    }
}

usecase! {
    mine : {
        pub owner: entities::UserId,
        pub kind: entities::ContentKind,
    } => {
        pub items: Vec<entities::Content>,
    }
}

usecase! {
    view : {
        pub viewer: Option<entities::UserId>,
        pub handoff: Option<crate::handoff::Handoff>,
        pub content_id: Option<entities::ContentId>,
    } => {
        pub detail: crate::handoff::DetailView,
    }
}

usecase! {
    edit : {
        pub owner: entities::UserId,
        pub content_id: entities::ContentId,
        pub mutation: crate::repositories::ContentMutation,
    } => {
        pub content: entities::Content,
    }
}

usecase! {
    like : {
        pub actor: entities::UserId,
        pub content_id: entities::ContentId,
    } => {
        pub content: entities::Content,
        /// state after the toggle.
        pub liked: bool,
    }
}

usecase! {
    report : {
        pub actor: entities::UserId,
        pub content_id: entities::ContentId,
    } => {
        pub content: entities::Content,
        /// `false` when the actor had already reported it.
        pub first: bool,
    }
}

usecase! {
    comment : {
        pub actor: entities::UserId,
        pub content_id: entities::ContentId,
        pub body: String,
    } => {
        pub comment: entities::Comment,
    }
}

usecase! {
    delete_comment : {
        pub actor: entities::UserId,
        pub content_id: entities::ContentId,
        pub comment_id: entities::CommentId,
    } => {
        pub comment: entities::Comment,
    }
}

usecase! {
    report_comment : {
        pub actor: entities::UserId,
        pub content_id: entities::ContentId,
        pub comment_id: entities::CommentId,
    } => {
        pub first: bool,
    }
}

usecase! {
    withdraw : {
        pub owner: entities::UserId,
        pub content_id: entities::ContentId,
    } => {
        pub content: entities::Content,
    }
}
