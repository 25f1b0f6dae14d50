usecase! {
    notifications : {
        pub owner: entities::UserId,
    } => {
        pub items: Vec<entities::Notification>,
    }
}

usecase! {
    bookmark : {
        pub actor: entities::UserId,
        pub content_id: entities::ContentId,
        pub note: String,
    } => {
        pub bookmark: entities::Bookmark,
    }
}

usecase! {
    bookmarks : {
        pub owner: entities::UserId,
    } => {
        pub items: Vec<entities::Bookmark>,
    }
}

usecase! {
    unbookmark : {
        pub owner: entities::UserId,
        pub item_id: ::uuid::Uuid,
    } => {
        pub bookmark: entities::Bookmark,
    }
}

usecase! {
    cart_add : {
        pub actor: entities::UserId,
        pub content_id: entities::ContentId,
    } => {
        pub entry: entities::CartEntry,
    }
}

usecase! {
    cart : {
        pub owner: entities::UserId,
    } => {
        pub items: Vec<entities::CartEntry>,
        pub total: entities::Cents,
    }
}

usecase! {
    cart_remove : {
        pub owner: entities::UserId,
        pub item_id: ::uuid::Uuid,
    } => {
        pub entry: entities::CartEntry,
    }
}

usecase! {
    bookmark_to_cart : {
        pub owner: entities::UserId,
        pub item_id: ::uuid::Uuid,
    } => {
        pub entry: entities::CartEntry,
    }
}

usecase! {
    cart_to_bookmark : {
        pub owner: entities::UserId,
        pub item_id: ::uuid::Uuid,
    } => {
        pub bookmark: entities::Bookmark,
    }
}

usecase! {
    support_open : {
        pub owner: entities::UserId,
    } => {
        pub messages: Vec<entities::SupportMessage>,
    }
}

usecase! {
    support_send : {
        pub owner: entities::UserId,
        pub text: String,
    } => {
        pub messages: Vec<entities::SupportMessage>,
    }
}
