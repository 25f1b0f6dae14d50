usecase! {
    register : {
        pub user_id: entities::UserId,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub nationality: String,
    } => {
        pub user: entities::User,
    }
}

usecase! {
    get : {
        pub user_id: entities::UserId,
    } => {
        pub user: entities::User,
    }
}

usecase! {
    gets : {
        pub query: crate::repositories::UserQuery,
        pub page: u32,
    } => {
        pub users: ::smallvec::SmallVec<[entities::User; 10]>,
        pub page: u32,
        pub pages: u32,
    }
}

usecase! {
    edit : {
        pub user_id: entities::UserId,
        pub username: Option<String>,
        pub bio: Option<String>,
    } => {
        pub user: entities::User,
    }
}

usecase! {
    profile_pic : {
        pub user_id: entities::UserId,
        pub email: String,
        pub bytes: Vec<u8>,
    } => {
        pub user: entities::User,
        pub url: String,
    }
}

usecase! {
    set_pin : {
        pub user_id: entities::UserId,
        pub current: Option<String>,
        pub new: String,
        pub confirm: String,
    } => {
        pub user: entities::User,
    }
}

usecase! {
    follow : {
        pub actor: entities::UserId,
        pub target: entities::UserId,
    } => {
        pub target: entities::User,
        /// the target already follows the actor.
        pub follow_back: bool,
    }
}

usecase! {
    unfollow : {
        pub actor: entities::UserId,
        pub target: entities::UserId,
    } => {
        pub target: entities::User,
    }
}

usecase! {
    report_account : {
        pub actor: entities::UserId,
        pub target: entities::UserId,
    } => {
        pub target: entities::User,
    }
}
