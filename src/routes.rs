//! the fixed route table and the sign-in gate in front of it.
//!
//! gating is a navigation aid only; every operation checks the actor again.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Public,
    SignedIn,
    /// signed-in visitors are sent to the profile instead.
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub screen: &'static str,
    pub gate: Gate,
}

const fn route(path: &'static str, screen: &'static str, gate: Gate) -> Route {
    Route { path, screen, gate }
}

pub const ROUTES: &[Route] = &[
    route("/", "home", Gate::Public),
    route("/signin", "sign in", Gate::SignedOut),
    route("/register", "register", Gate::Public),
    route("/editprofile", "edit profile", Gate::Public),
    route("/profile", "profile", Gate::SignedIn),
    route("/plan", "plans", Gate::Public),
    route("/quote", "quotes", Gate::SignedIn),
    route("/image", "images", Gate::SignedIn),
    route("/imagesection", "image section", Gate::SignedIn),
    route("/notification", "notifications", Gate::SignedIn),
    route("/viewimage", "image detail", Gate::SignedIn),
    route("/viewpost", "post detail", Gate::Public),
    route("/video", "videos", Gate::SignedIn),
    route("/videosection1", "video section", Gate::Public),
    route("/viewvideo", "video detail", Gate::SignedIn),
    route("/ebook", "ebooks", Gate::SignedIn),
    route("/viewebook", "ebook detail", Gate::SignedIn),
    route("/myquotes", "my quotes", Gate::SignedIn),
    route("/myimages", "my images", Gate::SignedIn),
    route("/myvideos", "my videos", Gate::SignedIn),
    route("/myebooks", "my ebooks", Gate::SignedIn),
    route("/bookmark", "bookmarks", Gate::Public),
    route("/pin", "pin", Gate::SignedIn),
    route("/viewprofile", "profile view", Gate::SignedIn),
    route("/support", "support", Gate::Public),
    route("/cartpage", "cart", Gate::SignedIn),
    route("/withdraw", "withdraw", Gate::Public),
    route("/about", "about", Gate::Public),
];

pub const SIGN_IN: &str = "/signin";
pub const PROFILE: &str = "/profile";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Show(&'static Route),
    Redirect(&'static str),
    NotFound,
}

/// paths match case-insensitively and ignore a trailing slash.
pub fn resolve(path: &str, signed_in: bool) -> Resolved {
    let normalized = match path.trim() {
        "" | "/" => "/".to_string(),
        p => format!("/{}", p.trim_matches('/').to_ascii_lowercase()),
    };

    let found = match ROUTES.iter().find(|r| r.path == normalized) {
        Some(r) => r,
        None => return Resolved::NotFound,
    };

    match (found.gate, signed_in) {
        (Gate::SignedIn, false) => Resolved::Redirect(SIGN_IN),
        (Gate::SignedOut, true) => Resolved::Redirect(PROFILE),
        _ => Resolved::Show(found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protected_routes_redirect_to_sign_in() {
        assert_eq!(resolve("/cartpage", false), Resolved::Redirect(SIGN_IN));
        assert!(matches!(resolve("/cartpage", true), Resolved::Show(r) if r.screen == "cart"));
    }

    #[test]
    fn sign_in_redirects_when_signed_in() {
        assert_eq!(resolve("/signin", true), Resolved::Redirect(PROFILE));
        assert!(matches!(resolve("/signin", false), Resolved::Show(_)));
    }

    #[test]
    fn lookup_is_forgiving() {
        assert!(matches!(resolve("/viewVideo/", true), Resolved::Show(r) if r.path == "/viewvideo"));
        assert!(matches!(resolve("", false), Resolved::Show(r) if r.screen == "home"));
        assert_eq!(resolve("/nope", true), Resolved::NotFound);
    }
}
