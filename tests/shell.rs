use m_temple::conductors::{Conductor, Response};
use m_temple::config::Config;
use m_temple::in_memory;

fn conductor() -> Conductor { in_memory(&Config::default()).unwrap() }

async fn run(c: &Conductor, line: &str) -> Vec<Response> {
    c.conduct_line(line)
        .await
        .unwrap_or_else(|| panic!("no response for {:?}", line))
}

async fn ok(c: &Conductor, line: &str) -> Response {
    let mut resps = run(c, line).await;
    assert!(
        resps.iter().all(|r| !r.is_error()),
        "{:?} failed: {:?}",
        line,
        resps
    );

    resps.remove(0)
}

async fn err(c: &Conductor, line: &str) -> String {
    let resps = run(c, line).await;
    assert!(resps[0].is_error(), "{:?} should fail: {:?}", line, resps);

    resps[0].description.clone()
}

fn field<'a>(r: &'a Response, name: &str) -> &'a str {
    r.fields
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, v)| v.as_str())
        .unwrap_or_else(|| panic!("no field {:?} in {:?}", name, r))
}

async fn signup(c: &Conductor, first: &str) {
    ok(
        c,
        &format!(
            "auth signup {}@example.com password1 {} Doe KE",
            first.to_lowercase(),
            first
        ),
    )
    .await;
}

async fn signin(c: &Conductor, first: &str) {
    ok(
        c,
        &format!("auth signin {}@example.com password1", first.to_lowercase()),
    )
    .await;
}

#[tokio::test]
async fn like_then_unlike_notifies_once() {
    let c = conductor();

    signup(&c, "Ann").await;
    ok(&c, "content post quote \"be kind\" -d \"to everyone\"").await;

    signup(&c, "Bob").await;
    ok(&c, "content feed quote").await;
    let liked = ok(&c, "content like 1").await;
    assert_eq!(liked.title, "liked");
    assert_eq!(field(&liked, "state"), "committed");

    signin(&c, "Ann").await;
    let notes = ok(&c, "inbox notifications").await;
    assert_eq!(notes.fields.len(), 2);
    assert!(notes.fields[1].1.contains("liked your quote \"be kind\""));

    signin(&c, "Bob").await;
    ok(&c, "content feed quote").await;
    let unliked = ok(&c, "content like 1").await;
    assert_eq!(unliked.title, "unliked");
    assert!(unliked.fields[0].1.starts_with("♡ 0"));

    signin(&c, "Ann").await;
    let notes = ok(&c, "inbox notifications").await;
    assert_eq!(notes.fields.len(), 2);
}

#[tokio::test]
async fn signed_out_shell_is_refused() {
    let c = conductor();

    let e = err(&c, "content like 3f1c6f8e-27b1-4b1a-9a55-6a3ac4c1d0a1").await;
    assert_eq!(e, "You must be signed in to like!");
    assert!(err(&c, "wallet balance").await.contains("signed in"));

    let route = ok(&c, "route /profile").await;
    assert_eq!(route.description, "redirect to /signin");
}

#[tokio::test]
async fn wrong_pin_leaves_cart_and_balance() {
    let c = conductor();

    signup(&c, "Ann").await;
    ok(&c, "content post quote wisdom -p 15").await;

    signup(&c, "Bob").await;
    ok(&c, "user pin 1234 1234").await;
    ok(&c, "content feed quote").await;
    ok(&c, "inbox cart-add 1").await;

    assert_eq!(err(&c, "wallet checkout 9999").await, "Incorrect Pin, try again");
    assert!(err(&c, "wallet checkout 1234")
        .await
        .starts_with("You don't have enough balance"));

    let cart = ok(&c, "inbox cart").await;
    assert_eq!(field(&cart, "total"), "$15.00");
    assert!(ok(&c, "wallet balance").await.description.ends_with("$0.00"));
}

#[tokio::test]
async fn deleted_content_keeps_bookmarks() {
    let c = conductor();

    signup(&c, "Ann").await;
    let posted = ok(&c, "content post quote first").await;
    let id = field(&posted, "id").to_string();
    ok(&c, "content post quote second").await;

    signup(&c, "Bob").await;
    ok(&c, &format!("inbox bookmark {} -n later", id)).await;

    signin(&c, "Ann").await;
    ok(&c, &format!("content withdraw {}", id)).await;

    let feed = ok(&c, "content feed quote").await;
    assert_eq!(feed.fields.len(), 2);
    assert!(feed.fields[1].0.ends_with("second"));

    signin(&c, "Bob").await;
    let marks = ok(&c, "inbox bookmarks").await;
    assert_eq!(marks.fields.len(), 1);
    assert_eq!(marks.fields[0].0, "quote \"first\"");

    err(&c, &format!("content open {}", id)).await;
}

#[tokio::test]
async fn help_is_shown_not_failed() {
    let c = conductor();

    let help = run(&c, "help").await;
    assert!(!help[0].is_error());
    assert!(help[0].description.contains("wallet"));

    assert!(c.conduct_line("   ").await.is_none());
}
