//! End-to-end tests against a running server (`cargo run`, then
//! `cargo test -- --ignored`). The login-form handshake is skipped by
//! driving /login/verify directly, the way a provider callback would.

use std::sync::Mutex;

const BASE_URL: &str = "http://127.0.0.1:3000";
static TEST_LOCK: Mutex<()> = Mutex::new(());

fn lock_test() -> std::sync::MutexGuard<'static, ()> {
    TEST_LOCK.lock().unwrap()
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .cookie_store(true)
        .build()
        .expect("Failed to build client")
}

/// Begin a login, then simulate the provider assertion. Returns the state
/// token extracted from the redirect to the provider.
async fn sign_in(client: &reqwest::Client, email: &str, nickname: &str) {
    let resp = client
        .post(format!("{}/login", BASE_URL))
        .form(&[("openid", "https://me.yahoo.com"), ("remember_me", "on")])
        .send()
        .await
        .expect("Failed to begin login");
    assert_eq!(resp.status(), 302);

    let location = resp
        .headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .expect("redirect to provider");
    let state = location
        .split("state%3D")
        .nth(1)
        .expect("state token in return_to");

    let resp = client
        .get(format!(
            "{}/login/verify?state={}&email={}&nickname={}",
            BASE_URL, state, email, nickname
        ))
        .send()
        .await
        .expect("Failed to verify login");
    assert_eq!(resp.status(), 302);
}

#[tokio::test]
#[ignore = "requires a running server on 127.0.0.1:3000"]
async fn anonymous_home_redirects_to_login() {
    let _lock = lock_test();
    let resp = client()
        .get(format!("{}/index", BASE_URL))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 302);
    let location = resp
        .headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(location.starts_with("/login"));
}

#[tokio::test]
#[ignore = "requires a running server on 127.0.0.1:3000"]
async fn full_post_and_follow_flow() {
    let _lock = lock_test();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let client = client();

    sign_in(&client, &format!("flow_{}@example.com", suffix), "").await;

    // Post from the home page form
    let resp = client
        .post(format!("{}/index", BASE_URL))
        .form(&[("post", "Test post from integration test!")])
        .send()
        .await
        .expect("Failed to create post");
    assert_eq!(resp.status(), 302);

    // The self-follow puts it in our own feed
    let resp = client
        .get(format!("{}/index", BASE_URL))
        .send()
        .await
        .expect("Failed to load feed");
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains("Test post from integration test!"));
    assert!(body.contains("Your post is now live!"));
}

#[tokio::test]
#[ignore = "requires a running server on 127.0.0.1:3000"]
async fn profile_editing_round_trip() {
    let _lock = lock_test();
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let client = client();

    sign_in(&client, &format!("edit_{}@example.com", suffix), "").await;

    let nickname = format!("edited_{}", suffix);
    let resp = client
        .post(format!("{}/edit", BASE_URL))
        .form(&[("nickname", nickname.as_str()), ("about_me", "hello there")])
        .send()
        .await
        .expect("Failed to edit profile");
    assert_eq!(resp.status(), 302);

    let resp = client
        .get(format!("{}/user/{}", BASE_URL, nickname))
        .send()
        .await
        .expect("Failed to load profile");
    assert_eq!(resp.status(), 200);
    let body = resp.text().await.unwrap();
    assert!(body.contains(&nickname));
    assert!(body.contains("hello there"));
}

#[tokio::test]
#[ignore = "requires a running server on 127.0.0.1:3000"]
async fn assertion_without_email_bounces_back_to_login() {
    let _lock = lock_test();
    let resp = client()
        .get(format!("{}/login/verify?state=bogus&email=", BASE_URL))
        .send()
        .await
        .expect("Failed to make request");
    assert_eq!(resp.status(), 302);
    let location = resp
        .headers()
        .get("Location")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert_eq!(location, "/login");
}
