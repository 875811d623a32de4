use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config;
use crate::core::repo::Repo;

pub fn html_response(status: u16, html: String) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "text/html; charset=utf-8")
        .body(html.into_bytes())
        .build()
}

pub fn redirect(location: &str) -> Response {
    Response::builder()
        .status(302)
        .header("Location", location)
        .body(Vec::new())
        .build()
}

pub fn redirect_with_cookie(location: &str, cookie: &str) -> Response {
    Response::builder()
        .status(302)
        .header("Location", location)
        .header("Set-Cookie", cookie)
        .body(Vec::new())
        .build()
}

/// Session token carried by the request's cookie header, if any.
pub fn session_token(req: &Request) -> Option<String> {
    let cookies = req.header("cookie")?.as_str()?;
    let prefix = format!("{}=", config::SESSION_COOKIE);
    for part in cookies.split(';') {
        if let Some(value) = part.trim().strip_prefix(&prefix) {
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

pub fn session_cookie(token: &str, max_age_seconds: Option<i64>) -> String {
    match max_age_seconds {
        Some(age) => format!(
            "{}={}; Path=/; HttpOnly; Max-Age={}",
            config::SESSION_COOKIE,
            token,
            age
        ),
        None => format!("{}={}; Path=/; HttpOnly", config::SESSION_COOKIE, token),
    }
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; Max-Age=0", config::SESSION_COOKIE)
}

/// Queue a flash message and redirect. When the client has no cookie yet,
/// a bare token is issued so the notice survives the redirect.
pub fn flash_redirect(
    repo: &dyn Repo,
    token: Option<String>,
    message: &str,
    location: &str,
) -> anyhow::Result<Response> {
    match token {
        Some(token) => {
            repo.push_flash(&token, message)?;
            Ok(redirect(location))
        }
        None => {
            let token = Uuid::new_v4().to_string();
            repo.push_flash(&token, message)?;
            Ok(redirect_with_cookie(location, &session_cookie(&token, None)))
        }
    }
}

/// The part of an email address before the '@'.
pub fn local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Strip all HTML from user-supplied text.
pub fn sanitize_text(text: &str) -> String {
    ammonia::Builder::default()
        .tags(std::collections::HashSet::new())
        .clean(text)
        .to_string()
}
