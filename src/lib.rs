pub mod auth;
pub mod config;
pub mod core;
pub mod follow;
pub mod forms;
pub mod models;
pub mod posts;
pub mod templates;
pub mod users;

use spin_sdk::http::{Request, Response};
#[cfg(target_arch = "wasm32")]
use spin_sdk::http::IntoResponse;
#[cfg(target_arch = "wasm32")]
use spin_sdk::http_component;

use crate::core::errors::AppError;
#[cfg(target_arch = "wasm32")]
use crate::core::repo::KvRepo;
use crate::core::repo::Repo;
use crate::core::static_server;

#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let repo = KvRepo::open()?;
    Ok(route(&repo, &req))
}

/// Map verb + path to a handler. Shared by the Spin component and the
/// native development server.
pub fn route(repo: &dyn Repo, req: &Request) -> Response {
    let method = req.method().to_string();
    let path = req.path();

    let result = match (method.as_str(), path) {
        ("GET", "/") | ("GET", "/index") => posts::index(repo, req, 1),
        ("GET", p) if p.starts_with("/index/") => {
            match p.trim_start_matches("/index/").parse::<usize>() {
                Ok(page) => posts::index(repo, req, page.max(1)),
                Err(_) => Ok(AppError::NotFound.into()),
            }
        }
        ("POST", "/") | ("POST", "/index") => posts::submit_post(repo, req),
        ("GET", "/login") => auth::login_form(repo, req),
        ("POST", "/login") => auth::begin_login(repo, req),
        ("GET", "/login/verify") => auth::verify_login(repo, req),
        ("GET", "/logout") => auth::logout(repo, req),
        ("GET", "/edit") => users::edit_form(repo, req),
        ("POST", "/edit") => users::edit_submit(repo, req),
        ("GET", p) if p.starts_with("/user/") => {
            users::profile(repo, req, p.trim_start_matches("/user/"))
        }
        ("GET", p) if p.starts_with("/follow/") => {
            follow::follow(repo, req, p.trim_start_matches("/follow/"))
        }
        ("GET", p) if p.starts_with("/unfollow/") => {
            follow::unfollow(repo, req, p.trim_start_matches("/unfollow/"))
        }
        ("GET", p) if p.contains('.') => static_server::serve_static(p),
        _ => Ok(AppError::NotFound.into()),
    };

    match result {
        Ok(resp) => resp,
        Err(err) => {
            log::error!("{} {} failed: {:#}", method, path, err);
            AppError::Internal(err.to_string()).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repo::MemRepo;
    use spin_sdk::http::Method;

    #[test]
    fn unknown_routes_render_the_404_page() {
        let repo = MemRepo::new();
        let req = Request::builder()
            .method(Method::Get)
            .uri("/no/such/route")
            .body(Vec::new())
            .build();
        let resp = route(&repo, &req);
        assert_eq!(*resp.status(), 404);
    }

    #[test]
    fn bad_page_numbers_are_not_found() {
        let repo = MemRepo::new();
        let req = Request::builder()
            .method(Method::Get)
            .uri("/index/notanumber")
            .body(Vec::new())
            .build();
        let resp = route(&repo, &req);
        assert_eq!(*resp.status(), 404);
    }

    #[test]
    fn stylesheet_is_served_with_its_mime_type() {
        let repo = MemRepo::new();
        let req = Request::builder()
            .method(Method::Get)
            .uri("/style.css")
            .body(Vec::new())
            .build();
        let resp = route(&repo, &req);
        assert_eq!(*resp.status(), 200);
        let content_type = resp
            .header("Content-Type")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        assert!(content_type.starts_with("text/css"));
    }

    #[test]
    fn home_redirects_anonymous_visitors_to_login() {
        let repo = MemRepo::new();
        let req = Request::builder().method(Method::Get).uri("/").body(Vec::new()).build();
        let resp = route(&repo, &req);
        assert_eq!(*resp.status(), 302);
        let location = resp.header("Location").and_then(|v| v.as_str()).unwrap();
        assert!(location.starts_with("/login"));
    }
}
