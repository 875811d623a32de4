use anyhow::Result;
use chrono::Utc;
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config;
use crate::core::helpers::{
    clear_session_cookie, flash_redirect, local_part, redirect, redirect_with_cookie,
    sanitize_text, session_cookie, session_token,
};
use crate::core::query_params::{get_string, parse_form_params, parse_query_params};
use crate::core::repo::Repo;
use crate::forms::LoginForm;
use crate::models::models::{PendingLogin, Role, User};
use crate::templates;
use crate::users::make_unique_nickname;

pub struct AuthContext {
    pub user: User,
    pub token: String,
}

/// Resolve the current user from the session cookie. Every authenticated
/// request writes `last_seen` back, with no debouncing.
pub fn current_user(repo: &dyn Repo, req: &Request) -> Result<Option<AuthContext>> {
    let Some(token) = session_token(req) else {
        return Ok(None);
    };
    let Some(session) = repo.session(&token)? else {
        return Ok(None);
    };

    let limit = if session.remember {
        config::remembered_session_expiration_hours()
    } else {
        config::session_expiration_hours()
    };
    if (Utc::now() - session.created_at).num_hours() > limit {
        repo.delete_session(&token)?;
        return Ok(None);
    }

    let Some(mut user) = repo.user(session.user_id)? else {
        return Ok(None);
    };
    user.last_seen = Some(Utc::now());
    repo.save_user(&user)?;

    Ok(Some(AuthContext { user, token }))
}

pub fn redirect_to_login(requested_path: &str) -> Response {
    redirect(&format!(
        "/login?next={}",
        urlencoding::encode(requested_path)
    ))
}

/// GET /login
pub fn login_form(repo: &dyn Repo, req: &Request) -> Result<Response> {
    if current_user(repo, req)?.is_some() {
        return Ok(redirect("/index"));
    }
    let flashes = match session_token(req) {
        Some(token) => repo.take_flashes(&token)?,
        None => Vec::new(),
    };
    let params = parse_query_params(req.uri());
    let next = get_string(&params, "next");
    templates::render_login(&flashes, "", None, &next)
}

/// POST /login: park the remember-me preference and hand off to the
/// identity provider. The handshake itself is the provider's business;
/// it comes back to us at /login/verify.
pub fn begin_login(repo: &dyn Repo, req: &Request) -> Result<Response> {
    if current_user(repo, req)?.is_some() {
        return Ok(redirect("/index"));
    }

    let params = parse_form_params(req.body());
    let form = LoginForm::from_params(&params);
    let errors = form.validate();
    if let Some(error) = errors.first() {
        let next = form.next.as_deref().unwrap_or("");
        return templates::render_login(&[], &form.openid, Some(error.message.as_str()), next);
    }

    let state = Uuid::new_v4().to_string();
    repo.put_pending_login(
        &state,
        &PendingLogin {
            remember: form.remember_me,
            next: form.next.clone(),
        },
    )?;

    let callback = format!("/login/verify?state={}", state);
    let sep = if form.openid.contains('?') { '&' } else { '?' };
    let location = format!(
        "{}{}openid.return_to={}",
        form.openid,
        sep,
        urlencoding::encode(&callback)
    );
    log::info!("login handshake started via {}", form.openid);
    Ok(redirect(&location))
}

/// GET /login/verify: consume the identity provider's assertion.
pub fn verify_login(repo: &dyn Repo, req: &Request) -> Result<Response> {
    let params = parse_query_params(req.uri());
    let state = get_string(&params, "state");
    let email = get_string(&params, "email");
    let nickname = get_string(&params, "nickname");

    let pending = if state.is_empty() {
        None
    } else {
        repo.take_pending_login(&state)?
    };
    let Some(pending) = pending else {
        log::warn!("assertion with unknown or reused state token");
        return flash_redirect(
            repo,
            session_token(req),
            "Invalid login. Please try again.",
            "/login",
        );
    };

    // Without a valid email no one can log in.
    if email.is_empty() {
        return flash_redirect(
            repo,
            session_token(req),
            "Invalid login. Please try again.",
            "/login",
        );
    }

    let user = match repo.user_by_email(&email)? {
        Some(user) => user,
        None => {
            let mut candidate = sanitize_text(&nickname);
            if candidate.is_empty() {
                candidate = sanitize_text(local_part(&email));
            }
            let nickname = make_unique_nickname(repo, &candidate)?;
            let user = repo.create_user(&nickname, &email, Role::User)?;
            // Users follow themselves so their own posts land in their feed.
            repo.follow(user.id, user.id)?;
            log::info!("created user {} <{}>", user.nickname, user.email);
            user
        }
    };

    let token = repo.create_session(user.id, pending.remember)?;
    let max_age = pending
        .remember
        .then(|| config::remembered_session_expiration_hours() * 3600);
    let location = pending.next.as_deref().unwrap_or("/index");
    Ok(redirect_with_cookie(
        location,
        &session_cookie(&token, max_age),
    ))
}

/// GET /logout
pub fn logout(repo: &dyn Repo, req: &Request) -> Result<Response> {
    if let Some(token) = session_token(req) {
        repo.delete_session(&token)?;
    }
    Ok(redirect_with_cookie("/index", &clear_session_cookie()))
}
