use anyhow::Result;
use spin_sdk::http::{Request, Response};

use crate::auth::{current_user, redirect_to_login};
use crate::core::helpers::flash_redirect;
use crate::core::query_params::parse_form_params;
use crate::core::repo::Repo;
use crate::forms::EditForm;
use crate::templates;

/// Returns the candidate unchanged when free; otherwise appends successive
/// integers starting at 2, re-checking the repository each attempt, until a
/// free nickname is found. The loop is unbounded.
pub fn make_unique_nickname(repo: &dyn Repo, candidate: &str) -> Result<String> {
    if repo.user_by_nickname(candidate)?.is_none() {
        return Ok(candidate.to_string());
    }
    let mut version = 2;
    loop {
        let attempt = format!("{}{}", candidate, version);
        if repo.user_by_nickname(&attempt)?.is_none() {
            return Ok(attempt);
        }
        version += 1;
    }
}

/// GET /user/<nickname>
pub fn profile(repo: &dyn Repo, req: &Request, nickname: &str) -> Result<Response> {
    let Some(auth) = current_user(repo, req)? else {
        return Ok(redirect_to_login(req.path()));
    };

    let nickname = urlencoding::decode(nickname)
        .map(|c| c.to_string())
        .unwrap_or_else(|_| nickname.to_string());

    let Some(user) = repo.user_by_nickname(&nickname)? else {
        return flash_redirect(
            repo,
            Some(auth.token),
            &format!("User {} not found.", nickname),
            "/index",
        );
    };

    let posts = repo.posts_by_author(user.id)?;
    let following = repo.is_following(auth.user.id, user.id)?;
    let follower_count = repo.follower_count(user.id)?;
    let followed_count = repo.followed_ids(user.id)?.len();
    let flashes = repo.take_flashes(&auth.token)?;

    templates::render_user_page(
        &auth.user,
        &user,
        &posts,
        following,
        follower_count,
        followed_count,
        &flashes,
    )
}

/// GET /edit
pub fn edit_form(repo: &dyn Repo, req: &Request) -> Result<Response> {
    let Some(auth) = current_user(repo, req)? else {
        return Ok(redirect_to_login(req.path()));
    };
    let flashes = repo.take_flashes(&auth.token)?;
    templates::render_edit(
        &auth.user,
        &auth.user.nickname,
        &auth.user.about_me,
        &[],
        &flashes,
    )
}

/// POST /edit
pub fn edit_submit(repo: &dyn Repo, req: &Request) -> Result<Response> {
    let Some(auth) = current_user(repo, req)? else {
        return Ok(redirect_to_login(req.path()));
    };

    let params = parse_form_params(req.body());
    let form = EditForm::from_params(&params);
    let errors = form.validate(repo, &auth.user.nickname)?;
    if !errors.is_empty() {
        return templates::render_edit(&auth.user, &form.nickname, &form.about_me, &errors, &[]);
    }

    let mut user = auth.user;
    user.nickname = form.nickname;
    user.about_me = form.about_me;
    repo.save_user(&user)?;
    log::info!("user {} updated their profile", user.id);

    flash_redirect(
        repo,
        Some(auth.token),
        "Your changes have been saved.",
        "/edit",
    )
}
