use anyhow::Result;
use spin_sdk::http::{Request, Response};

use crate::auth::{current_user, redirect_to_login, AuthContext};
use crate::config;
use crate::core::helpers::flash_redirect;
use crate::core::query_params::parse_form_params;
use crate::core::repo::Repo;
use crate::forms::PostForm;
use crate::models::models::{Post, User};
use crate::templates;

fn with_authors(repo: &dyn Repo, posts: Vec<Post>) -> Result<Vec<(Post, User)>> {
    let mut entries = Vec::with_capacity(posts.len());
    for post in posts {
        if let Some(author) = repo.user(post.user_id)? {
            entries.push((post, author));
        }
    }
    Ok(entries)
}

fn render_feed(
    repo: &dyn Repo,
    auth: &AuthContext,
    page: usize,
    post_error: Option<&str>,
    flashes: &[String],
) -> Result<Response> {
    let per_page = config::posts_per_page();
    let posts = repo.followed_posts(auth.user.id, page, per_page)?;
    // A full page alone doesn't prove there is more; peek at the next one.
    let has_older = posts.len() == per_page
        && !repo.followed_posts(auth.user.id, page + 1, per_page)?.is_empty();
    let entries = with_authors(repo, posts)?;
    templates::render_index(&auth.user, &entries, page, has_older, post_error, flashes)
}

/// GET / , /index , /index/<page>
pub fn index(repo: &dyn Repo, req: &Request, page: usize) -> Result<Response> {
    let Some(auth) = current_user(repo, req)? else {
        return Ok(redirect_to_login(req.path()));
    };
    let flashes = repo.take_flashes(&auth.token)?;
    render_feed(repo, &auth, page, None, &flashes)
}

/// POST / , /index
pub fn submit_post(repo: &dyn Repo, req: &Request) -> Result<Response> {
    let Some(auth) = current_user(repo, req)? else {
        return Ok(redirect_to_login(req.path()));
    };

    let params = parse_form_params(req.body());
    let form = PostForm::from_params(&params);
    let errors = form.validate();
    if let Some(error) = errors.first() {
        return render_feed(repo, &auth, 1, Some(&error.message), &[]);
    }

    let post = repo.create_post(auth.user.id, &form.body)?;
    log::info!("user {} posted {}", auth.user.id, post.id);

    // Redirect after post so a refresh doesn't resubmit.
    flash_redirect(repo, Some(auth.token), "Your post is now live!", "/index")
}
