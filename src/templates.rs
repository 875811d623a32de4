use html_escape::{encode_double_quoted_attribute, encode_text};
use rust_embed::RustEmbed;
use spin_sdk::http::Response;

use crate::config;
use crate::core::helpers::html_response;
use crate::forms::FieldError;
use crate::models::models::{Post, User};

#[derive(RustEmbed)]
#[folder = "static"]
struct Assets;

fn load(name: &str) -> anyhow::Result<String> {
    let file = Assets::get(name)
        .ok_or_else(|| anyhow::anyhow!("template {} not found", name))?;
    Ok(String::from_utf8(file.data.to_vec())?)
}

fn flash_block(flashes: &[String]) -> String {
    flashes
        .iter()
        .map(|msg| format!(r#"<div class="flash">{}</div>"#, encode_text(msg)))
        .collect()
}

fn post_html(post: &Post, author: &User) -> String {
    format!(
        r#"<div class="post">
    <img class="avatar" src="{avatar}" alt="">
    <p><a href="/user/{nick_attr}">{nick}</a> said <span class="when">{when}</span>:</p>
    <p class="body">{body}</p>
</div>"#,
        avatar = encode_double_quoted_attribute(&author.avatar(50)),
        nick_attr = encode_double_quoted_attribute(&author.nickname),
        nick = encode_text(&author.nickname),
        when = post.timestamp.format("%Y-%m-%d %H:%M"),
        body = encode_text(&post.body),
    )
}

fn field_errors(errors: &[FieldError], field: &str) -> String {
    errors
        .iter()
        .filter(|e| e.field == field)
        .map(|e| format!(r#"<span class="error">{}</span>"#, encode_text(&e.message)))
        .collect()
}

/// Fallback-safe error page; used from error conversion paths where no
/// further failure can be tolerated.
pub fn error_page(status: u16) -> Response {
    let name = if status == 404 { "404.html" } else { "500.html" };
    let html = match Assets::get(name) {
        Some(file) => String::from_utf8_lossy(&file.data).to_string(),
        None if status == 404 => "<h1>File Not Found</h1>".to_string(),
        None => "<h1>An unexpected error has occurred</h1>".to_string(),
    };
    html_response(status, html)
}

pub fn render_login(
    flashes: &[String],
    openid_value: &str,
    openid_error: Option<&str>,
    next: &str,
) -> anyhow::Result<Response> {
    let mut html = load("login.html")?;

    let providers: String = config::openid_providers()
        .iter()
        .map(|p| {
            format!(
                r#"<li>{}: <span class="provider-url">{}</span></li>"#,
                encode_text(p.name),
                encode_text(p.url)
            )
        })
        .collect();

    html = html.replace("FLASH_MESSAGES", &flash_block(flashes));
    html = html.replace(
        "OPENID_VALUE",
        &encode_double_quoted_attribute(openid_value).to_string(),
    );
    html = html.replace(
        "OPENID_ERROR",
        &openid_error
            .map(|e| format!(r#"<span class="error">{}</span>"#, encode_text(e)))
            .unwrap_or_default(),
    );
    html = html.replace("NEXT_VALUE", &encode_double_quoted_attribute(next).to_string());
    html = html.replace("PROVIDER_LINKS", &providers);

    Ok(html_response(200, html))
}

pub fn render_index(
    user: &User,
    entries: &[(Post, User)],
    page: usize,
    has_older: bool,
    post_error: Option<&str>,
    flashes: &[String],
) -> anyhow::Result<Response> {
    let mut html = load("index.html")?;

    let feed: String = entries
        .iter()
        .map(|(post, author)| post_html(post, author))
        .collect();

    let mut pagination = String::new();
    if page > 1 {
        pagination.push_str(&format!(
            r#"<a href="/index/{}">&laquo; Newer posts</a> "#,
            page - 1
        ));
    }
    if has_older {
        pagination.push_str(&format!(
            r#"<a href="/index/{}">Older posts &raquo;</a>"#,
            page + 1
        ));
    }

    html = html.replace(
        "CURRENT_NICKNAME",
        &encode_text(&user.nickname).to_string(),
    );
    html = html.replace("FLASH_MESSAGES", &flash_block(flashes));
    html = html.replace(
        "POST_ERROR",
        &post_error
            .map(|e| format!(r#"<span class="error">{}</span>"#, encode_text(e)))
            .unwrap_or_default(),
    );
    html = html.replace("FEED_POSTS", &feed);
    html = html.replace("PAGINATION", &pagination);

    Ok(html_response(200, html))
}

pub fn render_user_page(
    viewer: &User,
    profile: &User,
    posts: &[Post],
    following: bool,
    follower_count: usize,
    followed_count: usize,
    flashes: &[String],
) -> anyhow::Result<Response> {
    let mut html = load("user.html")?;

    let about = if profile.about_me.is_empty() {
        String::new()
    } else {
        format!(
            r#"<p class="about">{}</p>"#,
            encode_text(&profile.about_me)
        )
    };

    let last_seen = profile
        .last_seen
        .map(|t| format!(r#"<p class="seen">Last seen: {}</p>"#, t.format("%Y-%m-%d %H:%M")))
        .unwrap_or_default();

    let follow_section = if viewer.id == profile.id {
        r#"<a href="/edit">Edit your profile</a>"#.to_string()
    } else if following {
        format!(
            r#"<a href="/unfollow/{0}">Unfollow</a>"#,
            encode_double_quoted_attribute(&profile.nickname)
        )
    } else {
        format!(
            r#"<a href="/follow/{0}">Follow</a>"#,
            encode_double_quoted_attribute(&profile.nickname)
        )
    };

    let user_posts: String = posts.iter().map(|p| post_html(p, profile)).collect();

    html = html.replace(
        "CURRENT_NICKNAME",
        &encode_text(&viewer.nickname).to_string(),
    );
    html = html.replace("FLASH_MESSAGES", &flash_block(flashes));
    html = html.replace(
        "AVATAR_URL",
        &encode_double_quoted_attribute(&profile.avatar(128)).to_string(),
    );
    html = html.replace(
        "PROFILE_NICKNAME",
        &encode_text(&profile.nickname).to_string(),
    );
    html = html.replace("ABOUT_ME_SECTION", &about);
    html = html.replace("LAST_SEEN_SECTION", &last_seen);
    html = html.replace("FOLLOWER_COUNT", &follower_count.to_string());
    html = html.replace("FOLLOWED_COUNT", &followed_count.to_string());
    html = html.replace("FOLLOW_SECTION", &follow_section);
    html = html.replace("USER_POSTS", &user_posts);

    Ok(html_response(200, html))
}

pub fn render_edit(
    user: &User,
    nickname_value: &str,
    about_me_value: &str,
    errors: &[FieldError],
    flashes: &[String],
) -> anyhow::Result<Response> {
    let mut html = load("edit.html")?;

    html = html.replace(
        "CURRENT_NICKNAME",
        &encode_text(&user.nickname).to_string(),
    );
    html = html.replace("FLASH_MESSAGES", &flash_block(flashes));
    html = html.replace(
        "NICKNAME_VALUE",
        &encode_double_quoted_attribute(nickname_value).to_string(),
    );
    html = html.replace("NICKNAME_ERRORS", &field_errors(errors, "nickname"));
    html = html.replace(
        "ABOUT_ME_VALUE",
        &encode_text(about_me_value).to_string(),
    );
    html = html.replace("ABOUT_ME_ERRORS", &field_errors(errors, "about_me"));

    Ok(html_response(200, html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::models::Role;
    use chrono::Utc;

    fn user(id: i64, nickname: &str) -> User {
        User {
            id,
            nickname: nickname.to_string(),
            email: format!("{}@example.com", nickname),
            role: Role::User,
            about_me: String::new(),
            last_seen: None,
        }
    }

    #[test]
    fn post_bodies_are_escaped_in_the_feed() {
        let author = user(1, "john");
        let post = Post {
            id: 1,
            user_id: 1,
            body: "<script>alert(1)</script>".to_string(),
            timestamp: Utc::now(),
        };
        let resp = render_index(&author, &[(post, author.clone())], 1, false, None, &[]).unwrap();
        let body = String::from_utf8_lossy(resp.body());
        assert!(body.contains("&lt;script&gt;"));
        assert!(!body.contains("<script>alert"));
    }

    #[test]
    fn pagination_links_follow_the_page_window() {
        let author = user(1, "john");
        let resp = render_index(&author, &[], 2, true, None, &[]).unwrap();
        let body = String::from_utf8_lossy(resp.body());
        assert!(body.contains(r#"href="/index/1""#));
        assert!(body.contains(r#"href="/index/3""#));
    }

    #[test]
    fn profile_offers_follow_link_only_for_others() {
        let viewer = user(1, "john");
        let other = user(2, "susan");
        let resp =
            render_user_page(&viewer, &other, &[], false, 0, 0, &[]).unwrap();
        let body = String::from_utf8_lossy(resp.body());
        assert!(body.contains("/follow/susan"));

        let own = render_user_page(&viewer, &viewer, &[], true, 1, 1, &[]).unwrap();
        let body = String::from_utf8_lossy(own.body());
        assert!(body.contains("/edit"));
        assert!(!body.contains("/follow/john"));
    }

    #[test]
    fn error_pages_render_for_known_statuses() {
        assert_eq!(*error_page(404).status(), 404);
        assert_eq!(*error_page(500).status(), 500);
    }
}
