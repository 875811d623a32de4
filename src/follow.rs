use anyhow::Result;
use spin_sdk::http::{Request, Response};

use crate::auth::{current_user, redirect_to_login};
use crate::core::helpers::flash_redirect;
use crate::core::repo::Repo;

/// GET /follow/<nickname>
pub fn follow(repo: &dyn Repo, req: &Request, nickname: &str) -> Result<Response> {
    handle_edge(repo, req, nickname, EdgeChange::Follow)
}

/// GET /unfollow/<nickname>
pub fn unfollow(repo: &dyn Repo, req: &Request, nickname: &str) -> Result<Response> {
    handle_edge(repo, req, nickname, EdgeChange::Unfollow)
}

enum EdgeChange {
    Follow,
    Unfollow,
}

fn handle_edge(
    repo: &dyn Repo,
    req: &Request,
    nickname: &str,
    change: EdgeChange,
) -> Result<Response> {
    let Some(auth) = current_user(repo, req)? else {
        return Ok(redirect_to_login(req.path()));
    };

    let nickname = urlencoding::decode(nickname)
        .map(|c| c.to_string())
        .unwrap_or_else(|_| nickname.to_string());

    let Some(target) = repo.user_by_nickname(&nickname)? else {
        return flash_redirect(
            repo,
            Some(auth.token),
            &format!("User {} not found.", nickname),
            "/index",
        );
    };

    if target.id == auth.user.id {
        let message = match change {
            EdgeChange::Follow => "You can't follow yourself!",
            EdgeChange::Unfollow => "You can't unfollow yourself!",
        };
        return flash_redirect(repo, Some(auth.token), message, "/index");
    }

    // An already-present (resp. absent) edge reports as failure here; the
    // caller can't tell that apart from any other failure.
    let changed = match change {
        EdgeChange::Follow => repo.follow(auth.user.id, target.id)?,
        EdgeChange::Unfollow => repo.unfollow(auth.user.id, target.id)?,
    };
    if !changed {
        let message = match change {
            EdgeChange::Follow => format!("Cannot follow {}.", nickname),
            EdgeChange::Unfollow => format!("Cannot unfollow {}.", nickname),
        };
        return flash_redirect(repo, Some(auth.token), &message, "/index");
    }

    log::info!(
        "user {} now {} user {}",
        auth.user.id,
        match change {
            EdgeChange::Follow => "follows",
            EdgeChange::Unfollow => "no longer follows",
        },
        target.id
    );
    let message = match change {
        EdgeChange::Follow => format!("You are now following {}!", nickname),
        EdgeChange::Unfollow => format!("You have stopped following {}!", nickname),
    };
    flash_redirect(
        repo,
        Some(auth.token),
        &message,
        &format!("/user/{}", urlencoding::encode(&nickname)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repo::MemRepo;
    use crate::models::models::Role;
    use spin_sdk::http::Method;

    fn signed_in_user(repo: &MemRepo, nickname: &str) -> (i64, String) {
        let user = repo
            .create_user(nickname, &format!("{}@example.com", nickname), Role::User)
            .unwrap();
        let token = repo.create_session(user.id, false).unwrap();
        (user.id, token)
    }

    fn get(uri: &str, token: &str) -> Request {
        Request::builder()
            .method(Method::Get)
            .uri(uri)
            .header("cookie", format!("session={}", token))
            .body(Vec::new())
            .build()
    }

    fn location(resp: &Response) -> &str {
        resp.header("Location").and_then(|v| v.as_str()).unwrap_or("")
    }

    #[test]
    fn follow_adds_edge_and_redirects_to_profile() {
        let repo = MemRepo::new();
        let (john, token) = signed_in_user(&repo, "john");
        let (susan, _) = signed_in_user(&repo, "susan");

        let resp = follow(&repo, &get("/follow/susan", &token), "susan").unwrap();
        assert_eq!(location(&resp), "/user/susan");
        assert!(repo.is_following(john, susan).unwrap());
        assert_eq!(
            repo.take_flashes(&token).unwrap(),
            vec!["You are now following susan!"]
        );
    }

    #[test]
    fn double_follow_reports_failure_without_duplicating() {
        let repo = MemRepo::new();
        let (john, token) = signed_in_user(&repo, "john");
        let (susan, _) = signed_in_user(&repo, "susan");
        repo.follow(john, susan).unwrap();

        let resp = follow(&repo, &get("/follow/susan", &token), "susan").unwrap();
        assert_eq!(location(&resp), "/index");
        assert_eq!(repo.followed_ids(john).unwrap(), vec![susan]);
        assert_eq!(
            repo.take_flashes(&token).unwrap(),
            vec!["Cannot follow susan."]
        );
    }

    #[test]
    fn unfollow_of_non_followed_reports_failure() {
        let repo = MemRepo::new();
        let (_, token) = signed_in_user(&repo, "john");
        signed_in_user(&repo, "susan");

        let resp = unfollow(&repo, &get("/unfollow/susan", &token), "susan").unwrap();
        assert_eq!(location(&resp), "/index");
        assert_eq!(
            repo.take_flashes(&token).unwrap(),
            vec!["Cannot unfollow susan."]
        );
    }

    #[test]
    fn following_yourself_by_hand_is_blocked() {
        let repo = MemRepo::new();
        let (_, token) = signed_in_user(&repo, "john");

        let resp = follow(&repo, &get("/follow/john", &token), "john").unwrap();
        assert_eq!(location(&resp), "/index");
        assert_eq!(
            repo.take_flashes(&token).unwrap(),
            vec!["You can't follow yourself!"]
        );
    }

    #[test]
    fn unknown_target_flashes_not_found() {
        let repo = MemRepo::new();
        let (_, token) = signed_in_user(&repo, "john");

        let resp = follow(&repo, &get("/follow/ghost", &token), "ghost").unwrap();
        assert_eq!(location(&resp), "/index");
        assert_eq!(
            repo.take_flashes(&token).unwrap(),
            vec!["User ghost not found."]
        );
    }
}
