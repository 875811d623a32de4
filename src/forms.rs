use std::collections::HashMap;

use crate::config;
use crate::core::helpers::sanitize_text;
use crate::core::query_params::{get_string, has_flag};
use crate::core::repo::Repo;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl FieldError {
    fn new(field: &'static str, message: &str) -> Self {
        Self {
            field,
            message: message.to_string(),
        }
    }
}

pub struct LoginForm {
    pub openid: String,
    pub remember_me: bool,
    pub next: Option<String>,
}

impl LoginForm {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let next = get_string(params, "next");
        Self {
            openid: get_string(params, "openid"),
            remember_me: has_flag(params, "remember_me"),
            next: (!next.is_empty()).then_some(next),
        }
    }

    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.openid.is_empty() {
            errors.push(FieldError::new("openid", "This field is required."));
        }
        errors
    }
}

pub struct EditForm {
    pub nickname: String,
    pub about_me: String,
}

impl EditForm {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            nickname: sanitize_text(&get_string(params, "nickname")),
            about_me: sanitize_text(&get_string(params, "about_me")),
        }
    }

    /// Standard required/length checks, plus a nickname uniqueness check
    /// that only fires when the nickname actually changed.
    pub fn validate(
        &self,
        repo: &dyn Repo,
        original_nickname: &str,
    ) -> anyhow::Result<Vec<FieldError>> {
        let mut errors = Vec::new();
        if self.nickname.is_empty() {
            errors.push(FieldError::new("nickname", "This field is required."));
        }
        if self.about_me.chars().count() > config::MAX_ABOUT_ME_LENGTH {
            errors.push(FieldError::new(
                "about_me",
                "About me must be 140 characters or fewer.",
            ));
        }
        if !self.nickname.is_empty()
            && self.nickname != original_nickname
            && repo.user_by_nickname(&self.nickname)?.is_some()
        {
            errors.push(FieldError::new(
                "nickname",
                "This nickname is already in use. Please choose another one.",
            ));
        }
        Ok(errors)
    }
}

pub struct PostForm {
    pub body: String,
}

impl PostForm {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        Self {
            body: get_string(params, "post"),
        }
    }

    // No upper bound here; the storage layer clips at the column width.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.body.is_empty() {
            errors.push(FieldError::new("post", "This field is required."));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query_params::parse_form_params;
    use crate::core::repo::MemRepo;
    use crate::models::models::Role;

    #[test]
    fn login_form_requires_a_provider_url() {
        let form = LoginForm::from_params(&parse_form_params(b"openid=&remember_me=on"));
        assert!(form.remember_me);
        assert_eq!(form.validate().len(), 1);

        let form =
            LoginForm::from_params(&parse_form_params(b"openid=https%3A%2F%2Fme.yahoo.com"));
        assert!(form.validate().is_empty());
        assert!(!form.remember_me);
    }

    #[test]
    fn unchanged_nickname_always_passes_uniqueness() {
        let repo = MemRepo::new();
        repo.create_user("john", "john@example.com", Role::User)
            .unwrap();
        let form = EditForm {
            nickname: "john".to_string(),
            about_me: String::new(),
        };
        assert!(form.validate(&repo, "john").unwrap().is_empty());
    }

    #[test]
    fn colliding_nickname_fails_with_field_error() {
        let repo = MemRepo::new();
        repo.create_user("john", "john@example.com", Role::User)
            .unwrap();
        repo.create_user("susan", "susan@example.com", Role::User)
            .unwrap();
        let form = EditForm {
            nickname: "susan".to_string(),
            about_me: String::new(),
        };
        let errors = form.validate(&repo, "john").unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "nickname");
        assert!(errors[0].message.contains("already in use"));
    }

    #[test]
    fn about_me_length_is_bounded() {
        let repo = MemRepo::new();
        let form = EditForm {
            nickname: "john".to_string(),
            about_me: "x".repeat(141),
        };
        let errors = form.validate(&repo, "john").unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "about_me");
    }

    #[test]
    fn post_form_requires_a_body_but_sets_no_upper_bound() {
        let form = PostForm {
            body: String::new(),
        };
        assert_eq!(form.validate().len(), 1);

        let form = PostForm {
            body: "y".repeat(10_000),
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn edit_form_strips_markup_from_inputs() {
        let form = EditForm::from_params(&parse_form_params(
            b"nickname=%3Cb%3Ejohn%3C%2Fb%3E&about_me=plain",
        ));
        assert_eq!(form.nickname, "john");
        assert_eq!(form.about_me, "plain");
    }
}
