pub const MAX_POST_LENGTH: usize = 140;
pub const MAX_ABOUT_ME_LENGTH: usize = 140;
pub const SESSION_COOKIE: &str = "session";

pub fn posts_per_page() -> usize {
    std::env::var("MICROBLOG_POSTS_PER_PAGE")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(10)
}

pub fn session_expiration_hours() -> i64 {
    std::env::var("MICROBLOG_SESSION_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

/// Expiration for sessions created with the "remember me" flag set.
pub fn remembered_session_expiration_hours() -> i64 {
    std::env::var("MICROBLOG_REMEMBERED_SESSION_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24 * 30)
}

pub struct Provider {
    pub name: &'static str,
    pub url: &'static str,
}

pub fn openid_providers() -> &'static [Provider] {
    &[
        Provider { name: "Google", url: "https://www.google.com/accounts/o8/id" },
        Provider { name: "Yahoo", url: "https://me.yahoo.com" },
        Provider { name: "AOL", url: "http://openid.aol.com" },
        Provider { name: "Flickr", url: "http://www.flickr.com" },
        Provider { name: "MyOpenID", url: "https://www.myopenid.com" },
    ]
}
