//! One-shot notices carried across a redirect in a signed cookie.

use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};

const COOKIE_NAME: &str = "ffsgate_notice";
const KEY_CONTEXT: &str = "ffsgate 2024 notice cookie signing key";

/// Derive the cookie signing key from the configured secret.
pub fn signing_key(secret: &str) -> Key {
    let mut material = [0u8; 64];
    blake3::Hasher::new_derive_key(KEY_CONTEXT)
        .update(secret.as_bytes())
        .finalize_xof()
        .fill(&mut material);
    Key::from(&material[..])
}

/// Remember notices for the next page rendered for this browser.
pub fn push(jar: SignedCookieJar, notices: &[String]) -> SignedCookieJar {
    match notices.is_empty() {
        true => jar,
        false => {
            let cookie = Cookie::build((COOKIE_NAME, notices.join("\n")))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            jar.add(cookie)
        },
    }
}

/// Remove and return any pending notices. Tampered cookies yield nothing.
pub fn take(jar: SignedCookieJar) -> (SignedCookieJar, Vec<String>) {
    let Some(cookie) = jar.get(COOKIE_NAME) else {
        return (jar, Vec::new());
    };
    let notices = cookie.value().lines().filter(|l| !l.is_empty()).map(str::to_string).collect();
    (jar.remove(Cookie::build(COOKIE_NAME).path("/")), notices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_then_take() {
        let jar = SignedCookieJar::new(signing_key("secret"));
        let jar = push(jar, &["first".to_string(), "second, with comma".to_string()]);
        let (jar, notices) = take(jar);
        assert_eq!(notices, vec!["first", "second, with comma"]);
        let (_, notices) = take(jar);
        assert!(notices.is_empty());
    }

    #[test]
    fn test_nothing_to_push() {
        let jar = push(SignedCookieJar::new(signing_key("secret")), &[]);
        assert!(jar.get(COOKIE_NAME).is_none());
    }

    #[test]
    fn test_key_depends_on_secret() {
        assert_eq!(signing_key("a").master(), signing_key("a").master());
        assert_ne!(signing_key("a").master(), signing_key("b").master());
    }
}
