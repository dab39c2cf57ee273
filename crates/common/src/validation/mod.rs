//! Domain input rules shared by every entry point

use crate::errors::{AppError, Result};
use regex_lite::Regex;
use std::sync::OnceLock;
use validator::ValidateEmail;

pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;
pub const NAME_MAX_LEN: usize = 256;
pub const SLUG_MAX_LEN: usize = 50;
pub const REVIEW_TEXT_MAX_LEN: usize = 500;
pub const COMMENT_TEXT_MAX_LEN: usize = 200;
pub const SCORE_RANGE: std::ops::RangeInclusive<i32> = 1..=10;

/// Reserved for the self-profile route
pub const RESERVED_USERNAME: &str = "me";

fn username_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[\w.@+-]+$").expect("valid username pattern"))
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug pattern"))
}

pub fn validate_username(username: &str) -> Result<()> {
    if username.is_empty() || username.chars().count() > USERNAME_MAX_LEN {
        return Err(AppError::validation(
            "username",
            format!("must be 1 to {USERNAME_MAX_LEN} characters"),
        ));
    }
    if username.eq_ignore_ascii_case(RESERVED_USERNAME) {
        return Err(AppError::validation(
            "username",
            format!("\"{RESERVED_USERNAME}\" is reserved"),
        ));
    }
    if !username_pattern().is_match(username) {
        return Err(AppError::validation(
            "username",
            "may contain only letters, digits and @/./+/-/_",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    if email.chars().count() > EMAIL_MAX_LEN || !email.validate_email() {
        return Err(AppError::validation("email", "must be a valid email address"));
    }
    Ok(())
}

/// Release year: not negative and not after `current_year`
pub fn validate_year(year: i32, current_year: i32) -> Result<()> {
    if year < 0 || year > current_year {
        return Err(AppError::validation(
            "year",
            format!("must be between 0 and {current_year}"),
        ));
    }
    Ok(())
}

pub fn validate_score(score: i32) -> Result<()> {
    if !SCORE_RANGE.contains(&score) {
        return Err(AppError::validation("score", "must be between 1 and 10"));
    }
    Ok(())
}

pub fn validate_genres(slugs: &[String]) -> Result<()> {
    if slugs.is_empty() {
        return Err(AppError::validation("genre", "at least one genre is required"));
    }
    Ok(())
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.len() > SLUG_MAX_LEN || !slug_pattern().is_match(slug) {
        return Err(AppError::validation(
            "slug",
            format!("must be 1 to {SLUG_MAX_LEN} characters of letters, digits, - or _"),
        ));
    }
    Ok(())
}

/// Non-blank text of at most `max` characters
pub fn validate_text(field: &str, text: &str, max: usize) -> Result<()> {
    if text.trim().is_empty() {
        return Err(AppError::validation(field, "may not be blank"));
    }
    if text.chars().count() > max {
        return Err(AppError::validation(
            field,
            format!("may not exceed {max} characters"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("jane.doe+1@site").is_ok());
        assert!(validate_username("under_score-dash").is_ok());
        assert!(validate_username("me").is_err());
        assert!(validate_username("ME").is_err());
        assert!(validate_username("meme").is_ok());
        assert!(validate_username("with space").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username("").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
        assert!(validate_username(&"a".repeat(150)).is_ok());
    }

    #[test]
    fn test_year_bounds() {
        assert!(validate_year(2026, 2026).is_ok());
        assert!(validate_year(0, 2026).is_ok());
        assert!(validate_year(2027, 2026).is_err());
        assert!(validate_year(-1, 2026).is_err());
    }

    #[test]
    fn test_score_bounds() {
        assert!(validate_score(1).is_ok());
        assert!(validate_score(10).is_ok());
        assert!(validate_score(0).is_err());
        assert!(validate_score(11).is_err());
    }

    #[test]
    fn test_genres_non_empty() {
        assert!(validate_genres(&[]).is_err());
        assert!(validate_genres(&["drama".to_string()]).is_ok());
    }

    #[test]
    fn test_slug_and_email() {
        assert!(validate_slug("sci-fi_2").is_ok());
        assert!(validate_slug("sci fi").is_err());
        assert!(validate_slug("").is_err());
        assert!(validate_email("reader@example.com").is_ok());
        assert!(validate_email("not-an-email").is_err());
    }

    #[test]
    fn test_text() {
        assert!(validate_text("text", "fine", 10).is_ok());
        assert!(validate_text("text", "   ", 10).is_err());
        assert!(validate_text("text", "elevenchars", 10).is_err());
    }
}
