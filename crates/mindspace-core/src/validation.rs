//! Field validation rules shared by the repositories and the HTTP layer.
//!
//! Messages are phrased for end users and keyed by the request field they
//! refer to, so a client can render them next to the offending input.

use crate::error::{Result, ValidationErrors};
use crate::models::RegisterRequest;

pub const USERNAME_MAX_CHARS: usize = 150;
pub const EMAIL_MAX_CHARS: usize = 254;
pub const PASSWORD_MIN_CHARS: usize = 6;
pub const TAG_NAME_MAX_CHARS: usize = 50;
pub const NOTE_TITLE_MAX_CHARS: usize = 255;

pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_PASSWORD_MISMATCH: &str = "Password fields didn't match.";
pub const MSG_USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const MSG_EMAIL_TAKEN: &str = "A user with that email already exists.";
pub const MSG_TAG_NAME_TAKEN: &str = "tag with this name already exists.";
pub const MSG_INVALID_EMAIL: &str = "Enter a valid email address.";
pub const MSG_INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";

fn max_chars_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

fn min_chars_message(min: usize) -> String {
    format!("Ensure this field has at least {} characters.", min)
}

/// Record a blank or too-long error for a required text field. Both checks
/// apply to the trimmed value, which is what gets stored.
fn check_required_text(errors: &mut ValidationErrors, field: &str, value: &str, max: usize) {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, MSG_BLANK);
    } else if value.chars().count() > max {
        errors.add(field, max_chars_message(max));
    }
}

fn is_valid_username_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_')
}

/// Loose structural check: one `@`, non-empty local part, dotted domain, no spaces.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

/// Validate a registration payload, excluding uniqueness checks which need the
/// database.
pub fn validate_registration(req: &RegisterRequest) -> Result<()> {
    let mut errors = ValidationErrors::new();

    check_required_text(&mut errors, "username", &req.username, USERNAME_MAX_CHARS);
    if !errors.contains("username") && !req.username.chars().all(is_valid_username_char) {
        errors.add("username", MSG_INVALID_USERNAME);
    }

    if let Some(email) = req.normalized_email() {
        if email.chars().count() > EMAIL_MAX_CHARS {
            errors.add("email", max_chars_message(EMAIL_MAX_CHARS));
        } else if !is_plausible_email(email) {
            errors.add("email", MSG_INVALID_EMAIL);
        }
    }

    for (field, value) in [("password", &req.password), ("password2", &req.password2)] {
        if value.is_empty() {
            errors.add(field, MSG_BLANK);
        } else if value.chars().count() < PASSWORD_MIN_CHARS {
            errors.add(field, min_chars_message(PASSWORD_MIN_CHARS));
        }
    }

    if req.password != req.password2 {
        errors.add("password", MSG_PASSWORD_MISMATCH);
    }

    errors.into_result()
}

/// Validate a tag name.
pub fn validate_tag_name(name: &str) -> Result<()> {
    let mut errors = ValidationErrors::new();
    check_required_text(&mut errors, "name", name, TAG_NAME_MAX_CHARS);
    errors.into_result()
}

/// Validate a note title.
pub fn validate_note_title(title: &str) -> Result<()> {
    let mut errors = ValidationErrors::new();
    check_required_text(&mut errors, "title", title, NOTE_TITLE_MAX_CHARS);
    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn register(username: &str, email: Option<&str>, password: &str, password2: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.to_string(),
            email: email.map(String::from),
            password: password.to_string(),
            password2: password2.to_string(),
        }
    }

    fn field_errors(result: Result<()>) -> ValidationErrors {
        match result {
            Err(Error::Validation(errors)) => errors,
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_registration() {
        assert!(validate_registration(&register("ada", None, "secret1", "secret1")).is_ok());
        assert!(
            validate_registration(&register("ada.l+x@y", Some("ada@example.com"), "secret1", "secret1"))
                .is_ok()
        );
    }

    #[test]
    fn test_password_mismatch() {
        let errors = field_errors(validate_registration(&register(
            "ada", None, "secret1", "secret2",
        )));
        assert_eq!(
            errors.get("password"),
            Some(&[MSG_PASSWORD_MISMATCH.to_string()][..])
        );
    }

    #[test]
    fn test_short_passwords() {
        let errors = field_errors(validate_registration(&register("ada", None, "abc", "abc")));
        assert!(errors.contains("password"));
        assert!(errors.contains("password2"));
    }

    #[test]
    fn test_blank_username() {
        let errors = field_errors(validate_registration(&register(
            "  ", None, "secret1", "secret1",
        )));
        assert_eq!(errors.get("username"), Some(&[MSG_BLANK.to_string()][..]));
    }

    #[test]
    fn test_username_characters() {
        let errors = field_errors(validate_registration(&register(
            "ada lovelace",
            None,
            "secret1",
            "secret1",
        )));
        assert_eq!(
            errors.get("username"),
            Some(&[MSG_INVALID_USERNAME.to_string()][..])
        );
    }

    #[test]
    fn test_username_too_long() {
        let name = "a".repeat(USERNAME_MAX_CHARS + 1);
        let errors = field_errors(validate_registration(&register(
            &name, None, "secret1", "secret1",
        )));
        assert!(errors.contains("username"));
    }

    #[test]
    fn test_blank_email_is_absent() {
        assert!(validate_registration(&register("ada", Some(""), "secret1", "secret1")).is_ok());
    }

    #[test]
    fn test_bad_email() {
        let errors = field_errors(validate_registration(&register(
            "ada",
            Some("not-an-email"),
            "secret1",
            "secret1",
        )));
        assert_eq!(errors.get("email"), Some(&[MSG_INVALID_EMAIL.to_string()][..]));
    }

    #[test]
    fn test_plausible_email() {
        assert!(is_plausible_email("a@b.co"));
        assert!(!is_plausible_email("a@b"));
        assert!(!is_plausible_email("@b.co"));
        assert!(!is_plausible_email("a@@b.co"));
        assert!(!is_plausible_email("a b@c.co"));
        assert!(!is_plausible_email("a@.co"));
    }

    #[test]
    fn test_tag_name_rules() {
        assert!(validate_tag_name("cooking").is_ok());
        assert!(validate_tag_name(&"x".repeat(TAG_NAME_MAX_CHARS)).is_ok());

        let errors = field_errors(validate_tag_name(&"x".repeat(TAG_NAME_MAX_CHARS + 1)));
        assert_eq!(
            errors.get("name"),
            Some(&["Ensure this field has no more than 50 characters.".to_string()][..])
        );
        let errors = field_errors(validate_tag_name(""));
        assert_eq!(errors.get("name"), Some(&[MSG_BLANK.to_string()][..]));
    }

    #[test]
    fn test_length_measured_after_trim() {
        let padded = format!(" {} ", "x".repeat(TAG_NAME_MAX_CHARS));
        assert!(validate_tag_name(&padded).is_ok());
        let padded = format!("\t{}\n", "t".repeat(NOTE_TITLE_MAX_CHARS));
        assert!(validate_note_title(&padded).is_ok());
        assert!(validate_tag_name(&format!(" {} ", "x".repeat(TAG_NAME_MAX_CHARS + 1))).is_err());
    }

    #[test]
    fn test_note_title_rules() {
        assert!(validate_note_title("Recipes").is_ok());
        assert!(validate_note_title(&"t".repeat(NOTE_TITLE_MAX_CHARS)).is_ok());
        assert!(validate_note_title(&"t".repeat(NOTE_TITLE_MAX_CHARS + 1)).is_err());
        assert!(validate_note_title(" ").is_err());
    }
}
