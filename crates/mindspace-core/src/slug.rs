//! Slug derivation for notes.

use chrono::{DateTime, Utc};
use unicode_normalization::UnicodeNormalization;

use crate::models::UserId;

/// Maximum length of the title-derived part of a slug.
pub const SLUG_BASE_MAX_CHARS: usize = 240;

/// Maximum length of a stored slug.
pub const SLUG_MAX_CHARS: usize = 300;

/// Turn free text into a URL-safe slug.
///
/// Applies NFKD decomposition so accented letters fall back to their ASCII
/// base (`é` becomes `e`), lowercases, keeps ASCII letters, digits and
/// underscores, turns runs of whitespace and hyphens into a single `-`, drops
/// everything else, and trims leading/trailing `-` and `_`.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_separator = false;

    for c in value.nfkd().flat_map(char::to_lowercase) {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !slug.is_empty() {
                slug.push('-');
            }
            pending_separator = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '-' {
            pending_separator = true;
        }
    }

    slug.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Derive the immutable slug of a new note.
///
/// Format: `{slugify(title)[..240]}-{author_id}-{unix_timestamp}`.
pub fn derive_slug(title: &str, author_id: UserId, created_at: DateTime<Utc>) -> String {
    let base: String = slugify(title).chars().take(SLUG_BASE_MAX_CHARS).collect();
    format!("{}-{}-{}", base, author_id, created_at.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("Pasta & Sauces!"), "pasta-sauces");
        assert_eq!(slugify("  many   spaces -- and dashes "), "many-spaces-and-dashes");
        assert_eq!(slugify("snake_case stays"), "snake_case-stays");
    }

    #[test]
    fn test_slugify_trims_edges() {
        assert_eq!(slugify("--edge--"), "edge");
        assert_eq!(slugify("_under_"), "under");
        assert_eq!(slugify("_ mixed -"), "mixed");
    }

    #[test]
    fn test_slugify_drops_punctuation_without_separating() {
        assert_eq!(slugify("v1.2"), "v12");
        assert_eq!(slugify("it's"), "its");
    }

    #[test]
    fn test_slugify_non_ascii() {
        assert_eq!(slugify("Café Notes"), "cafe-notes");
        assert_eq!(slugify("Café Résumé"), "cafe-resume");
        assert_eq!(slugify("Ñandú über"), "nandu-uber");
        assert_eq!(slugify("日本語"), "");
    }

    #[test]
    fn test_slugify_compatibility_forms() {
        assert_eq!(slugify("ﬁle №1"), "file-no1");
        assert_eq!(slugify("Ｆｕｌｌ ｗｉｄｔｈ"), "full-width");
    }

    #[test]
    fn test_derive_slug_format() {
        let created = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        assert_eq!(
            derive_slug("Recipes", 7, created),
            format!("recipes-7-{}", created.timestamp())
        );
    }

    #[test]
    fn test_derive_slug_empty_title_base() {
        let created = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(derive_slug("???", 1, created), "-1-1700000000");
    }

    #[test]
    fn test_derive_slug_truncates_base() {
        let title = "a".repeat(400);
        let created = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let slug = derive_slug(&title, 123, created);
        assert!(slug.starts_with(&"a".repeat(SLUG_BASE_MAX_CHARS)));
        assert!(slug.ends_with("-123-1700000000"));
        assert!(slug.len() <= SLUG_MAX_CHARS);
    }
}
