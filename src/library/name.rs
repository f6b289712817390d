//! Validation of category and file names.
//!
//! Both kinds of name are used directly as path segments below the storage
//! root, so each must be exactly one ordinary component.

use std::path::{Component, Path};

use crate::{ClipError, Result};

use super::{MAX_NAME_BYTES, MAX_NAME_LENGTH};

/// Characters that are reserved on at least one supported filesystem.
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Validate a category name.
///
/// # Examples
///
/// ```
/// use clipshelf::library::validate_category_name;
///
/// assert!(validate_category_name("jazz").is_ok());
/// assert!(validate_category_name("").is_err());
/// assert!(validate_category_name("../etc").is_err());
/// ```
pub fn validate_category_name(name: &str) -> Result<()> {
    validate_segment("category", name)
}

/// Validate a file name.
///
/// Leading dots are rejected so stored files never collide with the hidden
/// temporary files written during uploads.
pub fn validate_file_name(name: &str) -> Result<()> {
    validate_segment("file name", name)
}

fn validate_segment(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ClipError::InvalidName(format!("{kind} must not be empty")));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ClipError::InvalidName(format!(
            "{kind} must be at most {MAX_NAME_LENGTH} characters"
        )));
    }

    if name.len() > MAX_NAME_BYTES {
        return Err(ClipError::InvalidName(format!(
            "{kind} must be at most {MAX_NAME_BYTES} bytes when UTF-8 encoded"
        )));
    }

    if name.chars().any(|c| c.is_control() || RESERVED_CHARS.contains(&c)) {
        return Err(ClipError::InvalidName(format!(
            "{kind} '{name}' contains reserved characters"
        )));
    }

    if name.starts_with('.') {
        return Err(ClipError::InvalidName(format!(
            "{kind} '{name}' must not start with a dot"
        )));
    }

    if name != name.trim() {
        return Err(ClipError::InvalidName(format!(
            "{kind} '{name}' must not start or end with whitespace"
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ClipError::InvalidName(format!(
            "{kind} '{name}' is not a single path segment"
        ))),
    }
}

/// Check whether `name` carries one of the allowed extensions.
///
/// Comparison is case-insensitive and tolerates a leading dot in the
/// configured extension.
pub fn has_allowed_extension(name: &str, allowed: &[String]) -> bool {
    let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    allowed
        .iter()
        .map(|a| a.trim().trim_start_matches('.'))
        .any(|a| a.eq_ignore_ascii_case(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_category_name("jazz").is_ok());
        assert!(validate_category_name("Field Recordings 2024").is_ok());
        assert!(validate_category_name("日本の音楽").is_ok());
        assert!(validate_file_name("clip.mp3").is_ok());
        assert!(validate_file_name("take 2 (final).mp3").is_ok());
    }

    #[test]
    fn test_empty_names_rejected() {
        assert!(matches!(
            validate_category_name(""),
            Err(ClipError::InvalidName(_))
        ));
        assert!(matches!(
            validate_file_name("   "),
            Err(ClipError::InvalidName(_))
        ));
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(validate_category_name("..").is_err());
        assert!(validate_category_name(".").is_err());
        assert!(validate_category_name("../outside").is_err());
        assert!(validate_category_name("a/b").is_err());
        assert!(validate_category_name("a\\b").is_err());
        assert!(validate_file_name("../../etc/passwd").is_err());
        assert!(validate_file_name("/abs.mp3").is_err());
    }

    #[test]
    fn test_reserved_and_control_chars_rejected() {
        assert!(validate_file_name("what?.mp3").is_err());
        assert!(validate_file_name("a:b.mp3").is_err());
        assert!(validate_file_name("line\nbreak.mp3").is_err());
        assert!(validate_file_name("nul\0.mp3").is_err());
    }

    #[test]
    fn test_hidden_names_rejected() {
        assert!(validate_file_name(".clip.mp3.part").is_err());
        assert!(validate_category_name(".hidden").is_err());
    }

    #[test]
    fn test_surrounding_whitespace_rejected() {
        assert!(validate_category_name(" jazz").is_err());
        assert!(validate_category_name("jazz ").is_err());
    }

    #[test]
    fn test_length_limit() {
        let long = "a".repeat(MAX_NAME_LENGTH + 1);
        assert!(validate_category_name(&long).is_err());
        let exact = "a".repeat(MAX_NAME_LENGTH);
        assert!(validate_category_name(&exact).is_ok());
    }

    #[test]
    fn test_multibyte_length_limit() {
        // 100 characters, 300 bytes
        let long = "音".repeat(100);
        assert!(matches!(
            validate_category_name(&long),
            Err(ClipError::InvalidName(_))
        ));
        assert!(validate_file_name(&format!("{}.mp3", "音".repeat(90))).is_err());

        // 85 characters, 255 bytes
        assert!(validate_category_name(&"音".repeat(85)).is_ok());
    }

    #[test]
    fn test_has_allowed_extension() {
        let allowed = vec!["mp3".to_string(), ".ogg".to_string()];
        assert!(has_allowed_extension("clip.mp3", &allowed));
        assert!(has_allowed_extension("CLIP.MP3", &allowed));
        assert!(has_allowed_extension("clip.ogg", &allowed));
        assert!(!has_allowed_extension("clip.wav", &allowed));
        assert!(!has_allowed_extension("mp3", &allowed));
    }
}
