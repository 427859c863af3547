//! Filename validation.
//!
//! Media directories are flat: every stored file is addressed by a single
//! plain filename, never by a path.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path};

/// Validates that `name` is a single plain path component.
///
/// Rejects empty names, `.` and `..`, anything containing a separator, and
/// NUL bytes (which pass through `Path::components()` on Unix but truncate
/// C-based syscalls).
///
/// # Examples
///
/// ```
/// use reel_storage::validate_name;
/// assert!(validate_name("a1b2c3.jpg").is_ok());
/// assert!(validate_name(".hidden").is_ok());
/// assert!(validate_name("../etc/passwd").is_err());
/// assert!(validate_name("sub/file.png").is_err());
/// assert!(validate_name("a\0b").is_err());
/// ```
pub fn validate(name: &str) -> Result<&str> {
    let invalid = || exn::Exn::from(ErrorKind::InvalidName(name.to_string()));
    if name.contains('\0') || name.contains('/') || name.contains('\\') {
        return Err(invalid());
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(name),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("photo.jpg")]
    #[case("clip.final.mp4")]
    #[case(".hidden")]
    #[case("no-extension")]
    #[case("..double-dot-prefix.png")]
    fn test_valid_names(#[case] name: &str) {
        assert_eq!(validate(name).unwrap(), name);
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("../etc/passwd")]
    #[case("a/b.png")]
    #[case("a\\b.png")]
    #[case("/absolute.png")]
    #[case("trailing/")]
    #[case("a\0b")]
    fn test_invalid_names(#[case] name: &str) {
        let err = validate(name).unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidName(_)));
    }
}
