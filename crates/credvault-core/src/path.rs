//! Credential names and the derived path hierarchy.
//!
//! Names are slash-delimited absolute paths such as `/a/b/credential-name`.
//! The hierarchy is never stored: the ancestors of `/a/b/c` are computed as
//! `/a/` and `/a/b/`. The root `/` is not an ancestor.

use crate::error::ValidationError;

/// Longest accepted credential name, in bytes.
pub const MAX_NAME_LENGTH: usize = 1024;

/// Normalize a credential name to its absolute form, prefixing `/` if missing.
pub fn normalize_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() || name == "/" {
        return Err(ValidationError::MissingName);
    }
    if name.ends_with('/') {
        return Err(ValidationError::InvalidName(name.to_string()));
    }
    normalize(name)
}

/// Normalize a permission path. Unlike [`normalize_name`], a trailing `/`
/// is allowed so that entries can target an ancestor prefix.
pub fn normalize_path(path: &str) -> Result<String, ValidationError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(ValidationError::MissingName);
    }
    normalize(path)
}

fn normalize(raw: &str) -> Result<String, ValidationError> {
    if raw.contains("//") {
        return Err(ValidationError::InvalidName(raw.to_string()));
    }
    let absolute = if raw.starts_with('/') {
        raw.to_string()
    } else {
        format!("/{}", raw)
    };
    if absolute.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong {
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(absolute)
}

/// Proper ancestor prefixes of `name`, shortest first, each ending in `/`.
pub fn ancestor_paths(name: &str) -> Vec<String> {
    let segments: Vec<&str> = name
        .trim_start_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let mut prefix = String::from("/");
    let mut ancestors = Vec::with_capacity(segments.len().saturating_sub(1));
    for segment in segments.iter().take(segments.len().saturating_sub(1)) {
        prefix.push_str(segment);
        prefix.push('/');
        ancestors.push(prefix.clone());
    }
    ancestors
}

/// Case-insensitive comparison of two full credential names.
pub fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Identity of a permission path in storage.
///
/// Full names fold case like the credentials they target. Ancestor prefixes
/// (ending in `/`) keep their case, since they match case-sensitively.
pub fn permission_key(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        path.to_lowercase()
    }
}
