//! Cluster name validation

use once_cell::sync::Lazy;
use regex::Regex;

static CLUSTER_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9\-_.]*$").expect("cluster name pattern is valid")
});

/// Maximum accepted cluster name length
pub const MAX_CLUSTER_NAME_LEN: usize = 128;

/// Check that `name` can be used as a cluster name
///
/// Names start with a letter or digit and otherwise contain only letters,
/// digits, `-`, `_` and `.`. They double as directory names in the
/// metadata store, so `..` is rejected as well.
///
/// # Errors
/// Returns [`NameError`] describing why the name is unusable.
pub fn validate_cluster_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > MAX_CLUSTER_NAME_LEN {
        return Err(NameError::TooLong {
            name: name.to_string(),
            max: MAX_CLUSTER_NAME_LEN,
        });
    }
    if !CLUSTER_NAME.is_match(name) || name.contains("..") {
        return Err(NameError::InvalidCharacters(name.to_string()));
    }
    Ok(())
}

/// Invalid cluster name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// Empty name
    #[error("cluster name must not be empty")]
    Empty,

    /// Name exceeds the length limit
    #[error("cluster name '{name}' is longer than {max} characters")]
    TooLong { name: String, max: usize },

    /// Name contains characters outside the allowed set
    #[error("cluster name '{0}' is invalid (use letters, digits, '-', '_' and '.')")]
    InvalidCharacters(String),
}
