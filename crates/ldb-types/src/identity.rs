//! User identity recorded in metadata.

use std::env;

const USER_VARS: &[&str] = &["LOGNAME", "USER", "LNAME", "USERNAME"];

/// The login name of the current user.
///
/// Checks the usual login environment variables in order and falls back to
/// `"unknown"` when none is set.
pub fn current_user() -> String {
    USER_VARS
        .iter()
        .filter_map(|var| env::var(var).ok())
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
