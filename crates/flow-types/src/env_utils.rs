//! Environment variable parsing utilities.
//!
//! Every tunable knob in the workspace (poll interval, HTTP timeouts, endpoint
//! overrides) is read through these helpers so parsing rules stay uniform.
//!
//! # Example
//!
//! ```
//! use flow_types::env_utils::{env_var, env_var_or};
//!
//! let poll_ms: u64 = env_var_or("FLOW_SEAL_POLL_MS", 1000);
//! let custom: Option<u64> = env_var("FLOW_CUSTOM_VALUE");
//! ```

use std::collections::HashMap;
use std::str::FromStr;

/// Parse an environment variable into a type that implements `FromStr`.
///
/// Returns `None` if the variable is not set or cannot be parsed.
pub fn env_var<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Parse an environment variable with a default value.
///
/// Returns the default if the variable is not set or cannot be parsed.
pub fn env_var_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

/// Get an environment variable as a string, treating empty values as unset.
pub fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Substitute `$VAR` and `${VAR}` references in `input`.
///
/// Lookups go to the process environment first, then to `fallback` (usually
/// the entries of a `.env` file). References that resolve nowhere are left
/// untouched so the caller can report them in context.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use flow_types::env_utils::substitute_env;
///
/// let mut vars = HashMap::new();
/// vars.insert("FLOWKIT_DOC_KEY".to_string(), "abc".to_string());
/// assert_eq!(substitute_env("key: ${FLOWKIT_DOC_KEY}", &vars), "key: abc");
/// assert_eq!(substitute_env("$FLOWKIT_DOC_UNSET", &vars), "$FLOWKIT_DOC_UNSET");
/// ```
pub fn substitute_env(input: &str, fallback: &HashMap<String, String>) -> String {
    let lookup = |name: &str| -> Option<String> {
        std::env::var(name)
            .ok()
            .or_else(|| fallback.get(name).cloned())
    };

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        if let Some(braced) = after.strip_prefix('{') {
            if let Some(end) = braced.find('}') {
                let name = &braced[..end];
                if is_var_name(name) {
                    match lookup(name) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&rest[pos..pos + end + 3]),
                    }
                    rest = &braced[end + 1..];
                    continue;
                }
            }
            out.push('$');
            rest = after;
            continue;
        }

        let len = after
            .char_indices()
            .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '_'))
            .map(|(i, _)| i)
            .unwrap_or(after.len());
        let name = &after[..len];
        if is_var_name(name) {
            match lookup(name) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('$');
                    out.push_str(name);
                }
            }
        } else {
            out.push('$');
            out.push_str(name);
        }
        rest = &after[len..];
    }
    out.push_str(rest);
    out
}

fn is_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
