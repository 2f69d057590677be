//! `${VAR}` interpolation for config files.
//!
//! - `${VAR}` substitutes the variable, error if unset
//! - `${VAR:-default}` falls back to `default` when unset or empty
//! - `$$` is a literal `$`

use regex::{Captures, Regex};
use std::{env, sync::LazyLock};

static ENV_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
        .expect("env var pattern is valid")
});

/// Replace every reference in `input`. All unset variables are reported at
/// once rather than stopping at the first.
pub fn interpolate(input: &str) -> Result<String, Vec<String>> {
    interpolate_with(input, |name| env::var(name).ok())
}

pub(crate) fn interpolate_with<F>(input: &str, lookup: F) -> Result<String, Vec<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut errors = Vec::new();

    let text = ENV_VAR.replace_all(input, |caps: &Captures| {
        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            return "$".to_string();
        };
        let default = caps.get(2).map(|m| m.as_str());

        match (lookup(name), default) {
            (Some(v), Some(d)) if v.is_empty() => d.to_string(),
            (Some(v), _) if v.contains('\n') || v.contains('\r') => {
                errors.push(format!("environment variable `{name}` contains a newline"));
                String::new()
            }
            (Some(v), _) => v,
            (None, Some(d)) => d.to_string(),
            (None, None) => {
                errors.push(format!("environment variable `{name}` is not set"));
                String::new()
            }
        }
    });

    if errors.is_empty() {
        Ok(text.into_owned())
    } else {
        Err(errors)
    }
}
