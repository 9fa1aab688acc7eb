// src/exec/env.rs

//! `$(NAME)` expansion against the process environment.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::debug;

static ENV_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\(([A-Za-z_][A-Za-z0-9_]*)\)").expect("env token pattern is valid")
});

/// Replace every `$(NAME)` with the value of environment variable `NAME`.
///
/// Unset variables expand to the empty string.
pub fn expand_env_vars(input: &str) -> String {
    expand_with(input, |name| std::env::var(name).ok())
}

/// Same as [`expand_env_vars`] with a custom variable lookup.
pub fn expand_with<F>(input: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    if !input.contains("$(") {
        return input.to_string();
    }

    ENV_TOKEN
        .replace_all(input, |caps: &Captures<'_>| {
            let name = &caps[1];
            lookup(name).unwrap_or_else(|| {
                debug!(variable = name, "environment variable not set; expanding to empty");
                String::new()
            })
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::expand_with;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "SDK" => Some("/opt/sdk".to_string()),
            "ARCH" => Some("x64".to_string()),
            _ => None,
        }
    }

    #[test]
    fn expands_known_and_blanks_unknown_tokens() {
        assert_eq!(
            expand_with("$(SDK)/bin/$(ARCH)/cl$(MISSING).exe", lookup),
            "/opt/sdk/bin/x64/cl.exe"
        );
    }

    #[test]
    fn leaves_other_dollar_forms_alone() {
        assert_eq!(expand_with("$SDK ${SDK} $(1BAD)", lookup), "$SDK ${SDK} $(1BAD)");
    }
}
