//! Build Environment
//!
//! Derives the environment handed to configure/make/packaging steps from a
//! base map plus ordered prepend rules. Nothing here touches the process
//! environment; callers receive a new map.

use std::collections::HashMap;
use std::path::Path;

use crate::config::PathsConfig;

/// Variables reported after the build environment is assembled
const REPORTED_VARS: [&str; 5] = ["PATH", "PKG_CONFIG_PATH", "CPPFLAGS", "LDFLAGS", "PYTHONPATH"];

/// Prepend `value` to variable `name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvRule {
    pub name: String,
    pub value: String,
    pub separator: String,
}

impl EnvRule {
    /// Rule joining with the path-list separator `:`
    pub fn path(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_separator(name, value, ":")
    }

    /// Rule joining with a space, as compiler flag variables expect
    pub fn flags(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_separator(name, value, " ")
    }

    pub fn with_separator(
        name: impl Into<String>,
        value: impl Into<String>,
        separator: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            separator: separator.into(),
        }
    }

    /// Apply this rule to `env` in place
    fn apply(&self, env: &mut HashMap<String, String>) {
        let new_value = match env.get(&self.name) {
            Some(current) if !current.is_empty() => {
                format!("{}{}{}", self.value, self.separator, current)
            }
            _ => self.value.clone(),
        };
        env.insert(self.name.clone(), new_value);
    }
}

/// Apply `rules` in order on top of `base`
///
/// Later rules are prepended last and therefore end up first, so tools that
/// search the list left to right try them before earlier entries.
pub fn build(base: &HashMap<String, String>, rules: &[EnvRule]) -> HashMap<String, String> {
    let mut env = base.clone();
    for rule in rules {
        rule.apply(&mut env);
    }
    env
}

/// Prepend rules for building the server components against local installs
pub fn build_env_rules(paths: &PathsConfig) -> Vec<EnvRule> {
    let prefix = &paths.prefix;
    vec![
        EnvRule::flags("CPPFLAGS", format!("-I{}", display(&prefix.join("include")))),
        EnvRule::flags("LDFLAGS", format!("-L{}", display(&prefix.join("lib")))),
        EnvRule::flags("LDFLAGS", format!("-L{}", display(&prefix.join("lib64")))),
        EnvRule::path("PATH", display(&prefix.join("bin"))),
        EnvRule::path("PATH", display(&paths.thirdpartdir)),
        EnvRule::path("PKG_CONFIG_PATH", display(&prefix.join("lib").join("pkgconfig"))),
        EnvRule::path("PKG_CONFIG_PATH", display(&prefix.join("lib64").join("pkgconfig"))),
        EnvRule::path("PKG_CONFIG_PATH", display(&paths.topdir.join("libsearpc"))),
        EnvRule::path("PKG_CONFIG_PATH", display(&paths.topdir.join("ccnet"))),
    ]
}

/// Current process environment with the build rules applied
pub fn make_build_env(paths: &PathsConfig) -> HashMap<String, String> {
    let base: HashMap<String, String> = std::env::vars().collect();
    let env = build(&base, &build_env_rules(paths));

    for key in REPORTED_VARS {
        info!("{}: {}", key, env.get(key).map(String::as_str).unwrap_or(""));
    }
    env
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
