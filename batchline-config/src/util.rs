use std::collections::HashMap;
use std::str::FromStr;

use crate::loader::error::ConfigLoadError;

/// Where environment variables are read from.
///
/// `Process` is the real environment. `Fixed` is a snapshot used by tests
/// and tooling so loading never has to mutate process-wide state.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    #[default]
    Process,
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    pub fn fixed<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        EnvSource::Fixed(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Value of `name`, treating blank values as unset.
    pub fn var(&self, name: &str) -> Option<String> {
        let raw = match self {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        };
        raw.filter(|value| !value.trim().is_empty())
    }

    /// Parse `name` into `T`. Unset is `Ok(None)`; a value that does not
    /// parse is an error rather than silently ignored.
    pub fn parse_var<T>(&self, name: &'static str) -> Result<Option<T>, ConfigLoadError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.var(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|err: T::Err| ConfigLoadError::InvalidEnvVar {
                    name,
                    value: raw,
                    reason: err.to_string(),
                }),
        }
    }

    /// Merge `.env` entries without overriding variables that are already
    /// set, matching `dotenvy` semantics for the process environment.
    pub(crate) fn absorb<I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        if let EnvSource::Fixed(vars) = self {
            for (key, value) in entries {
                vars.entry(key).or_insert(value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_unset() {
        let env = EnvSource::fixed([("A", "  "), ("B", "7")]);
        assert_eq!(env.var("A"), None);
        assert_eq!(env.var("B").as_deref(), Some("7"));
        assert_eq!(env.var("C"), None);
    }

    #[test]
    fn parse_var_reports_bad_values() {
        let env = EnvSource::fixed([("PORT", "abc"), ("OK", " 42 ")]);
        assert_eq!(env.parse_var::<u16>("OK").unwrap(), Some(42));
        assert!(matches!(
            env.parse_var::<u16>("PORT"),
            Err(ConfigLoadError::InvalidEnvVar { name: "PORT", .. })
        ));
        assert_eq!(env.parse_var::<u16>("MISSING").unwrap(), None);
    }

    #[test]
    fn absorb_keeps_existing_values() {
        let mut env = EnvSource::fixed([("A", "from-env")]);
        env.absorb([
            ("A".to_string(), "from-file".to_string()),
            ("B".to_string(), "from-file".to_string()),
        ]);
        assert_eq!(env.var("A").as_deref(), Some("from-env"));
        assert_eq!(env.var("B").as_deref(), Some("from-file"));
    }
}
