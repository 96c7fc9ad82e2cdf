//! Environment-variable secret source.
//!
//! API keys are read from the process environment and wrapped in
//! `SecretString` immediately so they never sit in plain `String`s.

use secrecy::SecretString;

/// Resolves secrets from process environment variables.
pub struct EnvSecretSource;

impl EnvSecretSource {
    /// Read a secret; empty values count as absent.
    pub fn get(name: &str) -> Option<SecretString> {
        std::env::var(name)
            .ok()
            .filter(|value| !value.is_empty())
            .map(SecretString::from)
    }
}
