//! Secret resolution.

pub mod env;

pub use env::EnvSecretSource;
