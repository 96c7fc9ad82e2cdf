//! Chat-provider abstraction consumed by the turn pipeline.

pub mod box_provider;
pub mod provider;

pub use box_provider::BoxChatProvider;
pub use provider::ChatProvider;
