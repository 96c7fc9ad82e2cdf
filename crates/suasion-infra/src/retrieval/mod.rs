//! Context-retrieval implementations.

pub mod assistant;

pub use assistant::AssistantContextRetriever;
