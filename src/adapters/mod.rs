/// Adapter layer for interface implementations.
///
/// Persistence adapters implement the message log used by the summarization
/// pipeline.
pub mod persistence;
