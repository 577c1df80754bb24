//! Enrichment of fetched documents with their related documents.

/// Concrete enrichers for each list kind.
pub mod enrichers;
/// Bounded, order-preserving batch enrichment.
pub mod pipeline;
/// Enricher trait and miss reporting.
pub mod traits;
