//! Enrichment seam: attach related documents to a record, reporting misses.

use async_trait::async_trait;

/// Field an enricher attaches to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichField {
    /// Profile of the owning or acting user.
    User,
    /// Post a notification refers to.
    Post,
    /// Whether the session user follows the acting user.
    FollowState,
}

/// One enrichment fetch that failed; the record keeps the field empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichMiss {
    /// Record whose field stayed empty.
    pub record_id: String,
    /// Field that stayed empty.
    pub field: EnrichField,
    /// Error text of the failed fetch.
    pub reason: String,
}

impl EnrichMiss {
    /// Records a failed fetch of `field` for `record_id`.
    pub fn new(record_id: impl Into<String>, field: EnrichField, reason: impl ToString) -> Self {
        Self {
            record_id: record_id.into(),
            field,
            reason: reason.to_string(),
        }
    }
}

/// Output of a batch enrichment: every input record, in input order, plus the
/// fetches that failed along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Enriched<R> {
    /// Enriched records, in input order.
    pub records: Vec<R>,
    /// Failed sub-fetches.
    pub misses: Vec<EnrichMiss>,
}

impl<R> Enriched<R> {
    /// True when no sub-fetch failed.
    pub fn is_complete(&self) -> bool {
        self.misses.is_empty()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when there are no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<R> Default for Enriched<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            misses: Vec::new(),
        }
    }
}

/// Attaches related documents to a single record.
///
/// Implementations never fail as a whole: a failed sub-fetch leaves its
/// field unset and is reported as an [`EnrichMiss`].
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Record type this enricher fills in.
    type Record: Send + 'static;

    /// Returns `record` with whatever fields could be fetched.
    async fn enrich(&self, record: Self::Record) -> (Self::Record, Vec<EnrichMiss>);
}
