//! Bounded, order-preserving batch enrichment.

use futures::stream::{self, StreamExt};

use super::traits::{Enricher, Enriched};

/// In-flight enrichment bound used by lists and user lists unless configured.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Enriches `records` with at most `max_in_flight` enrichments running at
/// once. Output order always matches input order, whatever order the
/// fetches complete in. A bound of zero is treated as one.
pub async fn enrich_all<E: Enricher>(
    enricher: &E,
    records: Vec<E::Record>,
    max_in_flight: usize,
) -> Enriched<E::Record> {
    let total = records.len();
    let results: Vec<_> = stream::iter(records)
        .map(|record| enricher.enrich(record))
        .buffered(max_in_flight.max(1))
        .collect()
        .await;

    let mut out = Enriched {
        records: Vec::with_capacity(total),
        misses: Vec::new(),
    };
    for (record, misses) in results {
        for miss in &misses {
            tracing::warn!(
                record_id = %miss.record_id,
                field = ?miss.field,
                reason = %miss.reason,
                "enrichment fetch failed"
            );
        }
        out.records.push(record);
        out.misses.extend(misses);
    }
    tracing::debug!(total, misses = out.misses.len(), "enrichment batch finished");
    out
}
