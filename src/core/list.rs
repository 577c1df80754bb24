//! Ordered record collection backing one list screen.
//!
//! [`ListState`] is owned by a single list actor. It tracks load
//! generations so stale fetch results can be rejected, and remembers which
//! records were toggled locally since the last install so a late server
//! reconciliation never overwrites them.

use hashbrown::{HashMap, HashSet};

/// A document that can live in a [`ListState`].
pub trait Record: Clone + Send + Sync + 'static {
    /// Identity within its collection. Must be unique inside one list.
    fn record_id(&self) -> &str;
}

/// Presence flags derived from a [`ListState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewFlags {
    /// Number of records.
    pub len: usize,
    /// True when no records are held.
    pub is_empty: bool,
    /// True while a load is in flight.
    pub is_loading: bool,
    /// Load generation the records belong to.
    pub generation: u64,
}

/// Ordered, authoritative collection backing one list screen.
///
/// Every load gets a fresh generation; results carrying an older generation
/// are stale and rejected by [`ListState::install`].
#[derive(Debug)]
pub struct ListState<R: Record> {
    records: HashMap<String, R>,
    order: Vec<String>,
    generation: u64,
    loading: Option<u64>,
    touched: HashSet<String>,
}

impl<R: Record> Default for ListState<R> {
    fn default() -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            generation: 0,
            loading: None,
            touched: HashSet::new(),
        }
    }
}

impl<R: Record> ListState<R> {
    /// Creates an empty state at generation 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state pre-populated with `records` at generation 0.
    pub fn with_records(records: Vec<R>) -> Self {
        let mut state = Self::new();
        state.replace(records);
        state
    }

    /// Starts a new load generation and marks the state as loading.
    pub fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.loading = Some(self.generation);
        self.generation
    }

    /// Drops every record.
    pub fn discard(&mut self) {
        self.records.clear();
        self.order.clear();
        self.touched.clear();
    }

    /// Installs the result of load `generation`, replacing current records.
    ///
    /// Returns the number of duplicate ids dropped, or `None` when the
    /// generation is stale and nothing changed.
    pub fn install(&mut self, generation: u64, records: Vec<R>) -> Option<usize> {
        if self.loading != Some(generation) {
            return None;
        }
        self.loading = None;
        Some(self.replace(records))
    }

    /// Ends load `generation` without installing anything.
    pub fn abort_load(&mut self, generation: u64) -> bool {
        if self.loading != Some(generation) {
            return false;
        }
        self.loading = None;
        true
    }

    /// Removes the record with `id`, if present.
    pub fn remove(&mut self, id: &str) -> Option<R> {
        let rec = self.records.remove(id)?;
        if let Some(pos) = self.order.iter().position(|x| x == id) {
            self.order.remove(pos);
        }
        self.touched.remove(id);
        Some(rec)
    }

    /// Marks `id` as changed locally since the last install.
    pub fn touch(&mut self, id: &str) {
        if self.records.contains_key(id) {
            self.touched.insert(id.to_string());
        }
    }

    /// True when `id` was toggled locally since the last install.
    pub fn is_touched(&self, id: &str) -> bool {
        self.touched.contains(id)
    }

    /// Borrows the record with `id`.
    pub fn get(&self, id: &str) -> Option<&R> {
        self.records.get(id)
    }

    /// Mutably borrows the record with `id`.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut R> {
        self.records.get_mut(id)
    }

    /// Clones the record with `id`.
    pub fn get_cloned(&self, id: &str) -> Option<R> {
        self.get(id).cloned()
    }

    /// Record ids in display order.
    pub fn ordered_ids(&self) -> &[String] {
        &self.order
    }

    /// Records in display order.
    pub fn ordered(&self) -> impl Iterator<Item = &R> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Clones every record in display order.
    pub fn snapshot(&self) -> Vec<R> {
        self.ordered().cloned().collect()
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// True when no records are held.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// True while a load is in flight.
    pub fn is_loading(&self) -> bool {
        self.loading.is_some()
    }

    /// Generation of the most recent load.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Derived presence flags.
    pub fn flags(&self) -> ViewFlags {
        ViewFlags {
            len: self.len(),
            is_empty: self.is_empty(),
            is_loading: self.is_loading(),
            generation: self.generation,
        }
    }

    fn replace(&mut self, records: Vec<R>) -> usize {
        self.discard();
        let mut dropped = 0;
        for rec in records {
            let id = rec.record_id().to_string();
            if self.records.contains_key(&id) {
                // First occurrence wins.
                dropped += 1;
                continue;
            }
            self.order.push(id.clone());
            self.records.insert(id, rec);
        }
        dropped
    }
}
