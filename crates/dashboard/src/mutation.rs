//! Bookkeeping shared by the collection managers: which records have a
//! request in flight, and whether a response is older than the state it
//! would overwrite.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

/// What an in-flight request is about.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum RecordKey {
    /// Creation inside a scope (a campaign id, or the user list).
    Create(String),
    /// Edit or delete of an existing record.
    Record(String),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(scope) => write!(f, "new record in {scope}"),
            Self::Record(id) => write!(f, "record {id}"),
        }
    }
}

/// Handle for one in-flight request. Sequence numbers grow monotonically,
/// so comparing two tickets tells which request was issued later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    seq: u64,
    key: RecordKey,
}

impl Ticket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn key(&self) -> &RecordKey {
        &self.key
    }
}

#[derive(Debug, Default)]
pub struct InFlight {
    next_seq: u64,
    snapshot_seq: u64,
    /// Sequence of the last replacement applied, per replaced list.
    last_applied: BTreeMap<String, u64>,
    pending: BTreeSet<RecordKey>,
}

impl InFlight {
    /// Registers a request for `key`. Fails with the key when one is
    /// already pending for it.
    pub fn begin(&mut self, key: RecordKey) -> Result<Ticket, RecordKey> {
        if self.pending.contains(&key) {
            return Err(key);
        }
        self.next_seq += 1;
        self.pending.insert(key.clone());
        Ok(Ticket {
            seq: self.next_seq,
            key,
        })
    }

    pub fn finish(&mut self, ticket: &Ticket) {
        self.pending.remove(&ticket.key);
    }

    pub fn is_pending(&self, key: &RecordKey) -> bool {
        self.pending.contains(key)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Decides whether a wholesale replacement of the list named `scope`
    /// may be applied. A replacement issued before the last one applied to
    /// the same list, or before the last snapshot, is stale.
    pub fn accept_replacement(&mut self, scope: &str, ticket: &Ticket) -> bool {
        let floor = self
            .last_applied
            .get(scope)
            .copied()
            .unwrap_or(0)
            .max(self.snapshot_seq);
        if ticket.seq <= floor {
            return false;
        }
        self.last_applied.insert(scope.to_string(), ticket.seq);
        true
    }

    /// Marks a freshly loaded snapshot: every ticket issued so far, for any
    /// list, is older than it.
    pub fn mark_snapshot(&mut self) {
        self.snapshot_seq = self.next_seq;
        self.last_applied.clear();
    }
}

/// Result of reconciling a mutation response with the local collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The backend refused the mutation; nothing changed locally.
    Rejected(String),
    /// The whole collection was replaced by the server list.
    Replaced,
    /// One record was added.
    Appended,
    /// One record was replaced in place.
    Updated,
    /// One record was removed.
    Removed,
    /// The response was older than the current state and was dropped.
    Stale,
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        !matches!(self, Self::Rejected(_) | Self::Stale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_request_on_same_record_is_refused() {
        let mut in_flight = InFlight::default();
        let ticket = in_flight.begin(RecordKey::Record("f1".into())).unwrap();
        assert_eq!(
            in_flight.begin(RecordKey::Record("f1".into())),
            Err(RecordKey::Record("f1".into()))
        );
        assert!(in_flight.begin(RecordKey::Record("f2".into())).is_ok());

        in_flight.finish(&ticket);
        assert!(in_flight.begin(RecordKey::Record("f1".into())).is_ok());
    }

    #[test]
    fn older_replacement_is_stale() {
        let mut in_flight = InFlight::default();
        let first = in_flight.begin(RecordKey::Record("a".into())).unwrap();
        let second = in_flight.begin(RecordKey::Record("b".into())).unwrap();

        assert!(in_flight.accept_replacement("c1", &second));
        assert!(!in_flight.accept_replacement("c1", &first));
    }

    #[test]
    fn replacements_of_different_lists_do_not_outdate_each_other() {
        let mut in_flight = InFlight::default();
        let sales = in_flight.begin(RecordKey::Record("s1".into())).unwrap();
        let support = in_flight.begin(RecordKey::Record("t1".into())).unwrap();

        assert!(in_flight.accept_replacement("c-support", &support));
        assert!(in_flight.accept_replacement("c-sales", &sales));
    }

    #[test]
    fn snapshot_outdates_every_issued_ticket() {
        let mut in_flight = InFlight::default();
        let ticket = in_flight.begin(RecordKey::Create("c1".into())).unwrap();
        in_flight.mark_snapshot();
        assert!(!in_flight.accept_replacement("c1", &ticket));

        let later = in_flight.begin(RecordKey::Create("c2".into())).unwrap();
        assert!(in_flight.accept_replacement("c2", &later));
    }

    #[test]
    fn snapshot_resets_per_list_watermarks() {
        let mut in_flight = InFlight::default();
        let applied = in_flight.begin(RecordKey::Record("a".into())).unwrap();
        assert!(in_flight.accept_replacement("c1", &applied));

        in_flight.mark_snapshot();
        let next = in_flight.begin(RecordKey::Record("b".into())).unwrap();
        assert!(in_flight.accept_replacement("c1", &next));
    }
}
