#![forbid(unsafe_code)]

use civic_contracts::RecordId;

use crate::snapshot::LedgerSnapshot;

/// Ids at or below this value are never issued.
pub const ID_FLOOR: u64 = 10_000;
/// Upper bound of the display-valid id range.
pub const ID_DISPLAY_MAX: u64 = 99_999;

/// Sequential id source shared by all four ledger kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next: ID_FLOOR + 1 }
    }
}

impl IdAllocator {
    pub fn next_id(&mut self) -> RecordId {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        RecordId::from_number(id)
    }

    /// Value the next call to `next_id` will issue.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Resets the counter to one past the highest numeric id in `snapshot`
    /// (or past the floor). Non-numeric ids are ignored.
    pub fn initialize_from(&mut self, snapshot: &LedgerSnapshot) {
        let existing_max = snapshot
            .record_ids()
            .filter_map(RecordId::as_number)
            .max()
            .unwrap_or(ID_FLOOR);
        self.next = existing_max.max(ID_FLOOR).saturating_add(1);
    }

    pub(crate) fn ensure_at_least(&mut self, next: u64) {
        self.next = self.next.max(next);
    }
}

/// Display-layer check: the id is an integer in `[10000, 99999]`.
pub fn is_valid_id(id: &str) -> bool {
    id.trim()
        .parse::<u64>()
        .map(|n| (ID_FLOOR..=ID_DISPLAY_MAX).contains(&n))
        .unwrap_or(false)
}
