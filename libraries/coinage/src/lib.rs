//! Unique-id minting for locally authored content.
//!
//! Locally authored posts and comments carry millisecond-timestamp ids, which
//! keeps them far away from the catalog's small server-assigned integers but
//! is only unique as long as two ids never land in the same millisecond.
//! `ClockMint` closes that gap by bumping past the last minted id, and
//! `SequenceMint` exists so tests get deterministic ids.

use chrono::Utc;

pub trait IdMint {
    fn mint(&mut self) -> u64;
}

/// Millisecond-clock ids, strictly increasing within a session.
#[derive(Debug, Default)]
pub struct ClockMint {
    last: u64,
}

impl ClockMint {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdMint for ClockMint {
    fn mint(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        self.last = now.max(self.last + 1);
        self.last
    }
}

/// Counts up from a fixed starting point. Test-only in spirit, but not
/// test-gated: callers embedding this crate off-browser may want it too.
#[derive(Debug)]
pub struct SequenceMint {
    next: u64,
}

impl SequenceMint {
    pub fn starting_at(first: u64) -> Self {
        Self { next: first }
    }
}

impl IdMint for SequenceMint {
    fn mint(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}
