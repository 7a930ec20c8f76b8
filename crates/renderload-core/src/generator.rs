//! Lock-free cyclic query generator
//!
//! One generator exists per query group. All workers of the group call
//! [`CyclicQueryGenerator::next_query`] concurrently; the only shared mutable
//! state is an atomic cursor, advanced with `fetch_add` and wrapped with a
//! compare-and-swap.
//!
//! ## Cursor protocol
//!
//! The cursor counts slots handed out in the current cycle. A caller
//! increments it and receives a token in `1..=len` (slot `token - 1`), or a
//! token past the end. Past the end, the caller tries to swap the cursor from
//! its own token to `1`, claiming slot `0` of the next cycle. If the swap
//! fails another caller moved the cursor first, and the token is discarded
//! and the protocol restarts from the increment.
//!
//! ```text
//!   len = 3     fetch_add ─► 1  2  3  4 ──cas(4→1)──► slot 0
//!                            │  │  │                     then 2 3 4 ...
//!               slot         0  1  2
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::catalog::TargetCatalog;
use crate::offsets::{OffsetSource, ThreadRngOffsets};
use crate::query::{Query, RenderFormat};

/// Round-robin render query factory over a shared target catalog
pub struct CyclicQueryGenerator {
    catalog: TargetCatalog,
    window_secs: u64,
    format: RenderFormat,
    offsets: Arc<dyn OffsetSource>,
    cursor: AtomicU64,
}

impl CyclicQueryGenerator {
    /// Create a generator drawing offsets from the calling thread's RNG.
    ///
    /// Returns `None` for an empty catalog.
    pub fn new(catalog: TargetCatalog, window_secs: u64) -> Option<Self> {
        Self::with_offsets(
            catalog,
            window_secs,
            RenderFormat::default(),
            Arc::new(ThreadRngOffsets),
        )
    }

    /// Create a generator with an explicit output format and offset source.
    ///
    /// Returns `None` for an empty catalog.
    pub fn with_offsets(
        catalog: TargetCatalog,
        window_secs: u64,
        format: RenderFormat,
        offsets: Arc<dyn OffsetSource>,
    ) -> Option<Self> {
        if catalog.is_empty() {
            return None;
        }

        Some(Self {
            catalog,
            window_secs,
            format,
            offsets,
            cursor: AtomicU64::new(0),
        })
    }

    /// Produce the next query.
    ///
    /// Targets are visited in catalog order, wrapping at the end; the time
    /// window is `[now - (until + span), now - until]` with `until` drawn from
    /// the offset source.
    pub fn next_query(&self) -> Query {
        let slot = self.next_slot();
        let until_secs = self.offsets.draw_until();
        let from_secs = until_secs + self.window_secs;

        // slot < len always holds, see next_slot
        let target = self.catalog.get(slot).unwrap_or_default();

        Query::render(self.format, target, from_secs, until_secs)
    }

    /// Claim the next catalog slot, in `[0, len)`.
    pub fn next_slot(&self) -> usize {
        let len = self.catalog.len() as u64;

        loop {
            let token = self.cursor.fetch_add(1, Ordering::AcqRel) + 1;
            if token <= len {
                return (token - 1) as usize;
            }

            if self
                .cursor
                .compare_exchange(token, 1, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
            {
                return 0;
            }

            // lost the wraparound race; the token is stale
            std::hint::spin_loop();
        }
    }

    /// Distance between `from` and `until`, in seconds
    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }
}

impl fmt::Debug for CyclicQueryGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CyclicQueryGenerator")
            .field("targets", &self.catalog.len())
            .field("window_secs", &self.window_secs)
            .field("format", &self.format)
            .field("offsets", &self.offsets)
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}
