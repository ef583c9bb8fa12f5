//! A single atomic cursor shared by every worker scanning one relation (spec §5):
//! `ScanNodeID` and the FactorizedTable row-claim scan feeding the BFS dispatcher both
//! reserve ranges off a `MorselDesc` by CAS, never by holding a lock.

use std::sync::atomic::{AtomicU64, Ordering};

/// `{current, max}` counter. Workers CAS-advance `current` by up to `batch_size` per
/// call; the morsel returned may be short (the last one before `max`).
pub struct MorselDesc {
    current: AtomicU64,
    max: u64,
}

/// A reserved, half-open range `[start_tuple_idx, start_tuple_idx + num_tuples)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TableMorsel {
    pub start_tuple_idx: u64,
    pub num_tuples: u64,
}

impl MorselDesc {
    pub fn new(max: u64) -> Self {
        Self { current: AtomicU64::new(0), max }
    }

    /// Reserve up to `batch_size` rows. Returns a zero-`num_tuples` morsel once
    /// `current >= max` (the scan's EOS signal).
    pub fn get_morsel(&self, batch_size: u64) -> TableMorsel {
        let start = self.current.fetch_add(batch_size, Ordering::SeqCst);
        if start >= self.max {
            return TableMorsel { start_tuple_idx: self.max, num_tuples: 0 };
        }
        let num_tuples = batch_size.min(self.max - start);
        TableMorsel { start_tuple_idx: start, num_tuples }
    }

    pub fn max(&self) -> u64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_exactly_once() {
        let desc = MorselDesc::new(10);
        let mut total = 0;
        loop {
            let m = desc.get_morsel(4);
            if m.num_tuples == 0 {
                break;
            }
            total += m.num_tuples;
        }
        assert_eq!(total, 10);
    }
}
