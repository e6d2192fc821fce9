//! Capacity growth policy for [`ChunkedBuffer`](super::ChunkedBuffer).
//!
//! Small buffers grow like a contiguous vector (doubling, with a 1 KiB floor)
//! until they reach one block. From there on, capacity is always a whole
//! number of blocks.

/// Smallest capacity handed out by the doubling branch.
pub const MIN_GROWTH: usize = 1024;

/// Compute the capacity to allocate so that `needed` bytes fit.
///
/// Only meaningful when `needed > current`.
pub fn grown_capacity(current: usize, needed: usize, block_size: usize) -> usize {
    if needed < block_size {
        doubled(current, needed, block_size)
    } else {
        rounded_to_blocks(needed, block_size)
    }
}

fn doubled(current: usize, needed: usize, block_size: usize) -> usize {
    needed
        .max(MIN_GROWTH)
        .max(current.saturating_mul(2))
        .min(block_size)
}

fn rounded_to_blocks(needed: usize, block_size: usize) -> usize {
    needed.div_ceil(block_size) * block_size
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: usize = 81920;

    #[test]
    fn doubling_uses_floor_for_tiny_requests() {
        assert_eq!(grown_capacity(0, 1, BLOCK), MIN_GROWTH);
        assert_eq!(grown_capacity(0, 1000, BLOCK), MIN_GROWTH);
    }

    #[test]
    fn doubling_prefers_twice_current() {
        assert_eq!(grown_capacity(1024, 1025, BLOCK), 2048);
        assert_eq!(grown_capacity(4096, 5000, BLOCK), 8192);
    }

    #[test]
    fn doubling_takes_request_when_larger() {
        assert_eq!(grown_capacity(1024, 3000, BLOCK), 3000);
    }

    #[test]
    fn doubling_is_capped_at_one_block() {
        assert_eq!(grown_capacity(65536, 70000, BLOCK), BLOCK);
        // Floor is larger than a tiny block.
        assert_eq!(grown_capacity(0, 3, 4), 4);
    }

    #[test]
    fn rounding_branch_starts_at_block_size() {
        assert_eq!(grown_capacity(0, BLOCK, BLOCK), BLOCK);
        assert_eq!(grown_capacity(BLOCK, BLOCK + 1, BLOCK), 2 * BLOCK);
        assert_eq!(grown_capacity(0, 10, 4), 12);
    }

    #[test]
    fn rounding_ignores_current_capacity() {
        assert_eq!(grown_capacity(3 * BLOCK, 3 * BLOCK + 5, BLOCK), 4 * BLOCK);
        assert_eq!(grown_capacity(100, 5 * BLOCK, BLOCK), 5 * BLOCK);
    }
}
