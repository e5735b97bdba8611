/*!
 * Victim Selection RNG
 *
 * [xorshift*] generator, one per worker. Quality only needs to be good
 * enough to spread steal attempts across peers.
 *
 * [xorshift*]: https://en.wikipedia.org/wiki/Xorshift#xorshift*
 */

use std::hash::{BuildHasher, Hash, Hasher};

const FIXED_STATE: u64 = 0x9a70_13f4_75bb_8c23;

pub(super) struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    /// Seed from a worker index; distinct per scheduler instance
    pub(super) fn for_worker(index: usize) -> Self {
        let mut hasher = ahash::RandomState::new().build_hasher();
        index.hash(&mut hasher);
        let seed = hasher.finish();
        Self {
            // Any non-zero state will do
            state: if seed == 0 { FIXED_STATE } else { seed },
        }
    }

    #[inline]
    fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d)
    }

    /// Value in `0..n`; `n` must be non-zero
    #[inline]
    pub(super) fn next_usize(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }
}
