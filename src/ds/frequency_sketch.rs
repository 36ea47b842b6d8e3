//! Count-Min Sketch frequency estimator for W-TinyLFU admission.
//!
//! Four rows of 4-bit saturating counters, packed two per byte. The width
//! is the next power of two at or above the cache capacity, so column
//! selection is a mask instead of a modulo.
//!
//! ## Architecture
//!
//! ```text
//!   table: Vec<u8>, (width * 4) / 2 bytes, two counters per byte
//!
//!   row 0:  [c c][c c][c c] ...   column = mix(hash, SEED_0) & (width - 1)
//!   row 1:  [c c][c c][c c] ...   column = mix(hash, SEED_1) & (width - 1)
//!   row 2:  ...
//!   row 3:  ...
//!
//!   increment(h): saturate-increment one counter per row (cap 15)
//!   estimate(h):  min of the four counters
//! ```
//!
//! ## Aging
//!
//! A per-instance sample counter increments on every `increment`. When it
//! reaches `width * 10`, every counter is halved and the sample counter
//! resets. This bounds bias toward historically hot keys and gives
//! W-TinyLFU its adaptive property. The counter belongs to the sketch
//! instance, one sketch per W-TinyLFU shard.

/// Number of hash rows.
const DEPTH: usize = 4;

/// Per-row mixing seeds, distinct fixed constants.
const ROW_SEEDS: [u64; DEPTH] = [
    0x9e37_79b9_7f4a_7c15,
    0xc2b2_ae3d_27d4_eb4f,
    0x1656_67b1_9e37_79f9,
    0xff51_afd7_ed55_8ccd,
];

/// Saturation cap of one 4-bit counter.
const MAX_COUNT: u8 = 15;

/// Count-Min Sketch with 4-bit saturating counters and periodic halving.
///
/// # Example
///
/// ```
/// use shardcache::ds::FrequencySketch;
///
/// let mut sketch = FrequencySketch::new(64);
/// sketch.increment(42);
/// sketch.increment(42);
/// assert!(sketch.estimate(42) >= 2);
/// assert_eq!(sketch.estimate(7), 0);
/// ```
#[derive(Debug)]
pub struct FrequencySketch {
    table: Vec<u8>,
    width: usize,
    mask: u64,
    sample: u64,
    sample_size: u64,
}

impl FrequencySketch {
    /// Creates a sketch sized for `capacity` entries.
    ///
    /// Width becomes the next power of two at or above `capacity` (minimum
    /// 2, so each row spans at least one full byte).
    pub fn new(capacity: usize) -> Self {
        let width = capacity.next_power_of_two().max(2);
        Self {
            table: vec![0u8; width * DEPTH / 2],
            width,
            mask: (width - 1) as u64,
            sample: 0,
            sample_size: (width as u64) * 10,
        }
    }

    /// Returns the number of columns per row.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Bumps the counter for `hash` in every row, saturating at 15.
    ///
    /// Triggers the aging pass when the sample period elapses.
    pub fn increment(&mut self, hash: u64) {
        for (row, seed) in ROW_SEEDS.iter().enumerate() {
            let slot = row * self.width + self.column(hash, *seed);
            let byte = slot >> 1;
            let shift = (slot & 1) * 4;
            let count = (self.table[byte] >> shift) & 0xF;
            if count < MAX_COUNT {
                self.table[byte] += 1 << shift;
            }
        }

        self.sample += 1;
        if self.sample >= self.sample_size {
            self.age();
        }
    }

    /// Returns the estimated access count for `hash`.
    pub fn estimate(&self, hash: u64) -> u8 {
        let mut min = MAX_COUNT;
        for (row, seed) in ROW_SEEDS.iter().enumerate() {
            let slot = row * self.width + self.column(hash, *seed);
            let byte = slot >> 1;
            let shift = (slot & 1) * 4;
            let count = (self.table[byte] >> shift) & 0xF;
            min = min.min(count);
        }
        min
    }

    /// Resets every counter and the sample period.
    pub fn clear(&mut self) {
        self.table.fill(0);
        self.sample = 0;
    }

    #[inline]
    fn column(&self, hash: u64, seed: u64) -> usize {
        let mut x = hash ^ seed;
        x ^= x >> 33;
        x = x.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
        x ^= x >> 33;
        (x & self.mask) as usize
    }

    /// Halves every counter in place; both nibbles of a byte at once.
    fn age(&mut self) {
        for byte in &mut self.table {
            *byte = (*byte >> 1) & 0x77;
        }
        self.sample = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_rounds_up_to_power_of_two() {
        assert_eq!(FrequencySketch::new(1).width(), 2);
        assert_eq!(FrequencySketch::new(100).width(), 128);
        assert_eq!(FrequencySketch::new(128).width(), 128);
    }

    #[test]
    fn increment_raises_estimate() {
        let mut sketch = FrequencySketch::new(64);
        assert_eq!(sketch.estimate(1), 0);
        sketch.increment(1);
        assert_eq!(sketch.estimate(1), 1);
        sketch.increment(1);
        sketch.increment(1);
        assert_eq!(sketch.estimate(1), 3);
    }

    #[test]
    fn counters_saturate_at_fifteen() {
        let mut sketch = FrequencySketch::new(64);
        for _ in 0..40 {
            sketch.increment(9);
        }
        assert_eq!(sketch.estimate(9), 15);
    }

    #[test]
    fn estimates_are_independent_enough() {
        let mut sketch = FrequencySketch::new(256);
        for _ in 0..10 {
            sketch.increment(1);
        }
        assert_eq!(sketch.estimate(1), 10);
        // A cold key may collide on some rows, but the min keeps the
        // estimate at or below the hot key's count.
        assert!(sketch.estimate(2) <= sketch.estimate(1));
    }

    #[test]
    fn aging_halves_counters() {
        let mut sketch = FrequencySketch::new(4);
        // width=4, so the 40th increment triggers the halving pass.
        for _ in 0..39 {
            sketch.increment(1);
        }
        assert_eq!(sketch.estimate(1), 15);
        sketch.increment(1);
        assert_eq!(sketch.estimate(1), 7);
    }

    #[test]
    fn clear_resets_counters_and_sample() {
        let mut sketch = FrequencySketch::new(16);
        for _ in 0..5 {
            sketch.increment(3);
        }
        sketch.clear();
        assert_eq!(sketch.estimate(3), 0);
    }

    #[test]
    fn tiny_capacity_still_works() {
        let mut sketch = FrequencySketch::new(1);
        sketch.increment(7);
        assert!(sketch.estimate(7) >= 1);
    }
}
