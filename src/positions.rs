//! # Position generators
//!
//! Helpers that choose *which* variables a chromosome operation touches:
//!
//! - [`ShuffledSet`] hands out non-repeating random positions out of
//!   `0..size`. It initializes chromosomes and picks bits during repair.
//! - [`GeometricSkips`] draws the gap to the next mutated bit, so symmetric
//!   bit-flip mutation costs one draw per flipped bit instead of one per bit.

use rand::Rng;

use crate::rng::RandomNumberGenerator;

/// Moves `count` uniformly chosen, distinct elements of `items` to its front
/// (a partial Fisher-Yates shuffle) and returns them.
pub fn partial_shuffle<'a, T, R: Rng + ?Sized>(
    items: &'a mut [T],
    count: usize,
    rng: &mut R,
) -> &'a [T] {
    let count = count.min(items.len());
    for i in 0..count {
        let j = rng.gen_range(i..items.len());
        items.swap(i, j);
    }
    &items[..count]
}

/// A reusable permutation of `0..size` that yields random subsets of positions.
#[derive(Debug, Clone)]
pub struct ShuffledSet {
    positions: Vec<usize>,
}

impl ShuffledSet {
    /// Creates a set over the positions `0..size`.
    pub fn new(size: usize) -> Self {
        Self {
            positions: (0..size).collect(),
        }
    }

    /// Number of positions in the set.
    pub fn size(&self) -> usize {
        self.positions.len()
    }

    /// Returns `count` distinct positions chosen uniformly at random.
    ///
    /// The backing permutation is left shuffled; it stays a permutation of
    /// `0..size`, so repeated calls remain uniform.
    pub fn shuffle(&mut self, count: usize, rng: &mut RandomNumberGenerator) -> &[usize] {
        partial_shuffle(&mut self.positions, count, rng)
    }

    /// Lazily yields all positions in random order, one Fisher-Yates step per item.
    ///
    /// Stop early to draw only as many positions as needed.
    pub fn iter<'a>(
        &'a mut self,
        rng: &'a mut RandomNumberGenerator,
    ) -> impl Iterator<Item = usize> + 'a {
        let n = self.positions.len();
        let mut i = 0;
        std::iter::from_fn(move || {
            if i >= n {
                return None;
            }
            let j = rng.gen_range(i..n);
            self.positions.swap(i, j);
            i += 1;
            Some(self.positions[i - 1])
        })
    }
}

/// Draws gaps between Bernoulli(`p`) successes over a finite bit sequence.
///
/// The gap follows a geometric distribution truncated at the sequence length,
/// so walking `pos += 1 + gap` visits every position independently with
/// probability `p`.
#[derive(Debug, Clone, Copy)]
pub struct GeometricSkips {
    probability: f64,
    log_failure: f64,
    limit: usize,
}

impl GeometricSkips {
    /// Creates a generator for success probability `probability` over `limit` positions.
    pub fn new(probability: f64, limit: usize) -> Self {
        Self {
            probability,
            log_failure: (1.0 - probability).ln(),
            limit,
        }
    }

    /// Number of positions to skip before the next success.
    ///
    /// Returns `limit` (i.e. "no further success") when `probability <= 0`.
    pub fn next_gap(&self, rng: &mut RandomNumberGenerator) -> usize {
        if self.probability <= 0.0 {
            return self.limit;
        }
        if self.probability >= 1.0 {
            return 0;
        }
        // 1 - U lies in (0, 1], so the logarithm is finite
        let u = 1.0 - rng.uniform(0.0, 1.0);
        let gap = (u.ln() / self.log_failure).floor();
        if gap >= self.limit as f64 {
            self.limit
        } else {
            gap as usize
        }
    }

    /// Iterator over the successful positions in `0..limit`.
    pub fn positions<'a>(
        &'a self,
        rng: &'a mut RandomNumberGenerator,
    ) -> impl Iterator<Item = usize> + 'a {
        let mut next = self.next_gap(rng);
        std::iter::from_fn(move || {
            if next >= self.limit {
                return None;
            }
            let current = next;
            next = current + 1 + self.next_gap(rng);
            Some(current)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_shuffle_distinct_and_in_range() {
        let mut rng = RandomNumberGenerator::new(42);
        let mut set = ShuffledSet::new(20);
        assert_eq!(set.size(), 20);
        for count in 0..=20 {
            let drawn = set.shuffle(count, &mut rng).to_vec();
            assert_eq!(drawn.len(), count);
            let unique: HashSet<_> = drawn.iter().collect();
            assert_eq!(unique.len(), count);
            assert!(drawn.iter().all(|&p| p < 20));
        }
    }

    #[test]
    fn test_shuffle_keeps_permutation() {
        let mut rng = RandomNumberGenerator::new(1);
        let mut set = ShuffledSet::new(10);
        set.shuffle(4, &mut rng);
        set.shuffle(7, &mut rng);
        let mut all = set.shuffle(10, &mut rng).to_vec();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn test_iter_yields_every_position_once() {
        let mut rng = RandomNumberGenerator::new(12);
        let mut set = ShuffledSet::new(15);
        let mut all: Vec<usize> = set.iter(&mut rng).collect();
        all.sort_unstable();
        assert_eq!(all, (0..15).collect::<Vec<_>>());
        assert_eq!(set.iter(&mut rng).take(3).count(), 3);
    }

    #[test]
    fn test_shuffle_count_is_clamped() {
        let mut rng = RandomNumberGenerator::new(1);
        let mut set = ShuffledSet::new(3);
        assert_eq!(set.shuffle(10, &mut rng).len(), 3);
    }

    #[test]
    fn test_partial_shuffle_covers_all_positions() {
        let mut rng = RandomNumberGenerator::new(9);
        let mut seen = HashSet::new();
        let mut items: Vec<usize> = (0..8).collect();
        for _ in 0..500 {
            seen.insert(partial_shuffle(&mut items, 1, &mut rng)[0]);
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn test_geometric_extremes() {
        let mut rng = RandomNumberGenerator::new(3);
        let never = GeometricSkips::new(0.0, 50);
        assert_eq!(never.positions(&mut rng).count(), 0);

        let always = GeometricSkips::new(1.0, 50);
        assert_eq!(always.positions(&mut rng).collect::<Vec<_>>(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_geometric_rate() {
        let mut rng = RandomNumberGenerator::new(77);
        let skips = GeometricSkips::new(0.1, 1000);
        let trials = 200;
        let hits: usize = (0..trials).map(|_| skips.positions(&mut rng).count()).sum();
        let rate = hits as f64 / (trials * 1000) as f64;
        assert!((rate - 0.1).abs() < 0.01, "rate was {}", rate);
    }

    #[test]
    fn test_geometric_positions_increase() {
        let mut rng = RandomNumberGenerator::new(5);
        let skips = GeometricSkips::new(0.3, 100);
        let positions: Vec<usize> = skips.positions(&mut rng).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(positions.iter().all(|&p| p < 100));
    }
}
