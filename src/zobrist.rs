use crate::level::{MAX_SIZE, Pos};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Zobrist keys for search states.
///
/// A state key is the XOR of one key per box cell with the key of the
/// canonical player cell. XOR folding makes the key invariant under any
/// permutation of the box list.
pub struct Zobrist {
    box_keys: [[u64; MAX_SIZE]; MAX_SIZE],
    player_keys: [[u64; MAX_SIZE]; MAX_SIZE],
}

impl Zobrist {
    pub fn new() -> Self {
        // Seeded PRNG so keys are identical across runs.
        let mut rng = ChaCha8Rng::seed_from_u64(0x9e3779b97f4a7c15);

        let mut box_keys = [[0u64; MAX_SIZE]; MAX_SIZE];
        for row in box_keys.iter_mut() {
            for cell in row.iter_mut() {
                *cell = rng.next_u64();
            }
        }

        let mut player_keys = [[0u64; MAX_SIZE]; MAX_SIZE];
        for row in player_keys.iter_mut() {
            for cell in row.iter_mut() {
                *cell = rng.next_u64();
            }
        }

        Zobrist {
            box_keys,
            player_keys,
        }
    }

    pub fn box_key(&self, pos: Pos) -> u64 {
        self.box_keys[pos.1 as usize][pos.0 as usize]
    }

    pub fn player_key(&self, pos: Pos) -> u64 {
        self.player_keys[pos.1 as usize][pos.0 as usize]
    }

    /// Key for a push-level search state: box set plus canonical player cell.
    pub fn state_key(&self, boxes: &[Pos], canonical_player: Pos) -> u64 {
        let mut key = self.player_key(canonical_player);
        for &pos in boxes {
            key ^= self.box_key(pos);
        }
        key
    }
}

impl Default for Zobrist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_stable_across_instances() {
        let a = Zobrist::new();
        let b = Zobrist::new();
        assert_eq!(a.box_key(Pos(3, 7)), b.box_key(Pos(3, 7)));
        assert_eq!(a.player_key(Pos(0, 0)), b.player_key(Pos(0, 0)));
    }

    #[test]
    fn test_state_key_permutation_invariant() {
        let z = Zobrist::new();
        let forward = z.state_key(&[Pos(1, 1), Pos(2, 3), Pos(5, 5)], Pos(0, 1));
        let shuffled = z.state_key(&[Pos(5, 5), Pos(1, 1), Pos(2, 3)], Pos(0, 1));
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn test_state_key_depends_on_player_and_boxes() {
        let z = Zobrist::new();
        let base = z.state_key(&[Pos(1, 1)], Pos(0, 1));
        assert_ne!(base, z.state_key(&[Pos(1, 1)], Pos(1, 0)));
        assert_ne!(base, z.state_key(&[Pos(1, 2)], Pos(0, 1)));
    }
}
