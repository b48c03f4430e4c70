//! Seeded RNG for station randomness (the random bits rolled when a station
//! gets its first facility). Saved with the world so a reload continues the
//! same sequence.

use bevy::prelude::*;
use bitcode::{Decode, Encode};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const DEFAULT_SEED: u64 = 0x5747;

#[derive(Resource)]
pub struct StationRng(pub ChaCha8Rng);

impl Default for StationRng {
    fn default() -> Self {
        Self::seeded(DEFAULT_SEED)
    }
}

impl StationRng {
    pub fn seeded(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }
}

/// Full generator state: seed, stream and position.
#[derive(Encode, Decode, Default)]
struct RngState {
    seed: [u8; 32],
    stream: u64,
    word_pos: u128,
}

impl crate::Saveable for StationRng {
    const SAVE_KEY: &'static str = "station_rng";

    fn save_to_bytes(&self) -> Option<Vec<u8>> {
        Some(bitcode::encode(&RngState {
            seed: self.0.get_seed(),
            stream: self.0.get_stream(),
            word_pos: self.0.get_word_pos(),
        }))
    }

    fn load_from_bytes(bytes: &[u8]) -> Self {
        let state = match bitcode::decode::<RngState>(bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!("StationRng: failed to decode save data, reseeding: {}", e);
                return Self::default();
            }
        };
        let mut rng = ChaCha8Rng::from_seed(state.seed);
        rng.set_stream(state.stream);
        rng.set_word_pos(state.word_pos);
        Self(rng)
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;
    use crate::Saveable;

    #[test]
    fn test_same_seed_same_bits() {
        let mut a = StationRng::seeded(3);
        let mut b = StationRng::seeded(3);
        let xs: Vec<u16> = (0..16).map(|_| a.0.gen()).collect();
        let ys: Vec<u16> = (0..16).map(|_| b.0.gen()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_reload_continues_sequence() {
        let mut rng = StationRng::seeded(11);
        for _ in 0..37 {
            rng.0.gen::<u16>();
        }
        let bytes = rng.save_to_bytes().expect("should produce bytes");
        let mut restored = StationRng::load_from_bytes(&bytes);

        let xs: Vec<u16> = (0..20).map(|_| rng.0.gen()).collect();
        let ys: Vec<u16> = (0..20).map(|_| restored.0.gen()).collect();
        assert_eq!(xs, ys);
    }
}
