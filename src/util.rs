use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::{rngs::StdRng, SeedableRng};

pub fn calculate_hash<T: Hash>(t: &T) -> u64 {
    let mut s = DefaultHasher::new();
    t.hash(&mut s);
    s.finish()
}

// seed generators per neuron so that streams do not depend on generation order
pub fn neuron_rng(seed: u64, nid: usize, stream: &str) -> StdRng {
    StdRng::seed_from_u64(calculate_hash(&(seed, nid, stream)))
}
