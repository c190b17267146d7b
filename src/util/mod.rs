//! Low-level utilities shared by the runtime: the handle arena,
//! deterministic hashing, a seeded PRNG, and entropy source traits.

pub mod arena;
pub mod det_hash;
pub mod det_rng;
pub mod entropy;

pub use arena::{Arena, Generation, Handle, SlotIndex, StateMask, TypeTag};
pub use det_hash::{DetBuildHasher, DetHashMap, DetHashSet, DetHasher};
pub use det_rng::DetRng;
pub use entropy::{DetEntropy, EntropySource, OsEntropy};
