pub mod hash;
pub mod pool;
pub mod rng;
