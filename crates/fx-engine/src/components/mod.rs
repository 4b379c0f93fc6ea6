pub mod emitter;
pub mod layer;
