pub mod pipeline;
pub mod types;
