pub mod encoding;
pub mod pool;
pub mod time;
mod types;

pub use types::*;
