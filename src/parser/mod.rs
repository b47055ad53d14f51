pub mod duration;
pub(crate) mod parse_error;
pub mod time_zone;

pub use duration::*;
pub use parse_error::*;
pub use time_zone::*;
