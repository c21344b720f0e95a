pub(crate) mod stats;
pub(crate) mod utils;

pub mod sentiment;
