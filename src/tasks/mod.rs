pub mod monitor;
pub mod sequence;
