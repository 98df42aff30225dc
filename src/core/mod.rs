pub mod access;
pub mod config;
pub mod models;
pub mod ports;
pub mod time_range;

pub use access::ChannelAccessPolicy;
pub use time_range::{RangeExpr, RangeUnit, TimeRangeParser};
