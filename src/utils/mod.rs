pub mod ip;
pub mod time;

pub use time::{format_duration, now_millis};
