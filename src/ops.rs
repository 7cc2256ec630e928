pub mod filter;
pub mod map_err;
pub mod merge_delay_error;
pub mod sample;
pub mod take_last;
pub mod take_while;
pub mod throttle_first;
