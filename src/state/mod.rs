//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `TargetState`: the lifecycle of a single frontier entry, with validated transitions

mod target_state;

pub use target_state::TargetState;
