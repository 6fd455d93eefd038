//! Trading-bot strategy settings checked by the terminal.
//!
//! The bot itself runs elsewhere; this crate only validates the allocation
//! sliders before they are saved.

pub mod allocation;

pub use allocation::{AllocationCheck, StrategyAllocations};
