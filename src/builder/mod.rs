//! Batch creation orchestration

mod classify;
mod core;

pub use core::{BatchReceipt, BlockBuilder, PreviewStats};
