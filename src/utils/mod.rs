//! Utility functions and helpers
//!
//! Atomic file replacement, timestamp helpers and string truncation.

pub mod atomic;
pub mod time;

pub use atomic::{atomic_write, cleanup_temp_files, AtomicError, AtomicResult};
pub use time::{format_timestamp, now_seconds, parse_timestamp, truncate_to_seconds};

/// Keep at most `max` characters of `value`
///
/// Counts Unicode scalar values so a multi-byte character is never split.
pub fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((byte_idx, _)) => value[..byte_idx].to_string(),
        None => value.to_string(),
    }
}
