//! Cross-platform utilities
//!
//! - [`fs`] - Atomic writes and directory helpers
//! - [`platform`] - Home directory resolution and platform traits

pub mod fs;
pub mod platform;

pub use fs::{atomic_write, ensure_dir, find_files_named, read_text_file, safe_write};
pub use platform::{expand_home, get_home_dir, is_case_insensitive_fs, is_windows};
