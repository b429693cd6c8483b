//! Normalization of abundance tables.

pub mod tss;

pub use tss::{norm_tss, relative_abundance, scale};
