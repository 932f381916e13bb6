//! Shared test utilities for the map tile pipeline workspace.
//!
//! This crate provides common testing infrastructure including:
//! - An in-memory metadata fetcher that records requested URLs
//! - A GPU context that records texture and buffer traffic
//! - Synthetic raster generators
//! - Tileset and tile matrix set JSON fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```
//!
//! Then import in your integration tests:
//!
//! ```ignore
//! use test_utils::{fixtures, MockFetcher};
//! ```

pub mod fetcher;
pub mod fixtures;
pub mod generators;
pub mod gpu;

// Re-export commonly used items at the crate root
pub use fetcher::MockFetcher;
pub use generators::*;
pub use gpu::{GpuCall, RecordingGpu};

/// Macro for approximate floating-point equality assertions.
///
/// # Usage
///
/// ```ignore
/// use test_utils::assert_approx_eq;
///
/// assert_approx_eq!(1.0001_f64, 1.0_f64, 0.001_f64); // passes
/// assert_approx_eq!(1.1_f32, 1.0_f32, 0.001_f32);    // fails
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Macro for approximate equality of map coordinates.
///
/// ```ignore
/// assert_coords_approx_eq!(grid.origin(0).unwrap(), [-180.0, 90.0], 1e-9);
/// ```
#[macro_export]
macro_rules! assert_coords_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: [f64; 2] = $left;
        let right: [f64; 2] = $right;
        $crate::assert_approx_eq!(left[0], right[0], $epsilon);
        $crate::assert_approx_eq!(left[1], right[1], $epsilon);
    }};
}
