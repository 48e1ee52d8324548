//! Capture file input.

pub mod capture;

pub use capture::{load_capture, parse_capture};
