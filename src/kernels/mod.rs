//! Pure, stateless kernels for the value conversions the wire codec is built
//! from: calendar arithmetic, fixed-point sign handling, and text
//! transcoding.
//!
//! Every function in this tree is total. Malformed input is clamped or
//! truncated, never rejected: a single corrupt value must not abort an
//! in-progress multi-megabyte batch.

pub mod decimal;
pub mod temporal;
pub mod text;
