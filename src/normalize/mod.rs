//! Axis normalization.
//!
//! Decoded pixels reach the converter in one of two shapes:
//!
//! - a dense whole-file stack of 2 to 5 dimensions ([`normalize_stack`]),
//!   which is only left-padded with unit axes;
//! - individual planes addressed by `(c, z, t, series)` through a
//!   [`PlaneSource`] ([`normalize_planes`]), which are written into a zeroed
//!   5-D buffer with RGB slicing and X/Y transpose detection.
//!
//! Both produce a [`NormalizedArray`] with labelled axes.

mod array;
mod plane;
mod stack;

pub use array::{AxisLabel, NormalizedArray, CTZXY, CTZYX};
pub use plane::{fit_plane, needs_transpose, normalize_planes, PlaneSource, RGB_SAMPLES};
pub use stack::{normalize_stack, MAX_STACK_DIMS, MIN_STACK_DIMS};
