use ndarray::{ArrayD, Axis, Ix5};

use crate::error::NormalizeError;

use super::array::{NormalizedArray, CTZYX};

/// Smallest stack rank accepted by [`normalize_stack`].
pub const MIN_STACK_DIMS: usize = 2;

/// Largest stack rank accepted by [`normalize_stack`].
pub const MAX_STACK_DIMS: usize = 5;

/// Bring a whole-file stack to five dimensions.
///
/// Size-1 axes are prepended until the array has rank 5 and the result is
/// read as `(c, t, z, y, x)`. Existing axes are never reordered, so a stack
/// is only canonical if its on-disk order already was.
///
/// # Errors
/// `UnsupportedDimensionality` for inputs of rank below 2 or above 5.
pub fn normalize_stack(stack: ArrayD<f64>) -> Result<NormalizedArray, NormalizeError> {
    let ndim = stack.ndim();
    if !(MIN_STACK_DIMS..=MAX_STACK_DIMS).contains(&ndim) {
        return Err(NormalizeError::UnsupportedDimensionality { ndim });
    }

    let mut data = stack;
    while data.ndim() < MAX_STACK_DIMS {
        data = data.insert_axis(Axis(0));
    }
    let data = data
        .into_dimensionality::<Ix5>()
        .map_err(|_| NormalizeError::UnsupportedDimensionality { ndim })?;

    Ok(NormalizedArray::new(data, CTZYX))
}
