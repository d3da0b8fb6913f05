use async_trait::async_trait;
use ndarray::{s, Array2, Array5, ArrayD, Axis, Ix2};
use tracing::{debug, warn};

use crate::error::{ConvertError, FormatError, NormalizeError};
use crate::metadata::{Pixels, MAX_SERIES_ELEMENTS};

use super::array::{NormalizedArray, CTZXY};

/// Number of samples in an RGB composite plane.
pub const RGB_SAMPLES: usize = 3;

/// Indexed single-plane access to a decoded file.
#[async_trait]
pub trait PlaneSource: Send + Sync {
    /// Read the plane at `(c, z, t)` of `series`.
    ///
    /// Returns `Ok(None)` when the file stores no plane at that coordinate.
    async fn read_plane(
        &self,
        c: usize,
        z: usize,
        t: usize,
        series: usize,
    ) -> Result<Option<ArrayD<f64>>, FormatError>;
}

/// Whether a plane of `shape` is stored with X and Y swapped.
///
/// Only decidable when `size_x != size_y`; square planes are never
/// considered transposed.
pub fn needs_transpose(shape: &[usize], size_x: usize, size_y: usize) -> bool {
    shape.len() >= 2 && shape[0] == size_y && shape[1] == size_x && size_x != size_y
}

/// Fit one decoded plane into a `(size_x, size_y)` slot.
///
/// RGB composites (`(h, w, 3)`) are reduced to sample `c`. Returns the plane
/// and whether it was transposed.
///
/// # Errors
/// - `ChannelOutOfRange` if `c` has no slice in an RGB composite
/// - `PlaneShapeMismatch` if the plane fits the slot neither directly nor
///   transposed
pub fn fit_plane(
    plane: ArrayD<f64>,
    c: usize,
    size_x: usize,
    size_y: usize,
) -> Result<(Array2<f64>, bool), NormalizeError> {
    let plane = if plane.ndim() == 3 && plane.shape()[2] == RGB_SAMPLES {
        if c >= RGB_SAMPLES {
            return Err(NormalizeError::ChannelOutOfRange {
                channel: c,
                available: RGB_SAMPLES,
            });
        }
        plane.index_axis_move(Axis(2), c)
    } else {
        plane
    };

    let shape = plane.shape().to_vec();
    let mismatch = || NormalizeError::PlaneShapeMismatch {
        actual: shape.clone(),
        size_x,
        size_y,
    };
    let plane = plane.into_dimensionality::<Ix2>().map_err(|_| mismatch())?;

    if needs_transpose(plane.shape(), size_x, size_y) {
        return Ok((plane.reversed_axes(), true));
    }
    if plane.dim() == (size_x, size_y) {
        return Ok((plane, false));
    }
    Err(mismatch())
}

/// Assemble a 5-D array from individually read planes.
///
/// The buffer is allocated as zeros of shape
/// `(size_c, size_t, size_z, size_x, size_y)` and every plane the source
/// returns is stored at `[c, t, z, .., ..]`. Coordinates without a plane stay
/// zero.
pub async fn normalize_planes<P>(
    source: &P,
    pixels: &Pixels,
    series: usize,
) -> Result<NormalizedArray, ConvertError>
where
    P: PlaneSource + ?Sized,
{
    let (size_x, size_y) = (pixels.size_x, pixels.size_y);
    let shape = (pixels.size_c, pixels.size_t, pixels.size_z, size_x, size_y);
    if pixels.element_count().is_none() {
        return Err(NormalizeError::ArrayTooLarge {
            shape: vec![shape.0, shape.1, shape.2, shape.3, shape.4],
            limit: MAX_SERIES_ELEMENTS,
        }
        .into());
    }
    let mut buffer = Array5::<f64>::zeros(shape);

    let mut stored = 0usize;
    for c in 0..pixels.size_c {
        for z in 0..pixels.size_z {
            for t in 0..pixels.size_t {
                let Some(plane) = source.read_plane(c, z, t, series).await? else {
                    continue;
                };
                let (plane, transposed) = fit_plane(plane, c, size_x, size_y)?;
                if transposed {
                    warn!(c, z, t, "Image might be transposed. Swapping X and Y");
                }
                buffer.slice_mut(s![c, t, z, .., ..]).assign(&plane);
                stored += 1;
            }
        }
    }

    debug!(
        series,
        stored,
        planes = pixels.size_c * pixels.size_z * pixels.size_t,
        "Assembled plane-indexed array"
    );

    Ok(NormalizedArray::new(buffer, CTZXY))
}
