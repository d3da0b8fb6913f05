//! Whole-stack reads for the simple-stack path.
//!
//! The pages of a series are stacked in the file's own plane order: the
//! dimension order read from slowest to fastest axis, dropping axes of length
//! one, followed by Y, X and (for multi-sample pages) the sample axis. No axis
//! is reordered to a canonical layout here.

use ndarray::{ArrayD, IxDyn};

use crate::error::{FormatError, TiffError};
use crate::io::RangeReader;
use crate::metadata::{checked_elements, PlaneAxis, Pixels, PlaneSizes, MAX_SERIES_ELEMENTS};

use super::planes::PlaneMap;
use super::tiff::TiffFile;

/// Leading (non-spatial) axes of a stack, slowest first.
pub fn stack_axes(pixels: &Pixels) -> Vec<(PlaneAxis, usize)> {
    let sizes = PlaneSizes::of(pixels);
    let mut axes = pixels.dimension_order.axes();
    axes.reverse();
    axes.into_iter()
        .map(|axis| (axis, sizes.get(axis)))
        .filter(|&(_, len)| len > 1)
        .collect()
}

/// Read every plane of a series into one dense array.
///
/// Planes without a backing page are zero.
///
/// # Errors
/// `InconsistentPages` if pages of the series differ in shape, plus any
/// decoding error.
pub async fn read_stack<R: RangeReader>(
    tiff: &TiffFile<R>,
    pixels: &Pixels,
    planes: &PlaneMap,
) -> Result<ArrayD<f64>, FormatError> {
    let axes = stack_axes(pixels);
    let page_shape = match first_page(pixels, planes, &axes) {
        Some(page) => tiff.page_layout(page).await?.shape(),
        None => {
            let samples = pixels.samples_per_channel();
            let mut shape = vec![pixels.size_y, pixels.size_x];
            if samples > 1 {
                shape.push(samples);
            }
            shape
        }
    };
    let page_len: usize = page_shape.iter().product();

    let outer: Vec<usize> = axes.iter().map(|&(_, len)| len).collect();
    let plane_total: usize = outer.iter().product();
    let mut data = Vec::with_capacity(stack_len(&outer, &page_shape)?);

    for linear in 0..plane_total {
        let (c, z, t) = coords_at(linear, &axes);
        match planes.page(c, z, t) {
            Some(page) => {
                let plane = tiff.read_page(page).await?;
                if plane.shape() != page_shape.as_slice() {
                    return Err(TiffError::InconsistentPages {
                        expected: page_shape.clone(),
                        actual: plane.shape().to_vec(),
                    }
                    .into());
                }
                data.extend(plane.iter().copied());
            }
            None => data.extend(std::iter::repeat(0.0).take(page_len)),
        }
    }

    let mut shape = outer;
    shape.extend_from_slice(&page_shape);
    ArrayD::from_shape_vec(IxDyn(&shape), data).map_err(|e| FormatError::Metadata {
        message: format!("stack shape {:?} does not match its data: {}", shape, e),
    })
}

/// Samples in a stack of `outer` planes shaped `page_shape`.
fn stack_len(outer: &[usize], page_shape: &[usize]) -> Result<usize, FormatError> {
    let dims: Vec<usize> = outer.iter().chain(page_shape).copied().collect();
    checked_elements(&dims).ok_or_else(|| FormatError::Metadata {
        message: format!(
            "stack of {:?} planes shaped {:?} exceeds {} samples",
            outer, page_shape, MAX_SERIES_ELEMENTS
        ),
    })
}

fn first_page(pixels: &Pixels, planes: &PlaneMap, axes: &[(PlaneAxis, usize)]) -> Option<usize> {
    let total = PlaneSizes::of(pixels).total();
    (0..total).find_map(|linear| {
        let (c, z, t) = coords_at(linear, axes);
        planes.page(c, z, t)
    })
}

/// `(c, z, t)` of the `linear`-th plane in row-major order over `axes`.
fn coords_at(linear: usize, axes: &[(PlaneAxis, usize)]) -> (usize, usize, usize) {
    let (mut c, mut z, mut t) = (0, 0, 0);
    let mut rest = linear;
    for &(axis, len) in axes.iter().rev() {
        let value = rest % len;
        rest /= len;
        match axis {
            PlaneAxis::C => c = value,
            PlaneAxis::Z => z = value,
            PlaneAxis::T => t = value,
        }
    }
    (c, z, t)
}
