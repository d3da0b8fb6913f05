use ndarray::Array5;
use serde::Serialize;

/// Label of one axis of a [`NormalizedArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisLabel {
    C,
    T,
    Z,
    Y,
    X,
}

impl AxisLabel {
    pub const fn as_char(self) -> char {
        match self {
            AxisLabel::C => 'c',
            AxisLabel::T => 't',
            AxisLabel::Z => 'z',
            AxisLabel::Y => 'y',
            AxisLabel::X => 'x',
        }
    }
}

/// Canonical `(c, t, z, y, x)` order.
pub const CTZYX: [AxisLabel; 5] = [
    AxisLabel::C,
    AxisLabel::T,
    AxisLabel::Z,
    AxisLabel::Y,
    AxisLabel::X,
];

/// Order of plane-indexed buffers, which store planes as `(size_x, size_y)`.
pub const CTZXY: [AxisLabel; 5] = [
    AxisLabel::C,
    AxisLabel::T,
    AxisLabel::Z,
    AxisLabel::X,
    AxisLabel::Y,
];

/// Dense 5-D `f64` pixel buffer with labelled axes.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedArray {
    data: Array5<f64>,
    dims: [AxisLabel; 5],
}

impl NormalizedArray {
    pub fn new(data: Array5<f64>, dims: [AxisLabel; 5]) -> Self {
        Self { data, dims }
    }

    pub fn shape(&self) -> [usize; 5] {
        let s = self.data.shape();
        [s[0], s[1], s[2], s[3], s[4]]
    }

    pub fn dims(&self) -> [AxisLabel; 5] {
        self.dims
    }

    /// Axis labels as a compact string such as `"ctzyx"`.
    pub fn dims_string(&self) -> String {
        self.dims.iter().map(|d| d.as_char()).collect()
    }

    pub fn data(&self) -> &Array5<f64> {
        &self.data
    }

    pub fn into_data(self) -> Array5<f64> {
        self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Samples in logical (row-major) order as little-endian `f64` bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() * 8);
        for value in self.data.iter() {
            out.extend_from_slice(&value.to_le_bytes());
        }
        out
    }
}
