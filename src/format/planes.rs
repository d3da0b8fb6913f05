//! Mapping from `(c, z, t)` plane coordinates to TIFF pages.

use std::collections::HashMap;

use crate::metadata::{OmeMetadata, Pixels, PlaneSizes};

/// Page index of every stored plane of one series.
///
/// Channel coordinates are effective channels: samples of an RGB channel share
/// one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaneMap {
    pages: HashMap<(usize, usize, usize), usize>,
}

impl PlaneMap {
    /// Build the map for one series.
    ///
    /// TiffData blocks are honoured when present. Otherwise the series' planes
    /// occupy consecutive pages starting at `first_page`, in dimension order.
    /// Pages at or beyond `page_count` are left out.
    pub fn build(pixels: &Pixels, first_page: usize, page_count: usize) -> Self {
        let sizes = PlaneSizes::of(pixels);
        let order = pixels.dimension_order;
        let total = sizes.total();
        let mut pages = HashMap::new();

        if pixels.tiff_data.is_empty() {
            for index in 0..total {
                let page = first_page + index;
                if page >= page_count {
                    break;
                }
                pages.insert(order.plane_coords(index, sizes), page);
            }
        } else {
            for block in &pixels.tiff_data {
                let ifd = block.ifd.unwrap_or(0);
                let count = block
                    .plane_count
                    .unwrap_or(if block.ifd.is_some() { 1 } else { total });
                let start = order.plane_index(block.first_c, block.first_z, block.first_t, sizes);
                for k in 0..count {
                    let index = start + k;
                    let page = ifd + k;
                    if index >= total || page >= page_count {
                        break;
                    }
                    pages.insert(order.plane_coords(index, sizes), page);
                }
            }
        }

        Self { pages }
    }

    /// Page holding effective channel `c` at `(z, t)`.
    pub fn page(&self, c: usize, z: usize, t: usize) -> Option<usize> {
        self.pages.get(&(c, z, t)).copied()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Plane maps for every series of a file, in series order.
pub fn build_plane_maps(metadata: &OmeMetadata, page_count: usize) -> Vec<PlaneMap> {
    let mut next_page = 0;
    metadata
        .images
        .iter()
        .map(|image| {
            let map = PlaneMap::build(&image.pixels, next_page, page_count);
            next_page += image.pixels.plane_count();
            map
        })
        .collect()
}
