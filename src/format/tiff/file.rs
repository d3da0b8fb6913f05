//! A whole TIFF file: header plus the full IFD chain.

use std::collections::HashSet;

use ndarray::ArrayD;
use tracing::debug;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{Ifd, TiffHeader, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE};
use super::pixels::{read_page, PageLayout};
use super::tags::TiffTag;
use super::values::ValueReader;

/// Upper bound on pages walked before the chain is considered corrupt.
const MAX_PAGES: usize = 1 << 20;

/// An opened TIFF file.
///
/// Owns its reader. Opening walks the IFD chain and reads the first page's
/// ImageDescription; pixel data is only fetched by [`TiffFile::read_page`].
pub struct TiffFile<R: RangeReader> {
    reader: R,
    header: TiffHeader,
    pages: Vec<Ifd>,
    description: Option<String>,
}

impl<R: RangeReader> TiffFile<R> {
    /// Parse the header and IFD chain.
    ///
    /// # Errors
    /// Header errors from [`TiffHeader::parse`], `InvalidIfdOffset` for
    /// offsets outside the file or loops in the chain, and I/O errors.
    pub async fn open(reader: R) -> Result<Self, TiffError> {
        let size = reader.size();
        if size < TIFF_HEADER_SIZE as u64 {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: size,
            });
        }

        let header_len = (BIGTIFF_HEADER_SIZE as u64).min(size) as usize;
        let header_bytes = reader.read_exact_at(0, header_len).await?;
        let header = TiffHeader::parse(&header_bytes, size)?;

        let pages = walk_ifds(&reader, &header).await?;
        if pages.is_empty() {
            return Err(TiffError::InvalidIfdOffset(header.first_ifd_offset));
        }

        let description = {
            let values = ValueReader::new(&reader, &header);
            match pages[0].get_entry(TiffTag::ImageDescription) {
                Some(entry) => Some(values.read_string(entry, TiffTag::ImageDescription).await?),
                None => None,
            }
        };

        debug!(
            file = reader.identifier(),
            pages = pages.len(),
            bigtiff = header.is_bigtiff,
            "Opened TIFF"
        );

        Ok(Self {
            reader,
            header,
            pages,
            description,
        })
    }

    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    /// Number of IFDs (pages) in the file.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// ImageDescription of the first page.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn identifier(&self) -> &str {
        self.reader.identifier()
    }

    /// Decode the layout of one page.
    pub async fn page_layout(&self, index: usize) -> Result<PageLayout, TiffError> {
        let ifd = self.pages.get(index).ok_or(TiffError::PageOutOfRange {
            index,
            count: self.pages.len(),
        })?;
        let values = ValueReader::new(&self.reader, &self.header);
        PageLayout::from_ifd(ifd, &values).await
    }

    /// Read the pixels of one page as `(h, w)` or `(h, w, samples)`.
    pub async fn read_page(&self, index: usize) -> Result<ArrayD<f64>, TiffError> {
        let layout = self.page_layout(index).await?;
        read_page(&self.reader, &layout, self.header.byte_order).await
    }
}

async fn walk_ifds<R: RangeReader>(reader: &R, header: &TiffHeader) -> Result<Vec<Ifd>, TiffError> {
    let size = reader.size();
    let mut pages = Vec::new();
    let mut seen = HashSet::new();
    let mut offset = header.first_ifd_offset;

    while offset != 0 {
        if offset >= size || !seen.insert(offset) || pages.len() >= MAX_PAGES {
            return Err(TiffError::InvalidIfdOffset(offset));
        }

        let count_bytes = reader
            .read_exact_at(offset, header.ifd_count_size())
            .await?;
        let entry_count = Ifd::entry_count(&count_bytes, header)?;
        let ifd_size = Ifd::calculate_size(entry_count, header);
        let ifd_len = usize::try_from(ifd_size).map_err(|_| TiffError::InvalidIfdOffset(offset))?;

        let bytes = reader.read_exact_at(offset, ifd_len).await?;
        let ifd = Ifd::parse(&bytes, header)?;
        offset = ifd.next_ifd_offset;
        pages.push(ifd);
    }

    Ok(pages)
}
