//! Format decoding tests through [`ImageFileReader`].

use ndarray::IxDyn;

use omero_converter::error::FormatError;
use omero_converter::format::{DecodePath, ImageFileReader, MetadataSource};
use omero_converter::inspect_file;
use omero_converter::metadata::DimensionOrder;
use omero_converter::normalize::PlaneSource;

use super::test_utils::{
    ome_xml, ByteOrderType, MemoryReader, MockFileSource, PageSpec, StripCompression,
    TiffBuilder,
};

async fn open(data: Vec<u8>, name: &str) -> ImageFileReader<MemoryReader> {
    ImageFileReader::open(MemoryReader::new(data, name), name)
        .await
        .unwrap()
}

fn ramp_pages(count: u8) -> impl Iterator<Item = PageSpec> {
    (0..count).map(|k| PageSpec::ramp8(4, 2, 10 * k))
}

// =============================================================================
// OME-TIFF
// =============================================================================

#[tokio::test]
async fn test_ome_tiff_metadata_and_stack() {
    let data = TiffBuilder::new()
        .with_description(ome_xml(4, 2, 2, 2, 1))
        .add_pages(ramp_pages(4))
        .build();
    let reader = open(data, "cells.ome.tif").await;

    assert_eq!(reader.metadata_source(), MetadataSource::OmeXml);
    assert_eq!(reader.series_count(), 1);
    assert_eq!(reader.page_count(), 4);

    let metadata = reader.metadata();
    assert_eq!(metadata.instruments.len(), 1);
    let pixels = &metadata.images[0].pixels;
    assert_eq!(pixels.dimension_order, DimensionOrder::XYZCT);
    assert_eq!((pixels.size_x, pixels.size_y), (4, 2));

    // XYZCT read slowest first, singleton T dropped: (C, Z, Y, X)
    let stack = reader.read_stack(0).await.unwrap();
    assert_eq!(stack.shape(), &[2, 2, 2, 4]);
    assert_eq!(stack[IxDyn(&[0, 1, 0, 0])], 10.0);
    assert_eq!(stack[IxDyn(&[1, 0, 1, 3])], 27.0);
}

#[tokio::test]
async fn test_read_plane_by_coordinate() {
    let data = TiffBuilder::new()
        .with_description(ome_xml(4, 2, 2, 2, 1))
        .add_pages(ramp_pages(4))
        .build();
    let reader = open(data, "cells.ome.tif").await;

    let plane = reader.read_plane(1, 0, 0, 0).await.unwrap().unwrap();
    assert_eq!(plane.shape(), &[2, 4]);
    assert_eq!(plane[IxDyn(&[0, 0])], 20.0);

    // T is a singleton axis
    assert!(reader.read_plane(0, 0, 1, 0).await.unwrap().is_none());
    assert!(matches!(
        reader.read_plane(0, 0, 0, 3).await,
        Err(FormatError::Metadata { .. })
    ));
}

#[tokio::test]
async fn test_missing_series_is_a_metadata_error() {
    let data = TiffBuilder::new().add_pages(ramp_pages(1)).build();
    let reader = open(data, "one.tif").await;

    assert!(matches!(
        reader.read_stack(1).await,
        Err(FormatError::Metadata { .. })
    ));
}

#[tokio::test]
async fn test_malformed_ome_xml_is_rejected() {
    let data = TiffBuilder::new()
        .with_description("<OME><Image ID=\"Image:0\">")
        .add_pages(ramp_pages(1))
        .build();
    let result = ImageFileReader::open(MemoryReader::new(data, "bad.ome.tif"), "bad.ome.tif").await;

    assert!(matches!(result, Err(FormatError::Metadata { .. })));
}

// =============================================================================
// ImageJ and Plain TIFF
// =============================================================================

#[tokio::test]
async fn test_imagej_hyperstack_layout() {
    let data = TiffBuilder::new()
        .with_description("ImageJ=1.54f\nimages=6\nchannels=2\nslices=3\nframes=1\nhyperstack=true\n")
        .add_pages(ramp_pages(6))
        .build();
    let reader = open(data, "hyper.tif").await;

    assert_eq!(reader.metadata_source(), MetadataSource::ImageJ);
    let image = &reader.metadata().images[0];
    assert_eq!(image.name.as_deref(), Some("hyper.tif"));
    assert_eq!(image.pixels.dimension_order, DimensionOrder::XYCZT);
    assert_eq!((image.pixels.size_c, image.pixels.size_z), (2, 3));

    // XYCZT read slowest first: (Z, C, Y, X); page = c + 2 * z
    let stack = reader.read_stack(0).await.unwrap();
    assert_eq!(stack.shape(), &[3, 2, 2, 4]);
    assert_eq!(stack[IxDyn(&[1, 0, 0, 0])], 20.0);
    assert_eq!(stack[IxDyn(&[2, 1, 0, 1])], 51.0);
}

#[tokio::test]
async fn test_plain_tiff_pages_become_z() {
    let data = TiffBuilder::new().add_pages(ramp_pages(3)).build();
    let reader = open(data, "plain.tif").await;

    assert_eq!(reader.metadata_source(), MetadataSource::Synthesized);
    let pixels = &reader.metadata().images[0].pixels;
    assert_eq!((pixels.size_c, pixels.size_z, pixels.size_t), (1, 3, 1));
    assert_eq!(reader.read_stack(0).await.unwrap().shape(), &[3, 2, 4]);
}

// =============================================================================
// Encodings
// =============================================================================

#[tokio::test]
async fn test_big_endian_bigtiff_16_bit() {
    let data = TiffBuilder::new()
        .with_byte_order(ByteOrderType::BigEndian)
        .with_bigtiff(true)
        .add_page(PageSpec::gray16(2, 2, &[1000, 2000, 65535, 0]))
        .build();
    let reader = open(data, "big.btf").await;

    let plane = reader.read_plane(0, 0, 0, 0).await.unwrap().unwrap();
    assert_eq!(
        plane.iter().copied().collect::<Vec<_>>(),
        vec![1000.0, 2000.0, 65535.0, 0.0]
    );
}

#[tokio::test]
async fn test_deflate_strips_decode_like_uncompressed() {
    let plain = TiffBuilder::new().add_pages(ramp_pages(2)).build();
    let deflated = TiffBuilder::new()
        .with_compression(StripCompression::Deflate)
        .add_pages(ramp_pages(2))
        .build();

    let expected = open(plain, "a.tif").await.read_stack(0).await.unwrap();
    let actual = open(deflated, "b.tif").await.read_stack(0).await.unwrap();
    assert_eq!(actual, expected);
}

// =============================================================================
// Inspection
// =============================================================================

#[tokio::test]
async fn test_inspect_reports_route_and_metadata() {
    let data = TiffBuilder::new()
        .with_description(ome_xml(4, 2, 2, 2, 1))
        .add_pages(ramp_pages(4))
        .build();
    let source = MockFileSource::new().with_file("s3://bucket/cells.ome.tf2", data);

    let report = inspect_file(&source, "s3://bucket/cells.ome.tf2")
        .await
        .unwrap();
    assert_eq!(report.decode_path, DecodePath::PlaneIndexed);
    assert_eq!(report.metadata_source, MetadataSource::OmeXml);
    assert_eq!(report.page_count, 4);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["decode_path"], "plane_indexed");
    assert_eq!(json["location"], "s3://bucket/cells.ome.tf2");
}
