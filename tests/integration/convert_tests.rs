//! End-to-end conversion tests.
//!
//! Files are built in memory, served by [`MockFileSource`] and submitted to a
//! [`RecordingClient`].

use chrono::{TimeZone, Utc};

use omero_converter::error::{ConvertError, FormatError, IoError, NormalizeError, SubmitError};
use omero_converter::mapping::{
    ConversionContext, ConversionOptions, Dataset, Era, OmeroFile, Stage,
};
use omero_converter::{convert_omero_file, ConvertRequest, Converter};

use super::test_utils::{
    ome_xml, FailOn, MockFileSource, PageSpec, RecordingClient, TiffBuilder,
};

fn omero_file(location: &str) -> OmeroFile {
    OmeroFile {
        id: "file-1".to_string(),
        name: location.rsplit('/').next().unwrap_or(location).to_string(),
        file: Some(location.to_string()),
        datasets: vec![Dataset {
            id: "ds-1".to_string(),
            name: Some("Screen".to_string()),
        }],
    }
}

/// 4x2 pages, page `k` holding `10 * k + row * 4 + col`.
fn ramp_pages(count: u8) -> Vec<PageSpec> {
    (0..count).map(|k| PageSpec::ramp8(4, 2, 10 * k)).collect()
}

fn ome_tiff() -> Vec<u8> {
    TiffBuilder::new()
        .with_description(ome_xml(4, 2, 2, 2, 1))
        .add_pages(ramp_pages(4))
        .build()
}

// =============================================================================
// Simple Stack Path
// =============================================================================

#[tokio::test]
async fn test_plain_stack_is_padded_to_five_dims() {
    let data = TiffBuilder::new().add_pages(ramp_pages(3)).build();
    let source = MockFileSource::new().with_file("/data/stack.tif", data);
    let client = RecordingClient::new();
    let file = omero_file("/data/stack.tif");

    let handles = convert_omero_file(
        &source,
        &client,
        &file,
        &ConversionContext::default(),
        &ConversionOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].name, "stack.tif - stack.tif");

    let representations = client.representations.lock().unwrap();
    let recorded = &representations[0];
    assert_eq!(recorded.shape, [1, 1, 3, 2, 4]);
    assert_eq!(recorded.dims, "ctzyx");
    // Row-major: z, then y, then x
    assert_eq!(recorded.values[0], 0.0);
    assert_eq!(recorded.values[7], 7.0);
    assert_eq!(recorded.values[8 + 5], 15.0);
    assert_eq!(recorded.values[16 + 4], 24.0);

    let input = &recorded.input;
    assert_eq!(input.datasets, vec!["ds-1".to_string()]);
    assert_eq!(input.file_origins, vec!["file-1".to_string()]);
    assert_eq!(input.tags, vec!["converted".to_string()]);
    assert!(input.omero.instrument.is_none());
    assert!(input.omero.position.is_none());
}

#[tokio::test]
async fn test_stack_path_creates_default_channel_and_view() {
    let data = TiffBuilder::new().add_pages(ramp_pages(2)).build();
    let source = MockFileSource::new().with_file("stack.stk", data);
    let client = RecordingClient::new();
    let converter = Converter::new(source, client);

    let handles = converter
        .convert(&ConvertRequest::new(omero_file("stack.stk")))
        .await
        .unwrap();

    let client = converter.client();
    let channels = client.channels.lock().unwrap();
    assert_eq!(channels.len(), 1);
    assert_eq!(channels[0].name, "Channel 0");

    let representations = client.representations.lock().unwrap();
    let views = &representations[0].input.views;
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].channel, "channel-1");
    assert_eq!((views[0].c_min, views[0].c_max), (0, 0));
    assert_eq!(handles[0].id, "representation-2");
}

// =============================================================================
// Plane Indexed Path
// =============================================================================

#[tokio::test]
async fn test_plane_path_transposes_non_square_planes() {
    let source = MockFileSource::new().with_file("s3://bucket/cells.btf", ome_tiff());
    let client = RecordingClient::new();
    let file = omero_file("s3://bucket/cells.btf");

    convert_omero_file(
        &source,
        &client,
        &file,
        &ConversionContext::default(),
        &ConversionOptions::default(),
    )
    .await
    .unwrap();

    let representations = client.representations.lock().unwrap();
    let recorded = &representations[0];
    assert_eq!(recorded.shape, [2, 1, 2, 4, 2]);
    assert_eq!(recorded.dims, "ctzxy");

    // Index of (c, t, z, x, y) in a (2, 1, 2, 4, 2) buffer
    let at = |c: usize, z: usize, x: usize, y: usize| c * 16 + z * 8 + x * 2 + y;
    // XYZCT pages: (c0 z0), (c0 z1), (c1 z0), (c1 z1)
    assert_eq!(recorded.values[at(0, 0, 0, 0)], 0.0);
    assert_eq!(recorded.values[at(0, 0, 3, 1)], 7.0);
    assert_eq!(recorded.values[at(0, 1, 1, 0)], 11.0);
    assert_eq!(recorded.values[at(1, 0, 3, 1)], 27.0);
    assert_eq!(recorded.values[at(1, 1, 2, 1)], 36.0);
}

#[tokio::test]
async fn test_plane_path_accepts_case_insensitive_tiff() {
    let data = TiffBuilder::new()
        .add_pages((0..2).map(|k| PageSpec::ramp8(3, 3, 9 * k)))
        .build();
    let source = MockFileSource::new().with_file("scan.TIFF", data);
    let client = RecordingClient::new();

    convert_omero_file(
        &source,
        &client,
        &omero_file("scan.TIFF"),
        &ConversionContext::default(),
        &ConversionOptions::default(),
    )
    .await
    .unwrap();

    let representations = client.representations.lock().unwrap();
    let recorded = &representations[0];
    // Square planes are stored as read: the buffer's x axis holds rows
    assert_eq!(recorded.shape, [1, 1, 2, 3, 3]);
    assert_eq!(recorded.dims, "ctzxy");
    assert_eq!(recorded.values[1], 1.0);
    assert_eq!(recorded.values[3], 3.0);
    assert_eq!(recorded.values[9 + 8], 17.0);
}

#[tokio::test]
async fn test_plane_path_slices_rgb_samples() {
    let pixels: Vec<[u8; 3]> = (0..6u8).map(|i| [i, 100 + i, 200 + i]).collect();
    let data = TiffBuilder::new()
        .add_page(PageSpec::rgb8(3, 2, &pixels))
        .build();
    let source = MockFileSource::new().with_file("photo.btf", data);
    let client = RecordingClient::new();

    convert_omero_file(
        &source,
        &client,
        &omero_file("photo.btf"),
        &ConversionContext::default(),
        &ConversionOptions::default(),
    )
    .await
    .unwrap();

    let representations = client.representations.lock().unwrap();
    let recorded = &representations[0];
    assert_eq!(recorded.shape, [3, 1, 1, 3, 2]);

    // Index of (c, x, y) in a (3, 1, 1, 3, 2) buffer
    let at = |c: usize, x: usize, y: usize| c * 6 + x * 2 + y;
    // Pixel (row 1, col 2) is index 5
    assert_eq!(recorded.values[at(0, 2, 1)], 5.0);
    assert_eq!(recorded.values[at(1, 2, 1)], 105.0);
    assert_eq!(recorded.values[at(2, 0, 0)], 200.0);

    // One RGB channel, one view
    assert_eq!(client.channels.lock().unwrap().len(), 1);
}

// =============================================================================
// Metadata Mapping
// =============================================================================

#[tokio::test]
async fn test_ome_metadata_is_mapped_to_payload() {
    let source = MockFileSource::new().with_file("plate/cells.ome.btf", ome_tiff());
    let client = RecordingClient::new();
    let context = ConversionContext {
        stage: Some(Stage {
            id: "stage-7".to_string(),
            name: None,
        }),
        era: Some(Era {
            id: "era-3".to_string(),
            name: Some("Day 1".to_string()),
            start: Some(Utc.with_ymd_and_hms(2023, 5, 17, 9, 0, 0).unwrap()),
        }),
        dataset: Some(Dataset {
            id: "ds-explicit".to_string(),
            name: None,
        }),
    };
    let options = ConversionOptions {
        position_tolerance: Some(0.5),
        ..ConversionOptions::default()
    };

    let handles = convert_omero_file(
        &source,
        &client,
        &omero_file("plate/cells.ome.btf"),
        &context,
        &options,
    )
    .await
    .unwrap();
    assert_eq!(handles[0].name, "cells.ome.btf - Well A1");

    let instruments = client.instruments.lock().unwrap();
    assert_eq!(instruments.len(), 1);
    assert_eq!(instruments[0].name, "Instrument:0");
    assert_eq!(instruments[0].manufacturer.as_deref(), Some("Zeiss"));
    assert_eq!(instruments[0].model.as_deref(), Some("LSM 980"));

    let positions = client.positions.lock().unwrap();
    assert_eq!(positions.len(), 1);
    assert_eq!(positions[0].stage, "stage-7");
    assert_eq!((positions[0].x, positions[0].y, positions[0].z), (12.5, -3.0, 1.0));
    assert_eq!(positions[0].tolerance, Some(0.5));

    let timepoints = client.timepoints.lock().unwrap();
    assert_eq!(timepoints.len(), 1);
    assert_eq!(timepoints[0].era, "era-3");
    assert!((timepoints[0].delta_t - 0.25).abs() < 1e-9);

    let channels = client.channels.lock().unwrap();
    assert_eq!(channels.len(), 2);
    assert_eq!(channels[0].name, "C0");
    assert_eq!(channels[1].emission_wavelength, Some(550.0));
    assert_eq!(channels[0].color, Some([255, 0, 0]));

    let representations = client.representations.lock().unwrap();
    let input = &representations[0].input;
    assert_eq!(input.datasets, vec!["ds-explicit".to_string()]);
    assert_eq!(input.views.len(), 2);
    assert_eq!((input.views[1].c_min, input.views[1].c_max), (1, 1));

    let omero = &input.omero;
    assert_eq!(omero.instrument.as_deref(), Some("instrument-1"));
    assert_eq!(omero.position.as_deref(), Some("position-2"));
    assert_eq!(omero.timepoint.as_deref(), Some("timepoint-3"));
    assert_eq!(omero.planes.len(), 2);
    assert_eq!(omero.planes[0].exposure_time, Some(0.1));
    assert_eq!(omero.planes[1].z, 1);
    assert_eq!(omero.physical_size.z, Some(2.0));
    assert_eq!(omero.channels.len(), 2);
    let objective = omero.objective_settings.as_ref().unwrap();
    assert_eq!(objective.medium.as_deref(), Some("OIL"));
    assert_eq!(objective.refractive_index, Some(1.518));
    assert!(omero.imaging_environment.is_none());
}

#[tokio::test]
async fn test_disabled_options_skip_derived_entities() {
    let source = MockFileSource::new().with_file("cells.btf", ome_tiff());
    let client = RecordingClient::new();
    let context = ConversionContext {
        stage: Some(Stage {
            id: "stage-7".to_string(),
            name: None,
        }),
        era: Some(Era {
            id: "era-3".to_string(),
            name: None,
            start: None,
        }),
        dataset: None,
    };
    let options = ConversionOptions {
        position_from_planes: false,
        timepoint_from_time: false,
        channels_from_channels: false,
        ..ConversionOptions::default()
    };

    convert_omero_file(&source, &client, &omero_file("cells.btf"), &context, &options)
        .await
        .unwrap();

    assert!(client.positions.lock().unwrap().is_empty());
    assert!(client.timepoints.lock().unwrap().is_empty());
    assert!(client.channels.lock().unwrap().is_empty());

    let representations = client.representations.lock().unwrap();
    let input = &representations[0].input;
    assert!(input.views.is_empty());
    // Channel metadata still travels with the representation
    assert_eq!(input.omero.channels.len(), 2);
}

#[tokio::test]
async fn test_era_without_start_is_a_precondition_error() {
    let source = MockFileSource::new().with_file("cells.btf", ome_tiff());
    let client = RecordingClient::new();
    let context = ConversionContext {
        era: Some(Era {
            id: "era-3".to_string(),
            name: None,
            start: None,
        }),
        ..ConversionContext::default()
    };

    let result = convert_omero_file(
        &source,
        &client,
        &omero_file("cells.btf"),
        &context,
        &ConversionOptions::default(),
    )
    .await;

    assert!(matches!(result, Err(ConvertError::Precondition(_))));
    assert!(client.representations.lock().unwrap().is_empty());
}

// =============================================================================
// Multi-Series
// =============================================================================

/// Two images without TiffData: a named 2-plane Z stack then an unnamed
/// single plane, stored as consecutive pages.
fn two_series_tiff() -> Vec<u8> {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<OME xmlns="http://www.openmicroscopy.org/Schemas/OME/2016-06">
  <Image ID="Image:0" Name="A">
    <Pixels ID="Pixels:0" DimensionOrder="XYZCT" Type="uint8"
            SizeX="4" SizeY="2" SizeZ="2" SizeC="1" SizeT="1">
      <Channel ID="Channel:0:0" SamplesPerPixel="1"/>
    </Pixels>
  </Image>
  <Image ID="Image:1">
    <Pixels ID="Pixels:1" DimensionOrder="XYZCT" Type="uint8"
            SizeX="4" SizeY="2" SizeZ="1" SizeC="1" SizeT="1">
      <Channel ID="Channel:1:0" SamplesPerPixel="1"/>
    </Pixels>
  </Image>
</OME>"#;
    TiffBuilder::new()
        .with_description(xml)
        .add_pages(ramp_pages(3))
        .build()
}

#[tokio::test]
async fn test_each_series_becomes_a_representation_in_order() {
    for name in ["multi.ome.btf", "multi.ome.tif"] {
        let source = MockFileSource::new().with_file(name, two_series_tiff());
        let client = RecordingClient::new();

        let handles = convert_omero_file(
            &source,
            &client,
            &omero_file(name),
            &ConversionContext::default(),
            &ConversionOptions::default(),
        )
        .await
        .unwrap();

        let names: Vec<&str> = handles.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(
            names,
            vec![format!("{} - A", name), format!("{} - (1)", name)],
            "{}",
            name
        );

        let representations = client.representations.lock().unwrap();
        assert_eq!(representations.len(), 2, "{}", name);

        // Series 0 holds pages 0 and 1 along Z
        let first = &representations[0];
        assert_eq!(first.values.len(), 16);
        assert_eq!(first.values[0], 0.0);
        assert_eq!(first.values[8], 10.0);
        assert_eq!(first.values[15], 17.0);

        // Series 1 starts after them, at page 2
        let second = &representations[1];
        assert_eq!(second.values.len(), 8);
        assert_eq!(second.values[0], 20.0);
        assert_eq!(second.values[7], 27.0);
    }
}

// =============================================================================
// Failure Paths
// =============================================================================

#[tokio::test]
async fn test_missing_file_location_is_rejected() {
    let source = MockFileSource::new();
    let client = RecordingClient::new();

    for location in [None, Some("   ".to_string())] {
        let file = OmeroFile {
            file: location,
            ..omero_file("unused.tif")
        };
        let result = convert_omero_file(
            &source,
            &client,
            &file,
            &ConversionContext::default(),
            &ConversionOptions::default(),
        )
        .await;

        match result {
            Err(ConvertError::Precondition(message)) => assert_eq!(message, "No file provided"),
            other => panic!("expected precondition error, got {:?}", other),
        }
    }
    assert!(source.opened().is_empty());
}

#[tokio::test]
async fn test_unsupported_extension_fails_before_any_io() {
    let source = MockFileSource::new().with_file("plate.czi", ome_tiff());
    let client = RecordingClient::new();

    let result = convert_omero_file(
        &source,
        &client,
        &omero_file("plate.czi"),
        &ConversionContext::default(),
        &ConversionOptions::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ConvertError::Format(FormatError::UnsupportedFormat { .. }))
    ));
    assert!(source.opened().is_empty());
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_missing_object_is_not_found() {
    let source = MockFileSource::new();
    let client = RecordingClient::new();

    let result = convert_omero_file(
        &source,
        &client,
        &omero_file("s3://bucket/gone.tif"),
        &ConversionContext::default(),
        &ConversionOptions::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ConvertError::Format(FormatError::Io(IoError::NotFound(_))))
    ));
    assert_eq!(source.opened(), vec!["s3://bucket/gone.tif".to_string()]);
}

#[tokio::test]
async fn test_non_tiff_content_is_unsupported() {
    let source = MockFileSource::new().with_file("fake.tif", b"PNG not a tiff at all".to_vec());
    let client = RecordingClient::new();

    let result = convert_omero_file(
        &source,
        &client,
        &omero_file("fake.tif"),
        &ConversionContext::default(),
        &ConversionOptions::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ConvertError::Format(FormatError::UnsupportedFormat { .. }))
    ));
    assert_eq!(client.call_count(), 0);
}

#[tokio::test]
async fn test_plane_shape_mismatch_is_a_normalize_error() {
    // Declared 5x5 but stored 4x2
    let data = TiffBuilder::new()
        .with_description(ome_xml(5, 5, 1, 1, 1))
        .add_page(PageSpec::ramp8(4, 2, 0))
        .build();
    let source = MockFileSource::new().with_file("bad.btf", data);
    let client = RecordingClient::new();

    let result = convert_omero_file(
        &source,
        &client,
        &omero_file("bad.btf"),
        &ConversionContext::default(),
        &ConversionOptions::default(),
    )
    .await;

    assert!(matches!(
        result,
        Err(ConvertError::Normalize(NormalizeError::PlaneShapeMismatch { .. }))
    ));
    assert!(client.representations.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_declared_sizes_fail_before_allocation() {
    // 10^20 declared samples backed by a single 4x2 page
    for name in ["huge.ome.btf", "huge.ome.tif"] {
        let data = TiffBuilder::new()
            .with_description(ome_xml(100_000, 100_000, 100_000, 1, 100_000))
            .add_page(PageSpec::ramp8(4, 2, 0))
            .build();
        let source = MockFileSource::new().with_file(name, data);
        let client = RecordingClient::new();

        let result = convert_omero_file(
            &source,
            &client,
            &omero_file(name),
            &ConversionContext::default(),
            &ConversionOptions::default(),
        )
        .await;

        assert!(
            matches!(result, Err(ConvertError::Format(FormatError::Metadata { .. }))),
            "{}",
            name
        );
        assert!(client.representations.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_submission_failure_aborts_conversion() {
    for fail_on in [FailOn::Instrument, FailOn::Channel, FailOn::Representation] {
        let source = MockFileSource::new().with_file("cells.btf", ome_tiff());
        let client = RecordingClient::failing_on(fail_on);

        let result = convert_omero_file(
            &source,
            &client,
            &omero_file("cells.btf"),
            &ConversionContext::default(),
            &ConversionOptions::default(),
        )
        .await;

        assert!(
            matches!(
                result,
                Err(ConvertError::Submit(SubmitError::Status { status: 500, .. }))
            ),
            "{:?}",
            fail_on
        );
        assert!(client.representations.lock().unwrap().is_empty());
    }
}
