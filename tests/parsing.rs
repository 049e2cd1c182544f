mod common;

use common::{build_psd, LayerSpec};
use psd::{ColorMode, PsdDepth, PsdVersion};

#[test]
fn parses_header_fields() {
    let bytes = build_psd(4, 2, PsdVersion::One, &[LayerSpec::new("bg", [255, 0, 0, 255])]);
    let psd = psd::Psd::from_bytes(&bytes).unwrap();

    assert_eq!(psd.width(), 4);
    assert_eq!(psd.height(), 2);
    assert_eq!(psd.version(), PsdVersion::One);
    assert_eq!(psd.depth(), PsdDepth::Eight);
    assert_eq!(psd.color_mode(), ColorMode::Rgb);
    assert_eq!(psd.channel_count(), 4);
    assert_eq!(psd.viewbox(), (0, 0, 4, 2));
}

#[test]
fn parses_multiple_layers_bottom_to_top() {
    let bytes = build_psd(
        2,
        2,
        PsdVersion::One,
        &[
            LayerSpec::new("Background", [255, 0, 0, 255]),
            LayerSpec::new("Foreground", [0, 0, 255, 255]),
        ],
    );
    let psd = psd::Psd::from_bytes(&bytes).unwrap();

    assert_eq!(psd.layers().len(), 2);
    assert_eq!(psd.layers()[0].name(), "Background");
    assert_eq!(psd.layers()[1].name(), "Foreground");

    assert_eq!(psd.layer_by_name("Foreground").unwrap().opacity(), 255);
    assert!(psd.layer_by_idx(1).unwrap().visible());
    assert!(psd.layer_by_idx(99).is_none());
    assert!(psd.layer_by_name("nonexistent").is_none());
}

#[test]
fn root_children_list_every_top_level_layer() {
    let bytes = build_psd(
        1,
        1,
        PsdVersion::One,
        &[
            LayerSpec::new("a", [1, 2, 3, 255]),
            LayerSpec::new("b", [4, 5, 6, 255]),
            LayerSpec::new("c", [7, 8, 9, 255]),
        ],
    );
    let psd = psd::Psd::from_bytes(&bytes).unwrap();

    assert_eq!(psd.root_children().len(), 3);
    assert_eq!(psd.groups().len(), 0);
}

#[test]
fn layer_rgba_matches_the_solid_color_it_was_built_with() {
    let bytes = build_psd(2, 2, PsdVersion::One, &[LayerSpec::new("solid", [10, 20, 30, 255])]);
    let psd = psd::Psd::from_bytes(&bytes).unwrap();

    let layer = psd.layer_by_name("solid").unwrap();
    let rgba = layer.rgba();
    assert_eq!(rgba.len(), 2 * 2 * 4);
    for pixel in rgba.chunks(4) {
        assert_eq!(pixel, &[10, 20, 30, 255]);
    }

    let image = layer.to_image();
    assert_eq!(image.dimensions(), (2, 2));
}

#[test]
fn round_trips_a_multi_layer_document_through_to_bytes() {
    let bytes = build_psd(
        3,
        3,
        PsdVersion::One,
        &[
            LayerSpec::new("one", [1, 1, 1, 255]),
            LayerSpec::new("two", [2, 2, 2, 255]),
        ],
    );
    let psd = psd::Psd::from_bytes(&bytes).unwrap();
    let reencoded = psd.to_bytes().unwrap();
    let reparsed = psd::Psd::from_bytes(&reencoded).unwrap();

    assert_eq!(reparsed.layers().len(), 2);
    assert_eq!(reparsed.layer_by_name("one").unwrap().rgba(), psd.layer_by_name("one").unwrap().rgba());
    assert_eq!(reparsed.layer_by_name("two").unwrap().rgba(), psd.layer_by_name("two").unwrap().rgba());
}

#[test]
fn parses_a_psb_document_with_big_lengths() {
    let bytes = build_psd(2, 2, PsdVersion::Two, &[LayerSpec::new("only", [9, 9, 9, 255])]);
    let psd = psd::Psd::from_bytes(&bytes).unwrap();

    assert_eq!(psd.version(), PsdVersion::Two);
    assert_eq!(psd.layers().len(), 1);
    assert_eq!(psd.layer_by_name("only").unwrap().rgba()[0..4], [9, 9, 9, 255]);

    let reencoded = psd.to_bytes().unwrap();
    let reparsed = psd::Psd::from_bytes(&reencoded).unwrap();
    assert_eq!(reparsed.version(), PsdVersion::Two);
    assert_eq!(reparsed.layers().len(), 1);
}
