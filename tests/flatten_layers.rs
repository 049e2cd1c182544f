mod common;

use common::{build_psd, LayerSpec};
use psd::PsdVersion;

#[test]
fn flattens_opaque_top_layer_over_bottom_layer() {
    let bytes = build_psd(
        1,
        1,
        PsdVersion::One,
        &[
            LayerSpec::new("Background", [255, 0, 0, 255]),
            LayerSpec::new("Foreground", [0, 0, 255, 255]),
        ],
    );
    let psd = psd::Psd::from_bytes(&bytes).unwrap();

    let flattened = psd.flatten_layers_rgba(&|_| true);
    assert_eq!(&flattened[0..4], &[0, 0, 255, 255]);
}

#[test]
fn a_transparent_top_layer_reveals_the_layer_below() {
    let bytes = build_psd(
        1,
        1,
        PsdVersion::One,
        &[
            LayerSpec::new("Background", [255, 0, 0, 255]),
            LayerSpec::new("Foreground", [0, 0, 255, 0]),
        ],
    );
    let psd = psd::Psd::from_bytes(&bytes).unwrap();

    let flattened = psd.flatten_layers_rgba(&|_| true);
    assert_eq!(&flattened[0..4], &[255, 0, 0, 255]);
}

#[test]
fn a_filter_that_matches_no_layers_yields_a_transparent_image() {
    let bytes = build_psd(1, 1, PsdVersion::One, &[LayerSpec::new("Background", [255, 0, 0, 255])]);
    let psd = psd::Psd::from_bytes(&bytes).unwrap();

    let flattened = psd.flatten_layers_rgba(&|_| false);
    assert_eq!(&flattened[0..4], &[0, 0, 0, 0]);
}

#[test]
fn filter_restricts_which_layers_are_composited() {
    let bytes = build_psd(
        1,
        1,
        PsdVersion::One,
        &[
            LayerSpec::new("Background", [255, 0, 0, 255]),
            LayerSpec::new("Foreground", [0, 0, 255, 255]),
        ],
    );
    let psd = psd::Psd::from_bytes(&bytes).unwrap();

    let flattened = psd.flatten_layers_rgba(&|layer| layer.name() == "Background");
    assert_eq!(&flattened[0..4], &[255, 0, 0, 255]);
}
