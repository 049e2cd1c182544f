use psd::{ColorMode, Document, PsdDepth};

#[test]
fn new_builds_a_blank_layerless_canvas() {
    let doc = Document::new(4, 3, ColorMode::Rgb, PsdDepth::Eight).unwrap();

    assert_eq!(doc.psd().width(), 4);
    assert_eq!(doc.psd().height(), 3);
    assert_eq!(doc.psd().color_mode(), ColorMode::Rgb);
    assert_eq!(doc.psd().depth(), PsdDepth::Eight);
    assert_eq!(doc.psd().layers().len(), 0);
    assert_eq!(doc.psd().image_data().channels().len(), 3);
    assert!(!doc.is_updated());
}

#[test]
fn new_rejects_an_out_of_range_size() {
    assert!(Document::new(0, 10, ColorMode::Rgb, PsdDepth::Eight).is_err());
}

#[test]
fn a_new_document_round_trips_through_save_and_open() {
    let doc = Document::new(2, 2, ColorMode::Grayscale, PsdDepth::Eight).unwrap();
    let bytes = doc.save().unwrap();

    let reopened = Document::open(&bytes).unwrap();
    assert_eq!(reopened.psd().width(), 2);
    assert_eq!(reopened.psd().height(), 2);
    assert_eq!(reopened.psd().color_mode(), ColorMode::Grayscale);
    assert_eq!(reopened.psd().layers().len(), 0);
}

#[test]
fn from_image_carries_over_pixel_data_with_no_layers() {
    let image = image::RgbaImage::from_fn(2, 1, |x, _y| {
        if x == 0 {
            image::Rgba([255, 0, 0, 255])
        } else {
            image::Rgba([0, 255, 0, 128])
        }
    });

    let doc = Document::from_image(&image).unwrap();
    assert_eq!(doc.psd().width(), 2);
    assert_eq!(doc.psd().height(), 1);
    assert_eq!(doc.psd().layers().len(), 0);
    assert!(doc.is_updated());

    let bytes = doc.save().unwrap();
    let reopened = Document::open(&bytes).unwrap();
    assert_eq!(reopened.psd().width(), 2);
    assert_eq!(reopened.psd().height(), 1);
}
