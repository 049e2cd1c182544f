mod common;

use common::{build_psd, LayerSpec};
use psd::{Document, MutationTarget, PsdVersion};

fn two_layer_bytes() -> Vec<u8> {
    build_psd(
        1,
        1,
        PsdVersion::One,
        &[
            LayerSpec::new("Background", [255, 0, 0, 255]),
            LayerSpec::new("Foreground", [0, 0, 255, 255]),
        ],
    )
}

#[test]
fn opening_a_document_starts_out_clean() {
    let doc = Document::open(&two_layer_bytes()).unwrap();
    assert!(!doc.is_updated());
}

#[test]
fn appending_a_new_layer_marks_the_document_dirty() {
    let mut doc = Document::open(&two_layer_bytes()).unwrap();

    let node = doc.new_empty_layer("a new layer");
    assert!(doc.is_updated());

    doc.append(MutationTarget::Root, node).unwrap();
    assert_eq!(doc.psd().root_children().len(), 3);
    assert!(doc.psd().layer_by_name("a new layer").is_some());
}

#[test]
fn move_up_and_move_down_reorder_the_root_children() {
    let mut doc = Document::open(&two_layer_bytes()).unwrap();
    let before = doc.psd().root_children().to_vec();

    assert!(doc.move_up(MutationTarget::Root, 1));
    let after = doc.psd().root_children().to_vec();
    assert_eq!(after[0], before[1]);
    assert_eq!(after[1], before[0]);

    assert!(doc.move_down(MutationTarget::Root, 0));
    assert_eq!(doc.psd().root_children(), before.as_slice());

    // Already at the bottom: no-op.
    assert!(!doc.move_down(MutationTarget::Root, 1));
    // Already at the top: no-op.
    assert!(!doc.move_up(MutationTarget::Root, 0));
}

#[test]
fn remove_and_pop_shrink_the_root_children_list() {
    let mut doc = Document::open(&two_layer_bytes()).unwrap();

    let remaining_before = doc.psd().root_children()[1];
    let removed = doc.remove(MutationTarget::Root, 0).unwrap();
    assert_eq!(doc.psd().root_children().len(), 1);
    assert_eq!(doc.psd().root_children()[0], remaining_before);
    assert_ne!(removed, remaining_before);

    let popped = doc.pop(MutationTarget::Root).unwrap();
    assert_eq!(popped, remaining_before);
    assert_eq!(doc.psd().root_children().len(), 0);
    assert!(doc.pop(MutationTarget::Root).is_none());
}

#[test]
fn clear_empties_the_root_children_list() {
    let mut doc = Document::open(&two_layer_bytes()).unwrap();
    doc.clear(MutationTarget::Root).unwrap();
    assert_eq!(doc.psd().root_children().len(), 0);
    assert!(doc.is_updated());
}

#[test]
fn mutating_a_nonexistent_group_is_an_error() {
    let mut doc = Document::open(&two_layer_bytes()).unwrap();
    let node = doc.new_empty_layer("orphan");
    assert!(doc.append(MutationTarget::Group(9999), node).is_err());
}

#[test]
fn saving_a_mutated_document_round_trips() {
    let mut doc = Document::open(&two_layer_bytes()).unwrap();
    doc.pop(MutationTarget::Root);

    let bytes = doc.save().unwrap();
    let reparsed = Document::open(&bytes).unwrap();
    assert_eq!(reparsed.psd().layers().len(), 1);
    assert_eq!(reparsed.psd().layer_by_name("Background").unwrap().name(), "Background");
}
