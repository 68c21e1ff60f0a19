//! Integration tests for frame intervals as the document maintains them.
//!
//! Element intervals come from openlabel-core's interval algebra; the
//! document unions them into its global set and its frame map.

use openlabel_core::{FrameInterval, FrameIntervals, Uid};
use openlabel_model::{Document, ElementKind, NewElement};
use proptest::prelude::*;

fn fi(start: u64, end: u64) -> FrameInterval {
    FrameInterval::new(start, end).unwrap()
}

fn car(uid: u64, start: u64, end: u64) -> NewElement {
    NewElement::new("car", "Car")
        .with_uid(uid)
        .with_frame_interval(fi(start, end))
}

// ── Upsert merging ─────────────────────────────────────────────

#[test]
fn touching_intervals_merge_without_gap() {
    let mut doc = Document::new();
    let uid = doc.add_object(car(0, 0, 4)).unwrap();
    doc.add_object(car(0, 5, 9)).unwrap();

    let intervals = doc.element_frame_intervals(ElementKind::Object, &uid).unwrap();
    assert_eq!(intervals.as_slice(), &[fi(0, 9)]);
    assert_eq!(doc.frame_intervals().as_slice(), &[fi(0, 9)]);
}

#[test]
fn separated_intervals_keep_gap() {
    let mut doc = Document::new();
    let uid = doc.add_object(car(0, 0, 2)).unwrap();
    doc.add_object(car(0, 6, 8)).unwrap();

    let intervals = doc.element_frame_intervals(ElementKind::Object, &uid).unwrap();
    assert_eq!(intervals.as_slice(), &[fi(0, 2), fi(6, 8)]);
    assert!(doc.frame(4).is_none());
    assert!(doc.frame(7).unwrap().objects.contains_key(&uid));
}

// ── Global intervals ───────────────────────────────────────────

#[test]
fn global_intervals_cover_every_kind() {
    let mut doc = Document::new();
    doc.add_object(NewElement::new("car", "Car").with_frame_interval(fi(10, 12)))
        .unwrap();
    doc.add_action(NewElement::new("turn", "Turning").with_frame_interval(fi(2, 3)))
        .unwrap();
    doc.add_event(NewElement::new("brake", "Braking").with_frame_interval(fi(13, 13)))
        .unwrap();

    assert_eq!(doc.frame_intervals().as_slice(), &[fi(2, 3), fi(10, 13)]);
    assert_eq!(doc.outer_frame_interval(), Some(fi(2, 13)));
}

#[test]
fn static_document_has_no_outer_interval() {
    let mut doc = Document::new();
    doc.add_context(NewElement::new("weather", "Weather")).unwrap();
    assert!(doc.frame_intervals().is_empty());
    assert_eq!(doc.outer_frame_interval(), None);
    assert!(doc.frames().is_empty());
}

proptest! {
    #[test]
    fn element_outer_matches_min_and_max(
        pairs in prop::collection::vec((0u64..500, 0u64..20), 1..12)
    ) {
        let mut doc = Document::new();
        let mut uid = None;
        for (start, len) in &pairs {
            let spec = NewElement::new("car", "Car")
                .with_uid(0u64)
                .with_frame_interval(fi(*start, start + len));
            uid = Some(doc.add_object(spec).unwrap());
        }
        let uid: Uid = uid.unwrap();

        let min = pairs.iter().map(|(s, _)| *s).min().unwrap();
        let max = pairs.iter().map(|(s, l)| s + l).max().unwrap();
        let intervals = doc.element_frame_intervals(ElementKind::Object, &uid).unwrap();
        prop_assert_eq!(intervals.outer(), Some(fi(min, max)));
        prop_assert_eq!(doc.outer_frame_interval(), Some(fi(min, max)));

        let expected = FrameIntervals::normalize(
            pairs.iter().map(|(s, l)| fi(*s, s + l)),
        );
        prop_assert_eq!(intervals, &expected);
        prop_assert_eq!(doc.frames().len() as u64, expected.frame_count());
    }
}
