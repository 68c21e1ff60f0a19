//! Integration tests for the JSON and binary forms of a document.

use openlabel_core::{
    ElementData, ErrorKind, FrameInterval, Poly2dMode, Stream, StreamType, Transform,
    TransformData, SCHEMA_VERSION,
};
use openlabel_model::binary;
use openlabel_model::{
    CoordinateSystem, Document, DocumentConfig, ElementKind, NewElement, NewRelation, RdfAgent,
    SerializeOptions,
};
use proptest::prelude::*;
use serde_json::json;

fn fi(start: u64, end: u64) -> FrameInterval {
    FrameInterval::new(start, end).unwrap()
}

// ── Helpers ────────────────────────────────────────────────────

fn build_scene() -> Document {
    let mut doc = Document::new();
    doc.set_name("intersection");
    doc.set_annotator("lab");

    doc.add_stream("front", Stream::new(StreamType::Camera, "front.mp4", "front camera"))
        .unwrap();
    doc.add_coordinate_system("odom", CoordinateSystem::new("scene_cs"))
        .unwrap();
    doc.add_coordinate_system(
        "vehicle",
        CoordinateSystem::new("local_cs").with_parent("odom", TransformData::IDENTITY),
    )
    .unwrap();

    let ont = doc.add_ontology("https://example.org/traffic");
    let car = doc
        .add_object(NewElement::new("car1", "Car").with_ontology(ont))
        .unwrap();
    let ped = doc
        .add_object(NewElement::new("ped1", "Pedestrian").with_frame_interval(fi(0, 4)))
        .unwrap();
    let walk = doc
        .add_action(NewElement::new("walk", "Walking").with_frame_interval(fi(1, 3)))
        .unwrap();

    doc.add_object_data(&car, ElementData::text("color", "white"), None)
        .unwrap();
    for f in 0..5u64 {
        let bbox = ElementData::bbox("shape", [f as f64, 20.0, 40.0, 20.0]).unwrap();
        doc.add_object_data(&car, bbox, Some(f)).unwrap();
    }
    doc.add_action_data(&walk, ElementData::num("speed", 1.5).unwrap(), Some(2))
        .unwrap();
    doc.add_relation(
        NewRelation::new("near", "isNear")
            .subject(RdfAgent::object(ped))
            .object(RdfAgent::object(car))
            .with_frame_interval(fi(2, 3)),
    )
    .unwrap();
    doc.add_transform(
        1,
        Transform::new(
            "vehicle",
            "odom",
            TransformData::euler([0.0, 0.0, 0.5], [3.0, 0.0, 0.0]),
        ),
    )
    .unwrap();
    doc
}

// ── JSON ───────────────────────────────────────────────────────

#[test]
fn json_round_trip_is_stable() {
    let doc = build_scene();
    let json = doc.to_json(true).unwrap();
    let loaded = Document::from_json(&json).unwrap();
    assert_eq!(loaded.to_json(true).unwrap(), json);
    assert_eq!(
        loaded.num_elements(ElementKind::Object),
        doc.num_elements(ElementKind::Object)
    );
    assert_eq!(loaded.outer_frame_interval(), Some(fi(0, 4)));
}

#[test]
fn loaded_document_continues_uid_sequence() {
    let doc = build_scene();
    let mut loaded = Document::from_json(&doc.to_json(false).unwrap()).unwrap();
    let next = loaded.add_object(NewElement::new("bus", "Bus")).unwrap();
    assert_eq!(next.to_string(), "2");
    assert_eq!(loaded.set_use_uuid(true).unwrap_err().kind(), ErrorKind::ModeAlreadyFixed);
}

#[test]
fn uuid_document_round_trip() {
    let mut doc = Document::with_config(DocumentConfig {
        use_uuid: true,
        ..DocumentConfig::default()
    });
    let car = doc.add_object(NewElement::new("car", "Car")).unwrap();
    doc.add_object_data(&car, ElementData::num("speed", 2.0).unwrap(), Some(7))
        .unwrap();

    let loaded = Document::from_json(&doc.to_json(false).unwrap()).unwrap();
    assert!(loaded.uses_uuid());
    assert!(loaded.frame(7).unwrap().objects.contains_key(&car));
}

#[test]
fn unknown_top_level_key_rejected() {
    let text = json!({"openlabel": {
        "metadata": {"schema_version": SCHEMA_VERSION},
        "scenes": {}
    }})
    .to_string();
    let err = Document::from_json(&text).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SchemaViolation);
}

#[test]
fn legacy_root_is_migrated() {
    let text = json!({"vcd": {
        "version": "4.3.0",
        "metadata": {"vcd_version": "4.3.0", "annotator": "lab"},
        "objects": {"0": {"name": "car", "type": "Car",
            "frame_intervals": [{"frame_start": 2, "frame_end": 2}]}},
        "frames": {"2": {"objects": {"0": {}}}}
    }})
    .to_string();
    let doc = Document::from_json(&text).unwrap();
    assert_eq!(doc.metadata().schema_version, SCHEMA_VERSION);
    assert_eq!(doc.metadata().annotator.as_deref(), Some("lab"));

    let value = doc.to_value().unwrap();
    assert!(value.get("vcd").is_none());
    assert!(value["openlabel"]["metadata"].get("vcd_version").is_none());
    assert_eq!(value["openlabel"]["frame_intervals"], json!([{"frame_start": 2, "frame_end": 2}]));
}

#[test]
fn save_options_validate_output() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    let doc = build_scene();
    doc.save(
        &path,
        SerializeOptions {
            pretty: true,
            validate: true,
        },
    )
    .unwrap();
    let loaded = Document::load(&path).unwrap();
    assert_eq!(loaded.to_json(false).unwrap(), doc.to_json(false).unwrap());
}

#[test]
fn frame_view_merges_static_content() {
    let doc = build_scene();
    let dynamic = doc.frame_value(2, true).unwrap().unwrap();
    assert!(dynamic["objects"]["0"]["object_data"].get("text").is_none());

    let merged = doc.frame_value(2, false).unwrap().unwrap();
    assert_eq!(merged["objects"]["0"]["object_data"]["text"][0]["val"], "white");
    assert_eq!(merged["objects"]["0"]["name"], "car1");
    assert!(merged["relations"].get("0").is_some());
    assert!(doc.frame_value(40, false).unwrap().is_none());
}

// ── Binary ─────────────────────────────────────────────────────

#[test]
fn binary_round_trip_of_scene() {
    let doc = build_scene();
    let bytes = doc.to_binary().unwrap();
    assert!(bytes.starts_with(binary::MAGIC));

    let back = Document::from_binary(&bytes).unwrap();
    assert_eq!(back.to_json(false).unwrap(), doc.to_json(false).unwrap());
}

#[test]
fn binary_drops_empty_text_but_keeps_content() {
    let mut doc = Document::new();
    let car = doc.add_object(NewElement::new("car", "Car")).unwrap();
    doc.add_object_data(&car, ElementData::text("plate", ""), Some(0))
        .unwrap();
    doc.add_object_data(&car, ElementData::text("make", "x"), Some(0))
        .unwrap();

    let tree = binary::decode(&doc.to_binary().unwrap()).unwrap();
    let texts = tree["openlabel"]["frames"]["0"]["objects"]["0"]["object_data"]["text"]
        .as_array()
        .unwrap()
        .clone();
    let by_name = |name: &str| texts.iter().find(|t| t["name"] == name).cloned().unwrap();
    assert!(by_name("plate").get("val").is_none());
    assert_eq!(by_name("make")["val"], "x");
}

#[test]
fn binary_keeps_empty_and_chain_coded_polys() {
    let mut doc = Document::new();
    let lane = doc.add_object(NewElement::new("lane", "Lane")).unwrap();
    doc.add_object_data(&lane, ElementData::poly3d("edge", vec![], true).unwrap(), None)
        .unwrap();
    doc.add_object_data(&lane, ElementData::poly2d("mask", vec![], false).unwrap(), Some(1))
        .unwrap();
    let outline = vec![0.0, 0.0, 0.0, 25.0, 25.0, 25.0];
    let contour =
        ElementData::poly2d_with_mode("contour", outline.clone(), Poly2dMode::Rs6fcc, true).unwrap();
    doc.add_object_data(&lane, contour, Some(1)).unwrap();

    let back = Document::from_binary(&doc.to_binary().unwrap()).unwrap();
    assert_eq!(back.to_json(false).unwrap(), doc.to_json(false).unwrap());

    let frame_data = back
        .element_data(ElementKind::Object, &lane, "contour", Some(1))
        .unwrap();
    assert_eq!(frame_data.poly2d_points().unwrap(), outline);
}

#[test]
fn binary_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.olb");
    let doc = build_scene();
    doc.save_binary(&path).unwrap();
    let loaded = Document::load_binary(&path).unwrap();
    assert_eq!(loaded.to_json(false).unwrap(), doc.to_json(false).unwrap());
}

#[test]
fn truncated_binary_is_a_parse_error() {
    let bytes = build_scene().to_binary().unwrap();
    let err = Document::from_binary(&bytes[..bytes.len() / 2]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ParseError);
}

// ── Round-trip property ────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn documents_built_by_add_calls_round_trip(
        boxes in prop::collection::vec((0usize..3, 0u64..30, 0u16..1000), 0..40),
        statics in prop::collection::vec((0usize..3, "[a-z]{0,6}"), 0..6),
    ) {
        let mut doc = Document::new();
        let uids: Vec<_> = (0..3)
            .map(|i| doc.add_object(NewElement::new(format!("obj{i}"), "Car")).unwrap())
            .collect();
        for (i, frame, x) in &boxes {
            let bbox = ElementData::bbox("box", [f64::from(*x), 1.0, 2.0, 3.0]).unwrap();
            doc.add_object_data(&uids[*i], bbox, Some(*frame)).unwrap();
        }
        for (i, label) in &statics {
            doc.add_object_data(&uids[*i], ElementData::text("label", label.clone()), None)
                .unwrap();
        }

        let json = doc.to_json(false).unwrap();
        let loaded = Document::from_json(&json).unwrap();
        prop_assert_eq!(loaded.to_json(false).unwrap(), json);
        for uid in &uids {
            prop_assert_eq!(
                loaded.rebuild_data_pointers(ElementKind::Object, uid),
                doc.rebuild_data_pointers(ElementKind::Object, uid)
            );
        }
    }
}
