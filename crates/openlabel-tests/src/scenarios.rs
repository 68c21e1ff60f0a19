//! Integration tests for annotation workflows built through the add API.

use openlabel_core::{ElementData, ErrorKind, FrameInterval, Uid};
use openlabel_model::{Document, ElementKind, NewElement, NewRelation, RdfAgent, RdfRole};

fn fi(start: u64, end: u64) -> FrameInterval {
    FrameInterval::new(start, end).unwrap()
}

// ── Elements ───────────────────────────────────────────────────

#[test]
fn bbox_at_frame_makes_object_dynamic() {
    let mut doc = Document::new();
    let car = doc.add_object(NewElement::new("Car", "Car")).unwrap();
    assert!(doc.object(&car).unwrap().is_static());

    let bbox = ElementData::bbox("shape", [10.0, 10.0, 4.0, 2.0]).unwrap();
    doc.add_object_data(&car, bbox, Some(5)).unwrap();

    let obj = doc.object(&car).unwrap();
    assert!(!obj.is_static());
    assert_eq!(obj.frame_intervals.as_slice(), &[fi(5, 5)]);
    assert!(doc.outer_frame_interval().unwrap().contains(5));
    assert!(doc.frame(5).unwrap().objects.contains_key(&car));

    let value = doc.to_value().unwrap();
    assert_eq!(
        value["openlabel"]["frames"]["5"]["objects"][car.to_string()]["object_data"]["bbox"][0]["val"],
        serde_json::json!([10, 10, 4, 2])
    );
}

#[test]
fn removing_frame_data_returns_object_to_static() {
    let mut doc = Document::new();
    let car = doc.add_object(NewElement::new("Car", "Car")).unwrap();
    let bbox = ElementData::bbox("box", [10.0, 10.0, 4.0, 2.0]).unwrap();
    doc.add_object_data(&car, bbox, Some(5)).unwrap();

    doc.remove_element_data(ElementKind::Object, &car, "box").unwrap();
    assert!(doc.object(&car).unwrap().is_static());
    assert!(doc.frames().is_empty());

    let value = doc.to_value().unwrap();
    let ol = &value["openlabel"];
    assert!(ol.get("frames").is_none());
    assert!(ol.get("frame_intervals").is_none());
    assert!(ol["objects"][car.to_string()].get("frame_intervals").is_none());
}

#[test]
fn removing_a_frame_span_splits_the_object() {
    let mut doc = Document::new();
    let car = doc.add_object(NewElement::new("Car", "Car")).unwrap();
    for f in 0..=10u64 {
        let bbox = ElementData::bbox("box", [f as f64, 0.0, 4.0, 2.0]).unwrap();
        doc.add_object_data(&car, bbox, Some(f)).unwrap();
    }

    doc.remove_object_by_frame(&car, fi(4, 6)).unwrap();
    assert_eq!(
        doc.object(&car).unwrap().frame_intervals.as_slice(),
        &[fi(0, 3), fi(7, 10)]
    );
    assert!(doc.frame(5).is_none());

    doc.remove_object_by_frame(&car, fi(0, 10)).unwrap();
    assert!(doc.object(&car).unwrap().is_static());
    assert!(doc.frames().is_empty());
    assert!(doc.frame_intervals().is_empty());
}

#[test]
fn upsert_keeps_one_entry_with_union_interval() {
    let mut doc = Document::new();
    let uid = Uid::Sequential(4);
    doc.add_object(
        NewElement::new("ped", "Pedestrian")
            .with_uid(uid)
            .with_frame_interval(fi(0, 5)),
    )
    .unwrap();
    doc.add_object(
        NewElement::new("ped", "Pedestrian")
            .with_uid(uid)
            .with_frame_interval(fi(3, 12)),
    )
    .unwrap();

    assert_eq!(doc.num_elements(ElementKind::Object), 1);
    assert_eq!(doc.object(&uid).unwrap().frame_intervals.as_slice(), &[fi(0, 12)]);
}

#[test]
fn uuid_switch_after_first_add_fails() {
    let mut doc = Document::new();
    doc.add_object(NewElement::new("car", "Car")).unwrap();

    let err = doc.set_use_uuid(true).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModeAlreadyFixed);
    assert!(!doc.uses_uuid());

    let err = doc
        .add_object(NewElement::new("bus", "Bus").with_uid(Uid::new_uuid()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ModeAlreadyFixed);
    assert_eq!(doc.num_elements(ElementKind::Object), 1);
}

#[test]
fn uuid_documents_key_by_uuid() {
    let mut doc = Document::new();
    doc.set_use_uuid(true).unwrap();
    let a = doc.add_object(NewElement::new("a", "Car")).unwrap();
    let b = doc.add_object(NewElement::new("b", "Car")).unwrap();
    assert!(a.is_uuid() && b.is_uuid());
    assert_ne!(a, b);

    let parsed: uuid::Uuid = a.to_string().parse().unwrap();
    assert_eq!(Uid::from(parsed), a);
}

// ── Relations ──────────────────────────────────────────────────

#[test]
fn relation_lists_only_its_own_frames() {
    let mut doc = Document::new();
    let a = doc
        .add_object(NewElement::new("a", "Car").with_frame_interval(fi(0, 10)))
        .unwrap();
    let b = doc
        .add_object(NewElement::new("b", "Car").with_frame_interval(fi(5, 15)))
        .unwrap();
    let rel = doc
        .add_relation(
            NewRelation::new("follows", "isFollowing")
                .subject(RdfAgent::object(a))
                .object(RdfAgent::object(b))
                .with_frame_interval(fi(7, 9)),
        )
        .unwrap();

    for n in 0..=15 {
        let listed = doc.frame(n).unwrap().relations.contains(&rel);
        assert_eq!(listed, (7..=9).contains(&n), "frame {n}");
    }
    assert_eq!(doc.outer_frame_interval(), Some(fi(0, 15)));
}

#[test]
fn static_relation_has_no_frames() {
    let mut doc = Document::new();
    let a = doc.add_object(NewElement::new("a", "Car")).unwrap();
    let b = doc.add_object(NewElement::new("b", "Lane")).unwrap();
    let rel = doc
        .add_relation(
            NewRelation::new("on", "isOn")
                .subject(RdfAgent::object(a))
                .object(RdfAgent::object(b)),
        )
        .unwrap();

    let relation = doc.relation(&rel).unwrap();
    assert!(relation.is_static());
    assert!(doc.frames().is_empty());

    let value = doc.to_value().unwrap();
    let wire = &value["openlabel"]["relations"][rel.to_string()];
    assert_eq!(wire["type"], "isOn");
    assert!(wire.get("frame_intervals").is_none());
}

#[test]
fn relation_to_missing_agent_is_not_created() {
    let mut doc = Document::new();
    let a = doc.add_object(NewElement::new("a", "Car")).unwrap();

    let err = doc
        .add_relation(
            NewRelation::new("near", "isNear")
                .subject(RdfAgent::object(a))
                .object(RdfAgent::object(42u64)),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownElement);
    assert!(doc.relations().is_empty());
}

#[test]
fn agents_can_mix_kinds() {
    let mut doc = Document::new();
    let car = doc.add_object(NewElement::new("car", "Car")).unwrap();
    let turn = doc
        .add_action(NewElement::new("turn", "Turning").with_frame_interval(fi(3, 6)))
        .unwrap();
    let rel = doc
        .add_relation(NewRelation::new("does", "performs").subject(RdfAgent::object(car)))
        .unwrap();
    doc.add_rdf(&rel, RdfRole::Object, RdfAgent::action(turn)).unwrap();

    assert_eq!(doc.relations_of(ElementKind::Action, &turn), vec![rel]);
    assert_eq!(doc.relations_of(ElementKind::Object, &car), vec![rel]);
    assert!(doc.relations_of(ElementKind::Event, &turn).is_empty());
}

// ── Removal ────────────────────────────────────────────────────

#[test]
fn removing_agent_drops_relations_and_empty_frames() {
    let mut doc = Document::new();
    let a = doc
        .add_object(NewElement::new("a", "Car").with_frame_interval(fi(0, 3)))
        .unwrap();
    let b = doc.add_object(NewElement::new("b", "Car")).unwrap();
    let rel = doc
        .add_relation(
            NewRelation::new("near", "isNear")
                .subject(RdfAgent::object(a))
                .object(RdfAgent::object(b)),
        )
        .unwrap();

    let removal = doc.remove_element(ElementKind::Object, &a).unwrap();
    assert_eq!(removal.relations, vec![rel]);
    assert_eq!(removal.frames, vec![0, 1, 2, 3]);
    assert!(doc.relation(&rel).is_none());
    assert!(doc.frames().is_empty());
    assert_eq!(doc.num_elements(ElementKind::Object), 1);
}

// ── Queries ────────────────────────────────────────────────────

#[test]
fn frame_data_wins_over_static() {
    let mut doc = Document::new();
    let car = doc.add_object(NewElement::new("car", "Car")).unwrap();
    doc.add_object_data(&car, ElementData::text("color", "red"), None).unwrap();
    doc.add_object_data(&car, ElementData::text("color", "blue"), Some(2)).unwrap();

    let at = |frame| {
        doc.object_data(&car, "color", frame)
            .map(|d| d.to_value()["val"].clone())
    };
    assert_eq!(at(Some(2)), Some(serde_json::json!("blue")));
    assert_eq!(at(Some(9)), Some(serde_json::json!("red")));
    assert_eq!(at(None), Some(serde_json::json!("red")));
    assert_eq!(doc.objects_with_data_name("color"), vec![car]);
    assert_eq!(doc.object_uid_by_name("car"), Some(car));
}
