use rustc_hash::FxHashSet;
use serde_json::json;

use super::*;
use crate::config::LayoutConfig;
use crate::factory::LiveInstances;
use crate::graph::{BiState, Component, Container, Graph, Layout, OutputRef, Widget};

fn graph() -> Graph {
    Graph::new(&LayoutConfig::default(), LiveInstances::new())
}

/// Bi split holding a clock and a seq with two widgets; the playlist's
/// `song` input is bound to the player's `playing` output.
fn sample(graph: &mut Graph) -> (ComponentId, ComponentId, ComponentId) {
    let root = graph.insert(Component::container(Container::bi(BiState {
        position: 0.3,
        orientation: Orientation::Vertical,
        ..Default::default()
    })));
    let seq = graph.insert(Component::container(Container::seq(Orientation::Horizontal)));

    let mut clock = Widget::new("Clock");
    clock.fields.insert("format".into(), json!("HH:mm"));
    let clock = graph.insert(Component::widget(clock));

    let player = graph.insert(Component::widget(Widget::new("Player")));
    let mut playlist = Widget::new("Playlist");
    playlist
        .inputs
        .insert("song".into(), crate::graph::Input::new("Song"));
    let playlist = graph.insert(Component::widget(playlist));
    graph.bind(playlist, "song", OutputRef::new(player, "playing"));

    graph.add_child(root, Some(1), Some(clock));
    graph.add_child(root, Some(2), Some(seq));
    graph.add_child(seq, Some(0), Some(player));
    graph.add_child(seq, Some(3), Some(playlist));
    graph.set_locked(seq, true);
    (root, player, playlist)
}

#[test]
fn test_roundtrip_through_json_and_graph() {
    let mut first = graph();
    let (root, _, _) = sample(&mut first);
    let record = to_record(&first, root).unwrap();

    let json = to_json(&record).unwrap();
    let parsed = from_json(&json).unwrap();
    assert_eq!(parsed, record);

    let mut second = graph();
    let rebuilt = to_domain(&mut second, &parsed).unwrap().unwrap();
    assert_eq!(to_record(&second, rebuilt).unwrap(), record);
    assert_eq!(second.len(), first.len());
}

#[test]
fn test_json_shape() {
    let mut graph = graph();
    let (root, _, playlist) = sample(&mut graph);
    let value = serde_json::to_value(to_record(&graph, root).unwrap()).unwrap();

    assert_eq!(value["type"], "Bi");
    assert_eq!(value["orientation"], "VERTICAL");
    assert_eq!(value["loading"], "AUTOMATIC");
    assert_eq!(value["children"]["1"]["type"], "Widget");
    assert_eq!(value["children"]["1"]["factoryId"], "Clock");
    assert_eq!(value["children"]["1"]["settings"]["format"], "HH:mm");
    assert_eq!(value["children"]["2"]["locked"], true);

    let seq_children = &value["children"]["2"]["children"];
    assert_eq!(seq_children["3"]["id"], playlist.to_string());
    assert!(
        seq_children["3"]["properties"]["io:song"]
            .as_str()
            .unwrap()
            .starts_with("playing,")
    );
}

#[test]
fn test_bindings_restored_from_io_property() {
    let mut first = graph();
    let (root, player, playlist) = sample(&mut first);
    let record = to_record(&first, root).unwrap();

    let mut second = graph();
    to_domain(&mut second, &record).unwrap();
    let widget = second.widget(playlist).unwrap();
    assert_eq!(
        widget.inputs["song"].bindings,
        vec![OutputRef::new(player, "playing")]
    );
    // Bindings live on the input, not in the property bag
    assert!(second.get(playlist).unwrap().properties.is_empty());
}

#[test]
fn test_dedup_yields_disjoint_ids_and_follows_references() {
    let mut graph = graph();
    let (root, player, _) = sample(&mut graph);
    let original = to_record(&graph, root).unwrap();

    let mut copy = original.clone();
    let map = deduplicate_ids(&mut copy);

    let before: FxHashSet<_> = original.ids().into_iter().collect();
    let after: FxHashSet<_> = copy.ids().into_iter().collect();
    assert_eq!(before.len(), after.len());
    assert!(before.is_disjoint(&after));

    let json = serde_json::to_value(&copy).unwrap();
    let binding = json["children"]["2"]["children"]["3"]["properties"]["io:song"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(binding, format!("playing,{}", map[&player]));

    // The copy can live next to the original.
    assert!(to_domain(&mut graph, &copy).unwrap().is_some());
}

#[test]
fn test_duplicate_ids_rejected_before_insert() {
    let mut graph = graph();
    let (root, _, _) = sample(&mut graph);
    let record = to_record(&graph, root).unwrap();
    let count = graph.len();

    assert!(matches!(
        to_domain(&mut graph, &record),
        Err(RecordError::DuplicateId(_))
    ));
    assert_eq!(graph.len(), count);
}

#[test]
fn test_invalid_index_rejected() {
    let json = r#"{
        "type": "Uni",
        "id": "0b3c5f5e-8b4c-4b8e-9a4a-2f1d2c3b4a51",
        "children": { "2": { "type": "None" } }
    }"#;
    let record = from_json(json).unwrap();
    assert!(matches!(
        to_domain(&mut graph(), &record),
        Err(RecordError::InvalidIndex { layout: "Uni", index: 2 })
    ));
}

#[test]
fn test_none_record() {
    let record = from_json(r#"{"type":"None"}"#).unwrap();
    assert_eq!(record, ComponentRecord::None);
    assert_eq!(to_domain(&mut graph(), &record).unwrap(), None);
}

#[test]
fn test_switch_negative_indexes_parse() {
    let json = r#"{
        "type": "Switch",
        "id": "7d0c3b55-2b0c-4c5b-8a1e-0f5e9a6b1c11",
        "zoom": 0.5,
        "children": {
            "-1": { "type": "Widget", "id": "3e6a2c0a-9f1b-4c2d-8e3f-4a5b6c7d8e9f", "factoryId": "Clock" }
        }
    }"#;
    let record = from_json(json).unwrap();
    let mut graph = graph();
    let id = to_domain(&mut graph, &record).unwrap().unwrap();
    let container = graph.container(id).unwrap();
    assert!(container.child(-1).is_some());
    assert!(matches!(&container.layout, Layout::Switch(s) if s.zoom == 0.5 && s.snap));
}

#[test]
fn test_launcher_is_always_deduplicated() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("launchers/clock.json");

    let mut graph = graph();
    let (root, _, _) = sample(&mut graph);
    let record = to_record(&graph, root).unwrap();
    write_layout(&path, &record).unwrap();

    assert_eq!(read_layout(&path).unwrap(), record);
    let first = load_launcher(&path).unwrap();
    let second = load_launcher(&path).unwrap();
    assert_ne!(first.id(), record.id());
    assert_ne!(first.id(), second.id());
}
