use serde_json::json;

use super::*;
use crate::error::ErrorLog;
use crate::factory::FactoryRegistry;
use crate::testing::{EchoType, Journal, echo_factory};

fn graph() -> Graph {
    Graph::new(&LayoutConfig::default(), LiveInstances::new())
}

fn strict_graph() -> Graph {
    Graph::new(
        &LayoutConfig {
            no_empty_container: true,
            locked: false,
        },
        LiveInstances::new(),
    )
}

fn widget(graph: &mut Graph, factory: &str) -> ComponentId {
    graph.insert(Component::widget(Widget::new(factory)))
}

fn seq(graph: &mut Graph) -> ComponentId {
    graph.insert(Component::container(Container::seq(Orientation::Horizontal)))
}

/// Every child is recorded under its parent at exactly one index.
fn assert_index_integrity(graph: &Graph) {
    for id in graph.widgets().into_iter().chain(graph.nodes.keys().copied()) {
        if let Some(parent) = graph.parent_of(id) {
            let container = graph.container(parent).unwrap();
            let slots = container.children().values().filter(|c| **c == id).count();
            assert_eq!(slots, 1, "{id} appears {slots} times in {parent}");
            let index = container.index_of(id).unwrap();
            assert_eq!(container.child(index), Some(id));
        }
    }
    for (parent, component) in &graph.nodes {
        if let Some(container) = component.as_container() {
            for child in container.children().values() {
                assert_eq!(graph.parent_of(*child), Some(*parent));
            }
        }
    }
}

// ============================================================================
// add_child / remove_child
// ============================================================================

#[test]
fn test_add_child_with_no_index_is_noop() {
    let mut graph = graph();
    let container = seq(&mut graph);
    let child = widget(&mut graph, "Clock");

    assert_eq!(graph.add_child(container, None, Some(child)), None);
    assert!(graph.container(container).unwrap().is_empty());
    assert!(graph.drain_events().is_empty());
}

#[test]
#[should_panic(expected = "outside the Bi container domain")]
fn test_add_child_outside_domain_panics() {
    let mut graph = graph();
    let bi = graph.insert(Component::container(Container::bi(BiState::default())));
    let child = widget(&mut graph, "Clock");
    graph.add_child(bi, Some(3), Some(child));
}

#[test]
fn test_add_child_links_and_emits_slot_change() {
    let mut graph = graph();
    let container = seq(&mut graph);
    let child = widget(&mut graph, "Clock");

    graph.add_child(container, Some(2), Some(child));

    assert_eq!(graph.parent_of(child), Some(container));
    assert_eq!(graph.index_in_parent(child), Some(2));
    assert_eq!(
        graph.drain_events(),
        vec![GraphEvent::SlotChanged {
            container,
            index: 2
        }]
    );
}

#[test]
fn test_add_child_moves_between_containers() {
    let mut graph = graph();
    let a = seq(&mut graph);
    let b = seq(&mut graph);
    let child = widget(&mut graph, "Clock");

    graph.add_child(a, Some(0), Some(child));
    graph.add_child(b, Some(5), Some(child));

    assert!(graph.container(a).unwrap().is_empty());
    assert_eq!(graph.container(b).unwrap().index_of(child), Some(5));
    assert_eq!(graph.parent_of(child), Some(b));
    assert_index_integrity(&graph);
}

#[test]
fn test_add_child_relinks_subtree() {
    let mut graph = graph();
    let root = graph.insert(Component::container(Container::uni()));
    let inner = seq(&mut graph);
    let leaf = widget(&mut graph, "Clock");
    graph.add_child(inner, Some(0), Some(leaf));
    graph.add_child(root, Some(1), Some(inner));

    assert_eq!(graph.root_of(leaf), root);
    assert_index_integrity(&graph);
}

#[test]
fn test_displaced_child_is_detached_not_closed() {
    let mut graph = graph();
    let uni = graph.insert(Component::container(Container::uni()));
    let first = widget(&mut graph, "Clock");
    let second = widget(&mut graph, "Player");

    graph.add_child(uni, Some(1), Some(first));
    assert_eq!(graph.add_child(uni, Some(1), Some(second)), Some(first));

    assert!(graph.contains(first));
    assert_eq!(graph.parent_of(first), None);
    assert_eq!(graph.container(uni).unwrap().child(1), Some(second));
}

#[test]
fn test_remove_child_closes_subtree() {
    let journal = Journal::default();
    let mut registry = FactoryRegistry::new();
    registry.register(echo_factory("Clock", 1, &journal));
    let errors = ErrorLog::new();

    let mut graph = graph();
    let root = seq(&mut graph);
    let inner = seq(&mut graph);
    let leaf = widget(&mut graph, "Clock");
    graph.add_child(inner, Some(0), Some(leaf));
    graph.add_child(root, Some(0), Some(inner));
    graph.load_widget(leaf, &registry, &errors);
    assert_eq!(graph.live_instances().count(&FactoryId::new("Clock")), 1);

    assert!(graph.remove_child(root, inner));
    assert!(!graph.remove_child(root, inner));

    assert!(!graph.contains(inner));
    assert!(!graph.contains(leaf));
    assert!(journal.contains("Clock v1 close"));
    assert_eq!(graph.live_instances().count(&FactoryId::new("Clock")), 0);
    let closed: Vec<_> = graph
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, GraphEvent::Closed { .. }))
        .collect();
    assert_eq!(closed.len(), 2);
}

// ============================================================================
// swap_children
// ============================================================================

#[test]
fn test_swap_children_between_containers() {
    let mut graph = graph();
    let a = seq(&mut graph);
    let b = seq(&mut graph);
    let x = widget(&mut graph, "Clock");
    let y = widget(&mut graph, "Player");
    graph.add_child(a, Some(0), Some(x));
    graph.add_child(b, Some(4), Some(y));

    graph.swap_children(a, 0, b, y);

    assert_eq!(graph.container(a).unwrap().child(0), Some(y));
    assert_eq!(graph.container(b).unwrap().child(4), Some(x));
    assert_index_integrity(&graph);
}

#[test]
fn test_swap_into_empty_slot_requests_window_close() {
    let mut graph = strict_graph();
    let window_root = graph.insert(Component::container(Container::uni()));
    graph.attach_root(HostId(7), window_root);
    let a = seq(&mut graph);
    let b = seq(&mut graph);
    graph.add_child(window_root, Some(1), Some(b));
    let y = widget(&mut graph, "Player");
    graph.add_child(b, Some(0), Some(y));
    graph.drain_events();

    // Moving b's only child into an empty slot of a leaves b empty
    graph.swap_children(a, 3, b, y);

    let requests: Vec<_> = graph
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, GraphEvent::WindowCloseRequested { .. }))
        .collect();
    assert_eq!(
        requests,
        vec![GraphEvent::WindowCloseRequested {
            host: Some(HostId(7)),
            root: window_root
        }]
    );
}

#[test]
fn test_swap_between_full_containers_does_not_request_close() {
    let mut graph = strict_graph();
    let a = seq(&mut graph);
    let b = seq(&mut graph);
    let x = widget(&mut graph, "Clock");
    let y = widget(&mut graph, "Player");
    graph.add_child(a, Some(0), Some(x));
    graph.add_child(b, Some(0), Some(y));
    graph.drain_events();

    graph.swap_children(a, 0, b, y);

    assert!(
        !graph
            .drain_events()
            .iter()
            .any(|e| matches!(e, GraphEvent::WindowCloseRequested { .. }))
    );
}

#[test]
fn test_reloading_marker_suppresses_close_request() {
    let mut graph = strict_graph();
    let container = seq(&mut graph);
    let child = widget(&mut graph, "Clock");
    graph.add_child(container, Some(0), Some(child));
    graph.set_property(container, RELOADING_PROPERTY, json!("Clock"));
    graph.drain_events();

    graph.remove_child(container, child);

    assert!(
        !graph
            .drain_events()
            .iter()
            .any(|e| matches!(e, GraphEvent::WindowCloseRequested { .. }))
    );
}

// ============================================================================
// Locks
// ============================================================================

#[test]
fn test_lock_inherits_from_ancestors() {
    let mut graph = graph();
    let root = seq(&mut graph);
    let inner = seq(&mut graph);
    let leaf = widget(&mut graph, "Clock");
    graph.add_child(inner, Some(0), Some(leaf));
    graph.add_child(root, Some(0), Some(inner));
    graph.drain_events();

    graph.set_locked(root, true);
    assert!(graph.is_locked_effective(leaf));
    let flipped = graph
        .drain_events()
        .into_iter()
        .filter(|e| matches!(e, GraphEvent::LockChanged { locked: true, .. }))
        .count();
    assert_eq!(flipped, 3);

    // Moving out of the locked subtree unlocks
    let free = seq(&mut graph);
    graph.add_child(free, Some(0), Some(leaf));
    assert!(!graph.is_locked_effective(leaf));
}

#[test]
fn test_global_lock() {
    let mut graph = graph();
    let root = seq(&mut graph);
    let leaf = widget(&mut graph, "Clock");
    graph.add_child(root, Some(0), Some(leaf));

    graph.set_global_lock(true);
    assert!(graph.is_locked_effective(root));
    assert!(graph.is_locked_effective(leaf));

    graph.set_global_lock(false);
    assert!(!graph.is_locked_effective(leaf));
}

// ============================================================================
// Roots
// ============================================================================

#[test]
fn test_attach_root_replaces_previous() {
    let mut graph = graph();
    let first = seq(&mut graph);
    let second = seq(&mut graph);
    assert_eq!(graph.attach_root(HostId(1), first), None);
    assert_eq!(graph.attach_root(HostId(1), second), Some(first));
    assert_eq!(graph.root_at(HostId(1)), Some(second));
    assert_eq!(graph.host_of(first), None);
}

// ============================================================================
// Loading and data flow
// ============================================================================

#[test]
fn test_load_without_factory_installs_placeholder() {
    let registry = FactoryRegistry::new();
    let errors = ErrorLog::new();
    let mut graph = graph();
    let mut w = Widget::new("Missing");
    w.fields.insert("format".into(), json!("HH:mm"));
    let id = graph.insert(Component::widget(w));

    assert_eq!(graph.load_widget(id, &registry, &errors), LoadOutcome::NoFactory);

    let widget = graph.widget(id).unwrap();
    assert_eq!(widget.status(), &WidgetStatus::NoFactory);
    assert_eq!(widget.settings_snapshot()["format"], json!("HH:mm"));
    assert!(errors.entries()[0].message.contains("Missing"));
}

#[test]
fn test_load_failure_installs_error_controller() {
    let journal = Journal::default();
    let mut registry = FactoryRegistry::new();
    registry.register(crate::factory::WidgetFactory::new(EchoType::failing(
        "Broken", &journal,
    )));
    let errors = ErrorLog::new();
    let mut graph = graph();
    let id = widget(&mut graph, "Broken");

    let outcome = graph.load_widget(id, &registry, &errors);
    assert!(matches!(outcome, LoadOutcome::Failed(ref m) if m.contains("refusing to start")));
    assert!(matches!(graph.widget(id).unwrap().status(), WidgetStatus::Failed(_)));
    assert_eq!(errors.len(), 1);

    // Still movable and closable
    let container = seq(&mut graph);
    graph.add_child(container, Some(0), Some(id));
    assert!(graph.remove_child(container, id));
}

#[test]
fn test_load_declares_ports_and_applies_inputs() {
    let journal = Journal::default();
    let mut registry = FactoryRegistry::new();
    registry.register(echo_factory("Clock", 1, &journal));
    let errors = ErrorLog::new();
    let mut graph = graph();

    let mut w = Widget::new("Clock");
    let mut song = Input::new("");
    song.value = Some(json!("intro"));
    w.inputs.insert("song".into(), song);
    let id = graph.insert(Component::widget(w));

    assert_eq!(graph.load_widget(id, &registry, &errors), LoadOutcome::Loaded);
    assert_eq!(graph.load_widget(id, &registry, &errors), LoadOutcome::AlreadyLoaded);

    let widget = graph.widget(id).unwrap();
    assert_eq!(widget.inputs["song"].type_name, "Song");
    assert!(widget.outputs.contains_key("playing"));
    assert!(journal.contains("Clock v1 input song=\"intro\""));
    assert!(journal.contains("create Clock v1 restoring=false"));
}

#[test]
fn test_publish_output_reaches_bound_inputs() {
    let journal = Journal::default();
    let mut registry = FactoryRegistry::new();
    registry.register(echo_factory("Player", 1, &journal));
    registry.register(echo_factory("Playlist", 1, &journal));
    let errors = ErrorLog::new();
    let mut graph = graph();

    let player = widget(&mut graph, "Player");
    let playlist = widget(&mut graph, "Playlist");
    graph.load_all(&registry, &errors);
    assert!(graph.bind(playlist, "song", OutputRef::new(player, "playing")));

    assert_eq!(graph.publish_output(player, "playing", json!("track 2")), 1);
    assert_eq!(
        graph.widget(playlist).unwrap().inputs["song"].value,
        Some(json!("track 2"))
    );
    assert!(journal.contains("Playlist v1 input song=\"track 2\""));
}

#[test]
fn test_free_form_placement_is_persisted() {
    let mut graph = graph();
    let board = graph.insert(Component::container(Container::free_form()));
    let clock = widget(&mut graph, "Clock");
    let player = widget(&mut graph, "Player");
    graph.add_child(board, Some(1), Some(clock));
    graph.add_child(board, Some(2), Some(player));
    graph.drain_events();

    let placement = FreeFormBox {
        x: 0.25,
        y: 0.5,
        w: 0.2,
        h: 0.1,
    };
    assert!(graph.set_free_form_box(board, 2, placement));
    assert_eq!(
        graph.drain_events(),
        vec![GraphEvent::SlotChanged {
            container: board,
            index: 2
        }]
    );
    assert!(!graph.set_free_form_box(board, 0, placement));
    assert!(!graph.set_free_form_box(clock, 1, placement));

    graph.remove_child(board, clock);
    let json = serde_json::to_value(crate::record::to_record(&graph, board).unwrap()).unwrap();
    assert_eq!(json["boxes"]["2"], json!({ "x": 0.25, "y": 0.5, "w": 0.2, "h": 0.1 }));
    // The cleared slot's box is not written out
    assert!(json["boxes"].get("1").is_none());
}
