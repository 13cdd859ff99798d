//! End-to-end behavior of the editor view against a shared tree

use anyhow::Result;
use std::cell::Cell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;
use weft_dom::{Dom, DomHandle, DomPosition, DomSelection, ObserveOptions};
use weft_state::{EditorState, Selection, Transaction};
use weft_view::{
    DispatchFn, DomEvent, DomEventHandler, DomObserver, EditorProps, EditorView, UpdateTracker,
    ViewConfig,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn mount_with(state: EditorState, props: EditorProps, dispatch: Option<DispatchFn>) -> Result<(DomHandle, EditorView)> {
    init_tracing();
    let dom = Dom::new_handle();
    let view = EditorView::new(Rc::clone(&dom), state, props, dispatch)?;
    let document = dom.borrow().document();
    dom.borrow_mut().append_child(document, view.dom())?;
    Ok((dom, view))
}

fn mount(content: &str) -> Result<(DomHandle, EditorView)> {
    mount_with(EditorState::from_text(content), EditorProps::default(), None)
}

#[test]
fn test_insert_moves_native_cursor() -> Result<()> {
    let (dom, mut view) = mount("ab")?;
    view.set_state(view.state().with_selection(Selection::cursor(1)));

    let tr = view
        .state()
        .transaction()
        .insert(1, "c")?
        .set_selection(Selection::cursor(2));
    view.dispatch(tr);

    assert_eq!(view.dom_text(), "acb");
    assert_eq!(view.state().selection, Selection::cursor(2));

    let expected = view.doc_view().pos_to_dom(&view.state().doc, 2).unwrap();
    let native = dom.borrow().selection(view.root()).unwrap();
    assert!(native.is_collapsed());
    assert_eq!(native.anchor, expected);
    Ok(())
}

#[test]
fn test_unchanged_state_performs_no_mutations() -> Result<()> {
    let (dom, mut view) = mount("one\ntwo")?;
    view.set_state(view.state().with_selection(Selection::range(1, 5)));

    let mutations = dom.borrow().mutation_count();
    let seq = dom.borrow().seq();
    let reconciles = view.reconcile_count();

    let same = EditorState::new(view.state().doc.clone(), Selection::range(1, 5));
    view.set_state(same);

    assert_eq!(dom.borrow().mutation_count(), mutations);
    assert_eq!(dom.borrow().seq(), seq);
    assert_eq!(view.reconcile_count(), reconciles);
    Ok(())
}

#[test]
fn test_tree_matches_document_after_every_edit() -> Result<()> {
    let (_dom, mut view) = mount("first\nsecond\nthird")?;

    let edits: [(usize, usize, &str); 5] = [
        (5, 5, "\ninserted"),
        (0, 6, ""),
        (3, 10, "X\nY\nZ"),
        (0, 0, "top\n"),
        (4, 8, ""),
    ];
    for (from, to, insert) in edits {
        let tr = view.state().transaction().replace(from, to, insert)?;
        view.dispatch(tr);

        assert_eq!(view.dom_text(), view.state().doc.to_string());
        assert!(!view.doc_view().has_dirty_ranges());
    }

    let everything = view.state().doc.len();
    view.dispatch(view.state().transaction().delete(0, everything)?);
    assert_eq!(view.dom_text(), "");
    assert_eq!(view.doc_view().lines().len(), 1);
    Ok(())
}

#[test]
fn test_reconciliation_is_not_reported_as_input() -> Result<()> {
    let (_dom, mut view) = mount("ab\ncd")?;

    for text in ["x", "\nnew line", "y"] {
        let end = view.state().doc.len();
        let tr = view.state().transaction().insert(end, text)?;
        view.dispatch(tr);
    }

    let outcome = view.poll();
    assert_eq!(outcome.changes, 0);
    assert!(!outcome.text_dispatched);
    assert!(!outcome.selection_dispatched);
    assert_eq!(view.observer().notification_count(), 0);
    Ok(())
}

#[test]
fn test_selection_only_change_skips_document_update() -> Result<()> {
    let (dom, mut view) = mount("hello\nworld")?;
    let mutations = dom.borrow().mutation_count();

    view.set_state(view.state().with_selection(Selection::range(2, 8)));
    view.set_state(view.state().with_selection(Selection::cursor(11)));

    assert_eq!(view.reconcile_count(), 0);
    assert_eq!(dom.borrow().mutation_count(), mutations);

    let native = dom.borrow().selection(view.root()).unwrap();
    let last_line = view.doc_view().lines()[1].text_node();
    assert_eq!(native, DomSelection::collapsed(DomPosition::new(last_line, 5)));
    Ok(())
}

#[test]
fn test_nothing_reported_between_stop_and_start() -> Result<()> {
    let (dom, view) = mount("ab")?;
    let tracker = UpdateTracker::new();
    let mut observer = DomObserver::new(view.content_dom(), ObserveOptions::all(), tracker);

    observer.start(&mut dom.borrow_mut())?;
    observer.stop(&mut dom.borrow_mut());
    let text = view.doc_view().lines()[0].text_node();
    dom.borrow_mut().set_text(text, "changed while stopped")?;
    observer.start(&mut dom.borrow_mut())?;

    assert!(observer.flush(&mut dom.borrow_mut()).is_empty());
    assert_eq!(observer.notification_count(), 0);
    Ok(())
}

#[test]
fn test_focus_twice_keeps_content_focused() -> Result<()> {
    let (dom, mut view) = mount("abc")?;
    assert!(!view.has_focus());

    view.focus();
    view.focus();

    assert!(view.has_focus());
    let document = dom.borrow().document();
    assert_eq!(dom.borrow().active_element(document), Some(view.content_dom()));
    assert_eq!(view.reconcile_count(), 0);
    Ok(())
}

#[test]
fn test_external_typing_is_read_into_state() -> Result<()> {
    let (dom, mut view) = mount("ab")?;
    let root = view.root();
    let text = view.doc_view().lines()[0].text_node();

    {
        let mut tree = dom.borrow_mut();
        tree.insert_text(text, 1, "c")?;
        tree.set_selection(root, DomSelection::collapsed(DomPosition::new(text, 2)))?;
    }
    let mutations = dom.borrow().mutation_count();

    assert!(view.handle_event(&DomEvent::new("input").with_target(text)));

    assert_eq!(view.state().doc.to_string(), "acb");
    assert_eq!(view.state().selection, Selection::cursor(2));
    assert_eq!(view.observer().notification_count(), 1);
    // The tree already shows the new text; only the mirror catches up
    assert_eq!(dom.borrow().mutation_count(), mutations);
    assert_eq!(view.doc_view().lines()[0].text_node(), text);

    let outcome = view.poll();
    assert_eq!(outcome.changes, 0);
    Ok(())
}

#[test]
fn test_external_selection_change_is_dispatched() -> Result<()> {
    let (dom, mut view) = mount("ab\ncd")?;
    let root = view.root();
    let text = view.doc_view().lines()[1].text_node();

    dom.borrow_mut().set_selection(
        root,
        DomSelection::new(DomPosition::new(text, 0), DomPosition::new(text, 2)),
    )?;
    assert!(view.handle_event(&DomEvent::new("selectionchange")));

    assert_eq!(view.state().selection, Selection::range(3, 5));
    assert_eq!(view.reconcile_count(), 0);

    // Echo of the selection just read is not dispatched again
    assert!(!view.poll().selection_dispatched);
    Ok(())
}

#[test]
fn test_foreign_node_forces_full_rebuild() -> Result<()> {
    let (dom, mut view) = mount("ab")?;
    let stray = {
        let mut tree = dom.borrow_mut();
        let stray = tree.create_element("p");
        let text = tree.create_text("pasted");
        tree.append_child(stray, text)?;
        tree.append_child(view.content_dom(), stray)?;
        stray
    };

    let outcome = view.poll();

    assert!(outcome.text_dispatched);
    assert_eq!(view.state().doc.to_string(), "ab\npasted");
    assert_eq!(view.dom_text(), "ab\npasted");
    assert!(!dom.borrow().exists(stray));

    let tree = dom.borrow();
    for child in tree.children(view.content_dom()) {
        assert_eq!(tree.attribute(*child, "class"), Some("CM-line"));
    }
    Ok(())
}

#[test]
fn test_damaged_line_is_repaired_on_poll() -> Result<()> {
    let (dom, mut view) = mount("a\nb\nc")?;
    let line = view.doc_view().lines()[1].dom();
    let untouched = view.doc_view().lines()[0].dom();
    dom.borrow_mut().set_attribute(line, "class", "bogus")?;

    let outcome = view.poll();

    assert!(outcome.resynced);
    assert!(!outcome.text_dispatched);
    assert_eq!(view.reconcile_count(), 1);
    let repaired = view.doc_view().lines()[1].dom();
    assert_eq!(dom.borrow().attribute(repaired, "class"), Some("CM-line"));
    assert_eq!(view.doc_view().lines()[0].dom(), untouched);
    assert!(!view.doc_view().has_dirty_ranges());
    Ok(())
}

#[test]
fn test_foreign_attribute_on_line_is_repaired_on_poll() -> Result<()> {
    let (dom, mut view) = mount("ab\ncd")?;
    let line = view.doc_view().lines()[0].dom();
    let other = view.doc_view().lines()[1].dom();
    dom.borrow_mut().set_attribute(line, "style", "color:red")?;

    let outcome = view.poll();

    assert_eq!(outcome.changes, 1);
    assert!(outcome.resynced);
    assert!(!outcome.text_dispatched);
    assert!(!dom.borrow().exists(line));
    let repaired = view.doc_view().lines()[0].dom();
    assert_eq!(dom.borrow().attribute(repaired, "style"), None);
    assert_eq!(dom.borrow().attribute(repaired, "class"), Some("CM-line"));
    assert_eq!(view.doc_view().lines()[1].dom(), other);
    assert!(!view.doc_view().has_dirty_ranges());
    assert_eq!(view.dom_text(), "ab\ncd");
    Ok(())
}

#[test]
fn test_rewritten_text_with_same_content_is_rebuilt_on_poll() -> Result<()> {
    let (dom, mut view) = mount("ab\ncd")?;
    let text = view.doc_view().lines()[1].text_node();
    dom.borrow_mut().set_text(text, "cd")?;

    let outcome = view.poll();

    assert_eq!(outcome.changes, 1);
    assert!(outcome.resynced);
    assert!(!outcome.text_dispatched);
    assert!(!dom.borrow().exists(text));
    assert_eq!(view.state().doc.to_string(), "ab\ncd");
    assert_eq!(view.dom_text(), "ab\ncd");
    assert!(!view.doc_view().has_dirty_ranges());
    Ok(())
}

#[test]
fn test_change_log_is_drained_by_poll() -> Result<()> {
    let (dom, mut view) = mount("")?;

    for round in 0..50 {
        let text = view.doc_view().lines()[0].text_node();
        dom.borrow_mut().insert_text(text, round, "x")?;
        let outcome = view.poll();
        assert_eq!(outcome.changes, 1);
        assert!(outcome.text_dispatched);
        assert!(view.observer().logged_changes().is_empty());
    }

    assert_eq!(view.state().doc.len(), 50);
    assert_eq!(view.observer().notification_count(), 50);
    Ok(())
}

#[test]
fn test_root_inside_shadow_root() -> Result<()> {
    init_tracing();
    let dom = Dom::new_handle();
    let mut view = EditorView::new(Rc::clone(&dom), EditorState::from_text("shadow"), EditorProps::default(), None)?;

    let (document, host, shadow) = {
        let mut tree = dom.borrow_mut();
        let document = tree.document();
        let host = tree.create_element("div");
        tree.append_child(document, host)?;
        let shadow = tree.attach_shadow(host)?;
        tree.append_child(shadow, view.dom())?;
        (document, host, shadow)
    };

    assert_eq!(view.root(), shadow);

    view.focus();
    assert!(view.has_focus());
    assert_eq!(dom.borrow().active_element(document), Some(host));
    assert!(dom.borrow().selection(shadow).is_some());
    assert!(dom.borrow().selection(document).is_none());
    Ok(())
}

#[test]
fn test_props_handler_runs_before_defaults() -> Result<()> {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let swallow_input: DomEventHandler = Rc::new(move |_view: &mut EditorView, _event: &DomEvent| {
        seen.set(seen.get() + 1);
        true
    });
    let decline_keys: DomEventHandler = Rc::new(|_view: &mut EditorView, _event: &DomEvent| false);
    let props = EditorProps::default()
        .on("input", swallow_input)
        .on("keydown", decline_keys);

    let (dom, mut view) = mount_with(EditorState::from_text("ab"), props, None)?;
    let text = view.doc_view().lines()[0].text_node();
    dom.borrow_mut().insert_text(text, 2, "!")?;

    assert!(view.handle_event(&DomEvent::new("input")));
    assert_eq!(calls.get(), 1);
    assert_eq!(view.state().doc.to_string(), "ab");

    assert!(!view.handle_event(&DomEvent::new("keydown")));
    assert!(view.handle_event(&DomEvent::new("focus")));
    assert!(!view.handle_event(&DomEvent::new("paste")));

    // The default path still picks the edit up
    assert!(view.handle_event(&DomEvent::new("selectionchange")));
    assert_eq!(view.state().doc.to_string(), "ab!");
    Ok(())
}

#[test]
fn test_dispatch_override_intercepts_transactions() -> Result<()> {
    let dispatched = Rc::new(Cell::new(0));
    let counter = Rc::clone(&dispatched);
    let dispatch: DispatchFn = Rc::new(move |view: &mut EditorView, tr: Transaction| {
        counter.set(counter.get() + 1);
        let next = view.state().apply(tr);
        view.set_state(next);
    });

    let (_dom, mut view) = mount_with(EditorState::from_text("x"), EditorProps::default(), Some(dispatch))?;
    view.dispatch(view.state().transaction().insert(1, "y")?);
    view.dispatch(view.state().transaction().set_selection(Selection::cursor(0)));

    assert_eq!(dispatched.get(), 2);
    assert_eq!(view.dom_text(), "xy");
    assert_eq!(view.reconcile_count(), 1);
    Ok(())
}

#[test]
fn test_unmounted_view_uses_global_document() -> Result<()> {
    init_tracing();
    let dom = Dom::new_handle();
    let mut view = EditorView::new(Rc::clone(&dom), EditorState::from_text("a"), EditorProps::default(), None)?;
    let document = dom.borrow().document();

    view.dispatch(view.state().transaction().insert(1, "b")?);

    assert_eq!(view.root(), document);
    assert_eq!(view.dom_text(), "ab");
    assert!(!view.has_focus());
    Ok(())
}

#[test]
fn test_invalidate_root_after_remount() -> Result<()> {
    let (dom, view) = mount("a")?;
    let document = view.root();

    let elsewhere = dom.borrow_mut().create_document();
    dom.borrow_mut().append_child(elsewhere, view.dom())?;
    view.invalidate_root();

    assert_ne!(view.root(), document);
    assert_eq!(view.root(), elsewhere);
    Ok(())
}

#[test]
fn test_custom_markup_from_config() -> Result<()> {
    init_tracing();
    let config = ViewConfig::from_json(r#"{ "contentTag": "div", "contentClass": "editor", "lineClass": "row" }"#)?;
    let dom = Dom::new_handle();
    let view = EditorView::with_config(
        Rc::clone(&dom),
        EditorState::from_text("a\nb"),
        EditorProps::default(),
        None,
        config,
    )?;

    let tree = dom.borrow();
    assert_eq!(
        tree.outer_html(view.dom()),
        "<div class=\"CM\"><div class=\"editor\" contenteditable=\"true\">\
         <div class=\"row\">a</div><div class=\"row\">b</div></div></div>"
    );
    Ok(())
}
