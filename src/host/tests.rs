//! Document lifecycle tests
//!
//! Small purpose-built components exercise the host: subtree replacement,
//! deferred renders, detach during in-flight work, subscription and timer
//! ownership across attach/detach cycles.

use super::*;
use crate::component::Tag;
use crate::store::Store;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::LocalSet;

// ─────────────────────────────────────────────────────────────────────────────
// Test components
// ─────────────────────────────────────────────────────────────────────────────

/// Keeps a counter it never hands back to its parent
struct Counter;

impl Component for Counter {
    fn tag(&self) -> &'static str {
        "test-counter"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        let start = this.attr_or("start", 0u64);
        this.set("localCounter", json!(start));
        this.render();
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        let n = scope.get("localCounter").cloned().unwrap_or(json!(0));
        Markup::raw(format!("<span>{}</span>", n))
    }
}

/// Renders a title and one counter child per entry in `counters`
struct Parent;

impl Component for Parent {
    fn tag(&self) -> &'static str {
        "test-parent"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        if this.get("counters").is_none() {
            this.set("counters", json!([0]));
        }
        this.render();
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        let mut m = Markup::raw("<h1>");
        m.push_text(scope.get_str("title").unwrap_or("Parent"))
            .push_raw("</h1>");
        for start in scope.get_as::<Vec<u64>>("counters").unwrap_or_default() {
            m.push(Tag::new("test-counter").attr_json("start", &start).into_markup());
        }
        m
    }
}

/// Waits on a channel, then stores what arrived
struct Loader {
    rx: Rc<RefCell<Option<oneshot::Receiver<String>>>>,
}

impl Component for Loader {
    fn tag(&self) -> &'static str {
        "test-loader"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        this.set("loading", json!(true));
        this.render();

        let Some(rx) = self.rx.borrow_mut().take() else {
            return;
        };
        let task = this.clone();
        this.spawn(async move {
            let Ok(data) = rx.await else {
                return;
            };
            if !task.is_attached() {
                return;
            }
            task.set("loading", json!(false));
            task.set("data", json!(data));
            task.render();
        });
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        if scope.flag("loading") {
            return Markup::raw("<p>Loading</p>");
        }
        Markup::text(scope.get_str("data").unwrap_or_default())
    }
}

/// Mirrors the store's `greeting` key
struct Watcher {
    store: Store,
}

impl Component for Watcher {
    fn tag(&self) -> &'static str {
        "test-watcher"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        if let Some(greeting) = self.store.get("greeting") {
            this.set("greeting", greeting);
        }
        this.subscribe(&self.store, |this, state| {
            if let Some(greeting) = state.get("greeting") {
                this.set("greeting", greeting.clone());
                this.render();
            }
        });
        this.render();
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        Markup::text(scope.get_str("greeting").unwrap_or("-"))
    }
}

/// Ticks a counter on a timer
struct Ticker;

impl Component for Ticker {
    fn tag(&self) -> &'static str {
        "test-ticker"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        this.every(Duration::from_millis(100), |this| {
            let ticks = this.get_as::<u64>("ticks").unwrap_or(0);
            this.set("ticks", json!(ticks + 1));
        });
    }

    fn render(&self, _scope: &Scope<'_>) -> Markup {
        Markup::new()
    }
}

/// A form whose inputs are read back by live query
struct Form;

impl Component for Form {
    fn tag(&self) -> &'static str {
        "test-form"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        this.render();
    }

    fn on_event(&mut self, this: &ComponentHandle, event: &str, _detail: &Value) -> Handled {
        if event != "submit" {
            return Handled::No;
        }
        let title = this.input("title").unwrap_or_default();
        this.set("submitted", json!(title));
        this.render();
        Handled::Yes
    }

    fn render(&self, _scope: &Scope<'_>) -> Markup {
        Tag::void("input")
            .attr_text("name", "title")
            .attr_text("value", "Default")
            .into_markup()
    }
}

fn document(store: &Store) -> (Document, Rc<RefCell<Option<oneshot::Receiver<String>>>>) {
    let slot: Rc<RefCell<Option<oneshot::Receiver<String>>>> = Rc::new(RefCell::new(None));
    let mut registry = Registry::new();
    registry.register("test-counter", || Box::new(Counter)).unwrap();
    registry.register("test-parent", || Box::new(Parent)).unwrap();
    let loader_slot = slot.clone();
    registry
        .register("test-loader", move || {
            Box::new(Loader {
                rx: loader_slot.clone(),
            })
        })
        .unwrap();
    let watcher_store = store.clone();
    registry
        .register("test-watcher", move || {
            Box::new(Watcher {
                store: watcher_store.clone(),
            })
        })
        .unwrap();
    registry.register("test-ticker", || Box::new(Ticker)).unwrap();
    registry.register("test-form", || Box::new(Form)).unwrap();
    (Document::new(registry).unwrap(), slot)
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_registry_rejects_bad_names_and_duplicates() {
    let mut registry = Registry::new();
    assert!(matches!(
        registry.register("counter", || Box::new(Counter)),
        Err(HostError::InvalidTagName(_))
    ));
    assert!(matches!(
        registry.register("Test-Counter", || Box::new(Counter)),
        Err(HostError::InvalidTagName(_))
    ));
    registry.register("test-counter", || Box::new(Counter)).unwrap();
    assert!(matches!(
        registry.register("test-counter", || Box::new(Counter)),
        Err(HostError::DuplicateTag(_))
    ));
    assert_eq!(registry.tags(), vec!["test-counter"]);
}

#[test]
fn test_mount_unknown_tag_fails() {
    let (doc, _) = document(&Store::new());
    assert!(matches!(
        doc.mount("nope-nope", Attributes::new()),
        Err(HostError::UnknownTag(_))
    ));
    assert!(doc.is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendering
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_render_inside_on_attach_runs_once_hook_returns() {
    let (doc, _) = document(&Store::new());
    let parent = doc.mount("test-parent", Attributes::new()).unwrap();

    assert_eq!(parent.render_count(), 1);
    let children = parent.children();
    assert_eq!(children.len(), 1);
    assert!(children[0].is_attached());
    assert_eq!(children[0].render_count(), 1);
}

#[test]
fn test_set_does_not_render() {
    let (doc, _) = document(&Store::new());
    let parent = doc.mount("test-parent", Attributes::new()).unwrap();

    parent.set("title", json!("Changed"));
    assert_eq!(parent.render_count(), 1);
    assert!(!parent.outer_html().unwrap().contains("Changed"));

    parent.render();
    assert!(parent.outer_html().unwrap().contains("<h1>Changed</h1>"));
}

#[test]
fn test_parent_render_replaces_children_and_loses_local_state() {
    let (doc, _) = document(&Store::new());
    let parent = doc.mount("test-parent", Attributes::new()).unwrap();

    let child = parent.children().remove(0);
    child.set("localCounter", json!(5));
    child.render();
    assert!(parent.outer_html().unwrap().contains("<span>5</span>"));

    parent.render();

    // Old instance is gone, its replacement starts over
    assert_eq!(child.phase(), None);
    let fresh = parent.children().remove(0);
    assert_ne!(fresh.id(), child.id());
    assert_eq!(fresh.get("localCounter"), Some(json!(0)));
    assert!(parent.outer_html().unwrap().contains("<span>0</span>"));
}

#[test]
fn test_children_follow_parent_state() {
    let (doc, _) = document(&Store::new());
    let parent = doc.mount("test-parent", Attributes::new()).unwrap();

    parent.set("counters", json!([3, 4, 5]));
    parent.render();

    let starts: Vec<Option<Value>> = parent
        .children()
        .iter()
        .map(|c| c.get("localCounter"))
        .collect();
    assert_eq!(starts, vec![Some(json!(3)), Some(json!(4)), Some(json!(5))]);
    assert_eq!(doc.instances_of("test-counter").len(), 3);
    // Parent + three children; the replaced child was removed
    assert_eq!(doc.len(), 4);
}

#[test]
fn test_outer_html_splices_child_content() {
    let (doc, _) = document(&Store::new());
    let parent = doc
        .mount("test-parent", Attributes::from_raw([("data-page", "home")]))
        .unwrap();
    parent.set("title", json!("A & B"));
    parent.render();

    assert_eq!(
        doc.html(),
        "<test-parent data-page=\"home\"><h1>A &amp; B</h1><test-counter start=\"0\"><span>0</span></test-counter></test-parent>"
    );
}

#[test]
fn test_detached_instance_ignores_writes_and_renders() {
    let (doc, _) = document(&Store::new());
    let parent = doc.mount("test-parent", Attributes::new()).unwrap();
    parent.detach();

    assert!(!parent.set("title", json!("late")));
    parent.render();
    assert_eq!(parent.render_count(), 1);
    assert_eq!(parent.get("title"), None);

    // Children left the document with their parent
    assert!(parent.children().iter().all(|c| !c.is_attached()));
}

#[test]
fn test_reattach_runs_on_attach_again() {
    let (doc, _) = document(&Store::new());
    let parent = doc.mount("test-parent", Attributes::new()).unwrap();
    parent.set("counters", json!([7]));
    parent.render();

    parent.detach();
    parent.attach();

    assert!(parent.is_attached());
    // State survives detach; on_attach rendered again with it
    assert_eq!(parent.render_count(), 3);
    assert_eq!(parent.children()[0].get("localCounter"), Some(json!(7)));
}

#[test]
fn test_unmount_drops_subtree() {
    let (doc, _) = document(&Store::new());
    let parent = doc.mount("test-parent", Attributes::new()).unwrap();
    assert_eq!(doc.len(), 2);

    doc.unmount(parent.id());
    assert!(doc.is_empty());
    assert!(doc.roots().is_empty());
}

// ─────────────────────────────────────────────────────────────────────────────
// Store subscriptions
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_store_change_rerenders_subscriber() {
    let store = Store::new();
    let (doc, _) = document(&store);
    let watcher = doc.mount("test-watcher", Attributes::new()).unwrap();
    assert_eq!(watcher.outer_html().unwrap(), "<test-watcher>-</test-watcher>");

    store.set("greeting", json!("Peace be with you"));
    assert_eq!(
        watcher.outer_html().unwrap(),
        "<test-watcher>Peace be with you</test-watcher>"
    );
}

#[test]
fn test_attach_detach_cycles_do_not_leak_subscriptions() {
    let store = Store::new();
    let (doc, _) = document(&store);
    let watcher = doc.mount("test-watcher", Attributes::new()).unwrap();
    assert_eq!(store.subscriber_count(), 1);

    for _ in 0..3 {
        watcher.detach();
        assert_eq!(store.subscriber_count(), 0);
        watcher.attach();
        assert_eq!(store.subscriber_count(), 1);
    }

    // Changes while detached are picked up from the store on re-attach
    watcher.detach();
    store.set("greeting", json!("while away"));
    assert!(!watcher.outer_html().unwrap().contains("while away"));
    watcher.attach();
    assert!(watcher.outer_html().unwrap().contains("while away"));

    doc.unmount(watcher.id());
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn test_destroyed_children_release_subscriptions() {
    struct Host;
    impl Component for Host {
        fn tag(&self) -> &'static str {
            "test-host"
        }
        fn on_attach(&mut self, this: &ComponentHandle) {
            this.render();
        }
        fn render(&self, _scope: &Scope<'_>) -> Markup {
            Markup::raw("<test-watcher></test-watcher><test-watcher></test-watcher>")
        }
    }

    let store = Store::new();
    let mut registry = Registry::new();
    registry.register("test-host", || Box::new(Host)).unwrap();
    let s = store.clone();
    registry
        .register("test-watcher", move || Box::new(Watcher { store: s.clone() }))
        .unwrap();
    let doc = Document::new(registry).unwrap();

    let host = doc.mount("test-host", Attributes::new()).unwrap();
    assert_eq!(store.subscriber_count(), 2);

    for _ in 0..5 {
        host.render();
    }
    assert_eq!(store.subscriber_count(), 2);
    assert_eq!(doc.len(), 3);
}

// ─────────────────────────────────────────────────────────────────────────────
// Forms
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn test_input_reads_live_value_until_rerender() {
    let (doc, _) = document(&Store::new());
    let form = doc.mount("test-form", Attributes::new()).unwrap();

    assert_eq!(form.input("title").as_deref(), Some("Default"));
    assert!(form.set_input("title", "Typed"));
    assert_eq!(form.input("title").as_deref(), Some("Typed"));

    form.render();
    assert_eq!(form.input("title").as_deref(), Some("Default"));
    assert_eq!(form.input("missing"), None);
}

#[test]
fn test_dispatch_reads_inputs_then_renders() {
    let (doc, _) = document(&Store::new());
    let form = doc.mount("test-form", Attributes::new()).unwrap();
    form.set_input("title", "Typed");

    assert_eq!(form.dispatch("click", Value::Null), Handled::No);
    assert_eq!(form.dispatch("submit", Value::Null), Handled::Yes);
    assert_eq!(form.get("submitted"), Some(json!("Typed")));
    // The render requested inside the hook ran after it and reset the form
    assert_eq!(form.render_count(), 2);
    assert_eq!(form.input("title").as_deref(), Some("Default"));

    form.detach();
    assert_eq!(form.dispatch("submit", Value::Null), Handled::No);
}

// ─────────────────────────────────────────────────────────────────────────────
// Async work & timers
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_resolution_renders_when_attached() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (doc, slot) = document(&Store::new());
            let (tx, rx) = oneshot::channel();
            *slot.borrow_mut() = Some(rx);

            let loader = doc.mount("test-loader", Attributes::new()).unwrap();
            assert_eq!(loader.render_count(), 1);

            tx.send("Sunday 10am".to_string()).unwrap();
            doc.settle().await;

            assert_eq!(loader.render_count(), 2);
            assert_eq!(loader.get("data"), Some(json!("Sunday 10am")));
        })
        .await;
}

#[tokio::test]
async fn test_detach_during_fetch_suppresses_late_update() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (doc, slot) = document(&Store::new());
            let (tx, rx) = oneshot::channel();
            *slot.borrow_mut() = Some(rx);

            let loader = doc.mount("test-loader", Attributes::new()).unwrap();
            let renders_before = loader.render_count();

            loader.detach();
            tx.send("too late".to_string()).unwrap();
            doc.settle().await;

            assert_eq!(loader.render_count(), renders_before);
            assert_eq!(loader.get("data"), None);
            assert_eq!(loader.get("loading"), Some(json!(true)));
        })
        .await;
}

#[tokio::test(start_paused = true)]
async fn test_timer_runs_while_attached_and_stops_on_detach() {
    let local = LocalSet::new();
    local
        .run_until(async {
            let (doc, _) = document(&Store::new());
            let ticker = doc.mount("test-ticker", Attributes::new()).unwrap();

            tokio::time::sleep(Duration::from_millis(350)).await;
            assert_eq!(ticker.get("ticks"), Some(json!(3)));

            ticker.detach();
            tokio::time::sleep(Duration::from_millis(500)).await;
            assert_eq!(ticker.get("ticks"), Some(json!(3)));

            // A fresh timer starts with the next attachment
            ticker.attach();
            tokio::time::sleep(Duration::from_millis(150)).await;
            assert_eq!(ticker.get("ticks"), Some(json!(4)));
        })
        .await;
}

// ─────────────────────────────────────────────────────────────────────────────
// Handles across attachments
// ─────────────────────────────────────────────────────────────────────────────

/// Hands every hook handle it receives to the test
struct Keeper {
    seen: Rc<RefCell<Vec<ComponentHandle>>>,
}

impl Component for Keeper {
    fn tag(&self) -> &'static str {
        "test-keeper"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        self.seen.borrow_mut().push(this.clone());
        this.set("cycle", json!(self.seen.borrow().len()));
        this.render();
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        Markup::text(&scope.get("cycle").map(Value::to_string).unwrap_or_default())
    }
}

/// Writes to its own state from inside `render`
struct SelfWriter {
    this: Rc<RefCell<Option<ComponentHandle>>>,
}

impl Component for SelfWriter {
    fn tag(&self) -> &'static str {
        "test-self-writer"
    }

    fn on_attach(&mut self, this: &ComponentHandle) {
        *self.this.borrow_mut() = Some(this.clone());
        this.render();
    }

    fn render(&self, scope: &Scope<'_>) -> Markup {
        let count = scope.get_as::<u64>("renders").unwrap_or(0) + 1;
        if let Some(this) = self.this.borrow().as_ref() {
            this.set("renders", json!(count));
        }
        Markup::text(&count.to_string())
    }
}

#[test]
fn test_handle_from_previous_attachment_is_inert() {
    let seen: Rc<RefCell<Vec<ComponentHandle>>> = Rc::new(RefCell::new(Vec::new()));
    let mut registry = Registry::new();
    let keeper_seen = seen.clone();
    registry
        .register("test-keeper", move || {
            Box::new(Keeper {
                seen: keeper_seen.clone(),
            })
        })
        .unwrap();
    let doc = Document::new(registry).unwrap();

    let keeper = doc.mount("test-keeper", Attributes::new()).unwrap();
    keeper.detach();
    keeper.attach();

    let (old, current) = {
        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        (seen[0].clone(), seen[1].clone())
    };
    assert!(!old.is_attached());
    assert!(current.is_attached());
    assert!(keeper.is_attached());

    let renders = keeper.render_count();
    assert!(!old.set("cycle", json!("stale")));
    old.render();
    old.detach();
    assert_eq!(keeper.get("cycle"), Some(json!(2)));
    assert_eq!(keeper.render_count(), renders);
    assert!(keeper.is_attached());

    assert!(current.set("cycle", json!(3)));
}

#[test]
fn test_render_may_write_through_its_handle() {
    let slot: Rc<RefCell<Option<ComponentHandle>>> = Rc::new(RefCell::new(None));
    let mut registry = Registry::new();
    let writer_slot = slot.clone();
    registry
        .register("test-self-writer", move || {
            Box::new(SelfWriter {
                this: writer_slot.clone(),
            })
        })
        .unwrap();
    let doc = Document::new(registry).unwrap();

    let writer = doc.mount("test-self-writer", Attributes::new()).unwrap();
    assert_eq!(writer.get("renders"), Some(json!(1)));
    writer.render();
    assert_eq!(writer.get("renders"), Some(json!(2)));
    assert_eq!(
        writer.outer_html().unwrap(),
        "<test-self-writer>2</test-self-writer>"
    );
}
