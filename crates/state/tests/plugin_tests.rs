//! Plugin hooks on store, domain and module creation

mod common;

use canopy_state::{
    Domain, ModuleDefinition, ModuleInfo, NodeKind, NodeOptions, Plugin, StoreNode,
};
use common::{counter, root};
use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct Recorder {
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    fn push(&self, entry: String) {
        self.log.borrow_mut().push(entry);
    }
}

impl Plugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn pre_store(&self, options: &mut NodeOptions) {
        self.push(format!("pre_store {}", options.name));
    }

    fn post_store(&self, store: &dyn StoreNode) {
        self.push(format!("post_store {}", store.path()));
    }

    fn pre_domain(&self, options: &mut NodeOptions) {
        self.push(format!("pre_domain {}", options.name));
    }

    fn post_domain(&self, domain: &Domain) {
        self.push(format!("post_domain {}", domain.path()));
    }

    fn pre_module(&self, module: &ModuleInfo) {
        self.push(format!("pre_module {}", module.name));
    }

    fn post_module(&self, module: &ModuleInfo, instance: &Rc<dyn Any>) {
        let value = instance.downcast_ref::<u32>().copied().unwrap_or_default();
        self.push(format!("post_module {}={value}", module.name));
    }
}

struct Prefixer;

impl Plugin for Prefixer {
    fn name(&self) -> &str {
        "prefixer"
    }

    fn filter(&self, kind: NodeKind, name: &str) -> bool {
        kind == NodeKind::Store && !name.starts_with("raw")
    }

    fn pre_store(&self, options: &mut NodeOptions) {
        options.name = format!("x_{}", options.name);
    }
}

#[test]
fn hooks_run_around_creation() {
    let app = root();
    let recorder = Recorder::default();
    app.use_plugin(recorder.clone());

    counter(&app, "count");
    app.domain("ui").unwrap();
    let answer = ModuleDefinition::new("answer", |_| 42u32);
    app.get(&answer).unwrap();
    app.get(&answer).unwrap();

    assert_eq!(
        recorder.entries(),
        vec![
            "pre_store count",
            "post_store app.count",
            "pre_domain ui",
            "post_domain app.ui",
            "pre_module answer",
            "post_module answer=42",
        ]
    );
}

#[test]
fn pre_hooks_can_rename_and_filters_skip() {
    let app = root();
    app.use_plugin(Prefixer);

    let renamed = counter(&app, "count");
    let untouched = counter(&app, "raw_count");
    let ui = app.domain("ui").unwrap();

    assert_eq!(renamed.path(), "app.x_count");
    assert_eq!(untouched.path(), "app.raw_count");
    assert_eq!(ui.path(), "app.ui");
}

#[test]
fn subdomains_copy_plugins_at_creation() {
    let app = root();
    let early = app.domain("early").unwrap();
    let recorder = Recorder::default();
    app.use_plugin(recorder.clone());
    let late = app.domain("late").unwrap();

    counter(&early, "a");
    counter(&late, "b");

    assert_eq!(
        recorder.entries(),
        vec![
            "pre_domain late",
            "post_domain app.late",
            "pre_store b",
            "post_store app.late.b",
        ]
    );
}
