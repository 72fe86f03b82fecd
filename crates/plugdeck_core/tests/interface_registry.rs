use plugdeck_core::{ConformanceError, ExtensionPoint, InterfaceSpec, PluginType, Registry};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

trait Greeter: Send + Sync {
    fn greet(&self, name: &str) -> String;
}

#[derive(Default)]
struct EnglishGreeter;

impl Greeter for EnglishGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}!")
    }
}

#[derive(Default)]
struct FrenchGreeter;

impl Greeter for FrenchGreeter {
    fn greet(&self, name: &str) -> String {
        format!("Bonjour, {name}!")
    }
}

#[derive(Default)]
struct SilentGreeter;

impl Greeter for SilentGreeter {
    fn greet(&self, _name: &str) -> String {
        String::new()
    }
}

trait Noop: Send + Sync {}

#[derive(Default)]
struct A;
#[derive(Default)]
struct B;
#[derive(Default)]
struct C;

impl Noop for A {}
impl Noop for B {}
impl Noop for C {}

fn greeter_spec() -> InterfaceSpec {
    InterfaceSpec::new("IGreeter").method("greet")
}

#[test]
fn greeters_are_enumerated_in_registration_order() {
    let registry = Registry::new();
    let greeters = registry.declare_interface::<dyn Greeter>(greeter_spec());

    registry
        .register(
            &PluginType::new("EnglishGreeter", EnglishGreeter::default).method("greet"),
            &[greeters.bind::<EnglishGreeter>(|plugin| plugin)],
        )
        .unwrap();
    registry
        .register(
            &PluginType::new("FrenchGreeter", FrenchGreeter::default).method("greet"),
            &[greeters.bind::<FrenchGreeter>(|plugin| plugin)],
        )
        .unwrap();

    let greetings: Vec<String> = greeters
        .enumerate(false)
        .instances()
        .map(|greeter| greeter.greet("Ada"))
        .collect();
    assert_eq!(greetings, ["Hello, Ada!", "Bonjour, Ada!"]);
    assert_eq!(greeters.len(), 2);
    assert!(greeters.contains::<EnglishGreeter>());
    assert!(!greeters.contains::<SilentGreeter>());
}

#[test]
fn missing_member_is_rejected_without_side_effects() {
    let registry = Registry::new();
    let greeters = registry.declare_interface::<dyn Greeter>(greeter_spec());

    let err = registry
        .register(
            &PluginType::new("SilentGreeter", SilentGreeter::default),
            &[greeters.bind::<SilentGreeter>(|plugin| plugin)],
        )
        .unwrap_err();

    assert_eq!(
        err,
        ConformanceError::MissingMember {
            type_name: "SilentGreeter".to_string(),
            member: "greet".to_string(),
            interface: "IGreeter".to_string(),
        }
    );
    assert!(err.to_string().contains("SilentGreeter"));
    assert_eq!(greeters.len(), 0);
}

#[test]
fn attribute_does_not_satisfy_required_method() {
    let registry = Registry::new();
    let greeters = registry.declare_interface::<dyn Greeter>(greeter_spec());

    let err = registry
        .register(
            &PluginType::new("SilentGreeter", SilentGreeter::default).attribute("greet"),
            &[greeters.bind::<SilentGreeter>(|plugin| plugin)],
        )
        .unwrap_err();

    assert!(matches!(err, ConformanceError::MemberNotCallable { .. }));
    assert!(greeters.is_empty());
}

#[test]
fn private_members_are_not_required() {
    let registry = Registry::new();
    let greeters = registry
        .declare_interface::<dyn Greeter>(greeter_spec().method("_cache_key"));

    registry
        .register(
            &PluginType::new("EnglishGreeter", EnglishGreeter::default).method("greet"),
            &[greeters.bind::<EnglishGreeter>(|plugin| plugin)],
        )
        .unwrap();
    assert_eq!(greeters.len(), 1);
}

#[test]
fn type_without_interfaces_is_rejected() {
    let registry = Registry::new();
    let err = registry
        .register(&PluginType::new("A", A::default), &[])
        .unwrap_err();
    assert_eq!(
        err,
        ConformanceError::NoInterfaces {
            type_name: "A".to_string()
        }
    );
}

#[test]
fn disabled_implementations_are_filtered_by_default() {
    let registry = Registry::new();
    let noops = registry.declare_interface::<dyn Noop>(InterfaceSpec::new("INoop"));

    registry
        .register(
            &PluginType::new("A", A::default).enabled(true),
            &[noops.bind::<A>(|plugin| plugin)],
        )
        .unwrap();
    registry
        .register(&PluginType::new("B", B::default), &[noops.bind::<B>(|plugin| plugin)])
        .unwrap();
    registry
        .register(
            &PluginType::new("C", C::default).enabled(false),
            &[noops.bind::<C>(|plugin| plugin)],
        )
        .unwrap();

    let enabled: Vec<String> = noops
        .enumerate(false)
        .map(|extension| extension.type_name().to_string())
        .collect();
    assert_eq!(enabled, ["A", "B"]);
    assert_eq!(noops.enumerate(true).len(), 3);
    assert_eq!(noops.len(), 3);
    assert!(noops.contains::<C>());

    let point = noops.extension_point();
    assert_eq!(point.len(), 2);
    assert!(!point.contains::<C>());
    assert_eq!(point.all().len(), 3);
}

#[test]
fn non_service_interface_holds_classes() {
    let registry = Registry::new();
    let greeters = registry
        .declare_interface::<dyn Greeter>(greeter_spec().service(false));

    registry
        .register(
            &PluginType::new("EnglishGreeter", EnglishGreeter::default).method("greet"),
            &[greeters.bind::<EnglishGreeter>(|plugin| plugin)],
        )
        .unwrap();

    assert_eq!(greeters.enumerate(false).instances().count(), 0);
    let class = greeters.enumerate(false).classes().next().unwrap();
    assert_eq!(class.type_name(), "EnglishGreeter");

    let first = class.instantiate();
    let second = class.instantiate();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(first.greet("Bo"), "Hello, Bo!");
}

#[test]
fn multi_interface_registration_is_atomic() {
    let registry = Registry::new();
    let greeters = registry.declare_interface::<dyn Greeter>(greeter_spec());
    let polite = registry.declare_interface::<dyn Greeter>(
        InterfaceSpec::new("IPoliteGreeter")
            .method("greet")
            .attribute("formality"),
    );

    let err = registry
        .register(
            &PluginType::new("EnglishGreeter", EnglishGreeter::default).method("greet"),
            &[
                greeters.bind::<EnglishGreeter>(|plugin| plugin),
                polite.bind::<EnglishGreeter>(|plugin| plugin),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, ConformanceError::MissingMember { ref member, .. } if member == "formality"));
    assert!(greeters.is_empty());
    assert!(polite.is_empty());

    registry
        .register(
            &PluginType::new("EnglishGreeter", EnglishGreeter::default)
                .method("greet")
                .attribute("formality"),
            &[
                greeters.bind::<EnglishGreeter>(|plugin| plugin),
                polite.bind::<EnglishGreeter>(|plugin| plugin),
            ],
        )
        .unwrap();
    assert!(greeters.contains::<EnglishGreeter>());
    assert!(polite.contains::<EnglishGreeter>());
}

#[test]
fn duplicate_registration_is_rejected() {
    let registry = Registry::new();
    let greeters = registry.declare_interface::<dyn Greeter>(greeter_spec());
    let english = PluginType::new("EnglishGreeter", EnglishGreeter::default).method("greet");

    registry
        .register(&english, &[greeters.bind::<EnglishGreeter>(|plugin| plugin)])
        .unwrap();
    let err = registry
        .register(&english, &[greeters.bind::<EnglishGreeter>(|plugin| plugin)])
        .unwrap_err();
    assert!(matches!(err, ConformanceError::DuplicateImplementation { .. }));

    let err = registry
        .register(
            &PluginType::new("FrenchGreeter", FrenchGreeter::default).method("greet"),
            &[
                greeters.bind::<FrenchGreeter>(|plugin| plugin),
                greeters.bind::<FrenchGreeter>(|plugin| plugin),
            ],
        )
        .unwrap_err();
    assert!(matches!(err, ConformanceError::DuplicateImplementation { .. }));
    assert_eq!(greeters.len(), 1);
}

#[test]
fn extension_point_tracks_later_registrations() {
    let registry = Registry::new();
    let greeters = registry.declare_interface::<dyn Greeter>(greeter_spec());
    let point = ExtensionPoint::new(&greeters);
    assert!(point.is_empty());
    assert_eq!(point.to_string(), "<ExtensionPoint 'IGreeter'>");

    registry
        .register(
            &PluginType::new("FrenchGreeter", FrenchGreeter::default).method("greet"),
            &[greeters.bind::<FrenchGreeter>(|plugin| plugin)],
        )
        .unwrap();

    assert_eq!(point.len(), 1);
    let names: Vec<_> = (&point)
        .into_iter()
        .map(|extension| extension.type_name().to_string())
        .collect();
    assert_eq!(names, ["FrenchGreeter"]);
}

#[test]
fn same_name_declarations_are_distinct() {
    let registry = Registry::new();
    let first = registry.declare_interface::<dyn Greeter>(greeter_spec());
    let second = registry.declare_interface::<dyn Greeter>(greeter_spec());
    assert_ne!(first, second);

    registry
        .register(
            &PluginType::new("EnglishGreeter", EnglishGreeter::default).method("greet"),
            &[second.bind::<EnglishGreeter>(|plugin| plugin)],
        )
        .unwrap();
    assert!(first.is_empty());
    assert_eq!(registry.interface::<dyn Greeter>("IGreeter").unwrap(), first);
}

struct Worker<const N: usize>;

impl<const N: usize> Noop for Worker<N> {}

fn worker<const N: usize>() -> Worker<N> {
    Worker
}

#[test]
fn concurrent_registrations_are_all_recorded() {
    let registry = Registry::new();
    let noops = registry.declare_interface::<dyn Noop>(InterfaceSpec::new("INoop"));

    std::thread::scope(|scope| {
        scope.spawn(|| {
            registry
                .register(
                    &PluginType::new("Worker0", worker::<0>),
                    &[noops.bind::<Worker<0>>(|plugin| plugin)],
                )
                .unwrap()
        });
        scope.spawn(|| {
            registry
                .register(
                    &PluginType::new("Worker1", worker::<1>),
                    &[noops.bind::<Worker<1>>(|plugin| plugin)],
                )
                .unwrap()
        });
        scope.spawn(|| {
            registry
                .register(
                    &PluginType::new("Worker2", worker::<2>),
                    &[noops.bind::<Worker<2>>(|plugin| plugin)],
                )
                .unwrap()
        });
        scope.spawn(|| {
            for _ in 0..100 {
                let seen = noops.enumerate(true).len();
                assert!(seen <= 3);
            }
        });
    });

    assert_eq!(noops.len(), 3);
}

trait Counter: Send + Sync {
    fn bump(&self) -> usize;
}

#[derive(Default)]
struct PageViews(AtomicUsize);

impl Counter for PageViews {
    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Default)]
struct Downloads(AtomicUsize);

impl Counter for Downloads {
    fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[test]
fn service_instances_keep_separate_live_state() {
    let registry = Registry::new();
    let counters =
        registry.declare_interface::<dyn Counter>(InterfaceSpec::new("ICounter").method("bump"));
    registry
        .register(
            &PluginType::new("PageViews", PageViews::default).method("bump"),
            &[counters.bind::<PageViews>(|counter| counter)],
        )
        .unwrap();
    registry
        .register(
            &PluginType::new("Downloads", Downloads::default).method("bump"),
            &[counters.bind::<Downloads>(|counter| counter)],
        )
        .unwrap();

    let first: Vec<_> = counters.enumerate(false).instances().collect();
    assert_eq!(first[0].bump(), 1);
    assert_eq!(first[0].bump(), 2);
    assert_eq!(first[1].bump(), 1);

    let again: Vec<_> = counters.enumerate(false).instances().collect();
    assert!(Arc::ptr_eq(&first[0], &again[0]));
    assert_eq!(again[0].bump(), 3);
    assert_eq!(again[1].bump(), 2);
}

static FLAKY_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct Flaky;

impl Noop for Flaky {}

fn build_flaky() -> Flaky {
    if FLAKY_BUILDS.fetch_add(1, Ordering::SeqCst) == 1 {
        panic!("second construction fails");
    }
    Flaky
}

#[test]
fn panicking_constructor_leaves_no_partial_registration() {
    let registry = Registry::new();
    let first = registry.declare_interface::<dyn Noop>(InterfaceSpec::new("IFirst"));
    let second = registry.declare_interface::<dyn Noop>(InterfaceSpec::new("ISecond"));

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        registry.register(
            &PluginType::new("Flaky", build_flaky),
            &[
                first.bind::<Flaky>(|plugin| plugin),
                second.bind::<Flaky>(|plugin| plugin),
            ],
        )
    }));

    assert!(outcome.is_err());
    assert!(first.is_empty());
    assert!(second.is_empty());

    registry
        .register(
            &PluginType::new("Flaky", build_flaky),
            &[first.bind::<Flaky>(|plugin| plugin)],
        )
        .unwrap();
    assert_eq!(first.len(), 1);
}
