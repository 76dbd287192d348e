//! End to end runs of the commit-then-run cycle through the public API.

use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use strata::ecs::{
    Commands, Component, Entity, Options, Runtime, RuntimeConfig, Schedule, Violation,
    ViolationKind, With, Without, World,
    storage::{MemoryResource, SystemResource},
    system::IntoSystem,
};

#[derive(Component, Clone)]
struct Greeting {
    msg: &'static str,
}

#[derive(Component, Clone, Debug, PartialEq)]
struct StateIdle {
    since: u32,
}

#[derive(Component, Clone)]
#[component(tag, transient)]
struct EvConnect;

#[derive(Component, Clone)]
#[component(tag, transient)]
struct EvTimeout;

#[derive(Component, Clone, Debug, PartialEq)]
struct Score(i32);

#[derive(Component, Clone, Debug, PartialEq)]
#[component(shared)]
struct Team {
    wins: u32,
}

#[derive(Component, Clone)]
#[component(tag)]
struct Frozen;

#[derive(Component, Clone, Debug, Default, PartialEq)]
#[component(global)]
struct Weather(u32);

#[derive(Component, Clone, Debug, PartialEq)]
struct Walking(f32);

#[derive(Component, Clone, Debug, PartialEq)]
#[component(variant_of = Walking)]
struct Running(f32);

fn runtime() -> Runtime {
    Runtime::with_config(RuntimeConfig::default().worker_threads(4))
}

fn collect_violations(runtime: &mut Runtime) -> Arc<Mutex<Vec<Violation>>> {
    let violations = Arc::new(Mutex::new(Vec::new()));
    let sink = violations.clone();
    runtime.set_violation_handler(move |v: &Violation| sink.lock().unwrap().push(v.clone()));
    violations
}

#[test]
fn greeting_prints_in_entity_order() {
    // Given
    let mut runtime = runtime();
    let output = Arc::new(Mutex::new(String::new()));
    let sink = output.clone();
    runtime.add_component(0..=2, Greeting { msg: "alright " });
    runtime
        .make_system(move |g: &Greeting| sink.lock().unwrap().push_str(g.msg))
        .unwrap();

    // When
    runtime.update();

    // Then
    assert_eq!(*output.lock().unwrap(), "alright alright alright ");
}

#[test]
fn transient_event_fires_once() {
    // Given
    let mut runtime = runtime();
    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    runtime
        .make_system(move |_idle: &StateIdle, _connect: With<EvConnect>| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    runtime.add_component(0, (StateIdle { since: 0 }, EvConnect));

    // When the event is committed
    runtime.update();

    // Then the system fires once and the event is gone at the start of the next cycle
    assert_eq!(fired.load(Ordering::Relaxed), 1);
    assert!(!runtime.has_component::<EvConnect>(0));

    // When an unrelated transient arrives
    runtime.update();
    runtime.add_component(0, EvTimeout);
    runtime.update();
    runtime.update();

    // Then nothing fires and the state survives
    assert_eq!(fired.load(Ordering::Relaxed), 1);
    assert_eq!(
        runtime.get_component::<StateIdle>(0),
        Some(&StateIdle { since: 0 })
    );

    // When the event is raised again
    runtime.add_component(0, EvConnect);
    runtime.update();

    // Then
    assert_eq!(fired.load(Ordering::Relaxed), 2);
}

#[test]
fn pruning_a_transient_marks_it_changed() {
    // Given a committed event that no longer changes
    let mut runtime = runtime();
    runtime.add_component(0..=3, EvTimeout);
    runtime.commit_changes();
    runtime.commit_changes();
    assert!(!runtime.has_changed::<EvTimeout>());
    assert_eq!(runtime.entity_count::<EvTimeout>(), 4);

    // When the run ends
    runtime.run_systems();

    // Then the prune counts as a change
    assert!(runtime.has_changed::<EvTimeout>());
    assert_eq!(runtime.entity_count::<EvTimeout>(), 0);

    // And the next empty commit clears it
    runtime.commit_changes();
    assert!(!runtime.has_changed::<EvTimeout>());
}

#[test]
fn frequency_caps_calls_per_second() {
    // Given
    let mut runtime = runtime();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    runtime
        .make_system_with(Options::new().frequency(10.0), move |_s: &Score| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    runtime.add_component(0, Score(0));
    runtime.commit_changes();

    // When
    let start = Instant::now();
    while start.elapsed() < Duration::from_secs(1) {
        runtime.run_systems();
    }

    // Then
    let calls = calls.load(Ordering::Relaxed);
    assert!(calls > 0);
    assert!(calls <= 10, "ran {calls} times");
}

#[test]
fn sort_orders_visits_by_component_value() {
    // Given
    let mut runtime = runtime();
    let ascending = Arc::new(Mutex::new(Vec::new()));
    let descending = Arc::new(Mutex::new(Vec::new()));
    let (up, down) = (ascending.clone(), descending.clone());
    runtime.add_component(0, Score(30));
    runtime.add_component(1, Score(-5));
    runtime.add_component(2, Score(12));
    runtime.add_component(3, Score(7));
    runtime
        .make_system_with(
            Options::new().sort_by::<Score, _>(|a, b| a.0.cmp(&b.0)),
            move |e: Entity, s: &Score| up.lock().unwrap().push((e.id(), s.0)),
        )
        .unwrap();
    runtime
        .make_system_with(
            Options::new().sort_by::<Score, _>(|a, b| b.0.cmp(&a.0)),
            move |e: Entity, s: &Score| down.lock().unwrap().push((e.id(), s.0)),
        )
        .unwrap();

    // When
    runtime.update();

    // Then
    assert_eq!(
        *ascending.lock().unwrap(),
        vec![(1, -5), (3, 7), (2, 12), (0, 30)]
    );
    assert_eq!(
        *descending.lock().unwrap(),
        vec![(0, 30), (2, 12), (3, 7), (1, -5)]
    );
}

#[test]
fn shared_component_is_a_single_value() {
    // Given
    let mut runtime = runtime();
    runtime.add_component(0..=2, Team { wins: 0 });
    runtime.add_component(10..=12, Team { wins: 0 });
    runtime.make_system(|team: &mut Team| team.wins += 1).unwrap();

    // When
    runtime.update();

    // Then
    assert_eq!(runtime.entity_count::<Team>(), 6);
    assert_eq!(runtime.component_count::<Team>(), 1);
    assert_eq!(runtime.get_shared::<Team>(), Some(&Team { wins: 6 }));
    assert_eq!(runtime.get_component::<Team>(1), runtime.get_component::<Team>(11));
}

#[test]
fn conflicting_shared_values_are_reported() {
    // Given
    let mut runtime = runtime();
    let violations = collect_violations(&mut runtime);

    // When
    runtime.add_component(0..=2, Team { wins: 1 });
    runtime.add_component(5..=6, Team { wins: 2 });
    runtime.commit_changes();

    // Then
    assert!(!violations.lock().unwrap().is_empty());
    assert_eq!(runtime.get_shared::<Team>(), Some(&Team { wins: 1 }));
}

#[test]
fn conflicting_global_values_keep_the_first() {
    // Given
    let mut runtime = runtime();
    let violations = collect_violations(&mut runtime);
    assert_eq!(runtime.get_global::<Weather>(), Some(&Weather(0)));

    // When
    runtime.set_global(Weather(1));
    runtime.set_global(Weather(2));
    runtime.commit_changes();

    // Then
    let violations = violations.lock().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind(), ViolationKind::Assertion);
    assert_eq!(runtime.get_global::<Weather>(), Some(&Weather(1)));
}

#[test]
fn same_global_value_twice_is_accepted() {
    let mut runtime = runtime();
    let violations = collect_violations(&mut runtime);

    runtime.set_global(Weather(3));
    runtime.set_global(Weather(3));
    runtime.commit_changes();

    assert!(violations.lock().unwrap().is_empty());
    assert_eq!(runtime.get_global::<Weather>(), Some(&Weather(3)));
}

#[test]
fn tag_storage_does_not_grow() {
    // Given
    let mut runtime = runtime();

    // When
    runtime.add_component(0..=999, Frozen);
    runtime.commit_changes();
    let small = runtime.component_count::<Frozen>();
    runtime.add_component(1000..=1999, Frozen);
    runtime.commit_changes();

    // Then
    assert_eq!(runtime.entity_count::<Frozen>(), 2000);
    assert_eq!(runtime.component_count::<Frozen>(), small);
    assert!(small <= 1);
}

#[test]
fn without_filter_on_unused_type_selects_everything() {
    // Given
    let mut runtime = runtime();
    let visited = Arc::new(AtomicUsize::new(0));
    let counter = visited.clone();
    runtime.add_component(0..=9, Score(1));
    runtime
        .make_system(move |_s: &Score, _f: Without<Frozen>| {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();

    // When
    runtime.update();

    // Then
    assert_eq!(visited.load(Ordering::Relaxed), 10);
}

#[test]
fn empty_commit_changes_nothing() {
    // Given
    let mut runtime = runtime();
    runtime.add_component(0..=4, Score(3));
    runtime.commit_changes();

    // When
    runtime.commit_changes();

    // Then
    assert!(!runtime.has_changed::<Score>());
    assert_eq!(runtime.entity_count::<Score>(), 5);
    assert_eq!(runtime.get_component::<Score>(4), Some(&Score(3)));
}

#[test]
fn commands_apply_at_the_next_commit() {
    // Given
    let mut runtime = runtime();
    runtime.add_component(0..=3, Score(0));
    runtime
        .make_system(|e: Entity, s: &Score, mut commands: Commands<'_>| {
            if s.0 == 0 && e.id() % 2 == 0 {
                commands.add_component(e, Frozen);
            }
        })
        .unwrap();

    // When
    runtime.update();

    // Then staged, not committed
    assert_eq!(runtime.entity_count::<Frozen>(), 0);
    runtime.commit_changes();
    assert!(runtime.has_component::<Frozen>(0));
    assert!(!runtime.has_component::<Frozen>(1));
    assert!(runtime.has_component::<Frozen>(2));
}

#[test]
fn commands_from_parallel_systems_apply_in_registration_order() {
    // Given two systems that never conflict and overwrite the same scores
    let mut runtime = runtime();
    runtime.add_component(0..=255, (Greeting { msg: "hi" }, StateIdle { since: 0 }));
    runtime
        .make_system(|e: Entity, _g: &Greeting, mut commands: Commands<'_>| {
            commands.add_component(e, Score(1));
        })
        .unwrap();
    runtime
        .make_system(|e: Entity, _s: &StateIdle, mut commands: Commands<'_>| {
            commands.add_component(e, Score(2));
        })
        .unwrap();

    for _ in 0..20 {
        // When
        runtime.update();
        runtime.commit_changes();

        // Then the later system always wins
        assert_eq!(runtime.entity_count::<Score>(), 256);
        for id in 0..=255u32 {
            assert_eq!(runtime.get_component::<Score>(id), Some(&Score(2)));
        }
    }
}

#[test]
fn not_parallel_system_is_planned_alone() {
    // Given
    let mut world = World::new();
    let mut schedule = Schedule::new();
    let reader = |_s: &Score| {};
    let first = schedule.add_system(reader.into_system(Options::new(), &mut world).unwrap());
    let alone = schedule.add_system(
        reader
            .into_system(Options::new().not_parallel(), &mut world)
            .unwrap(),
    );
    let last = schedule.add_system(reader.into_system(Options::new(), &mut world).unwrap());

    // When
    let groups: Vec<Vec<usize>> = schedule
        .plan()
        .iter()
        .map(|group| group.system_indexes().to_vec())
        .collect();

    // Then
    assert!(schedule.system(alone).unwrap().access().is_exclusive());
    assert!(!schedule.system(first).unwrap().access().is_exclusive());
    assert!(groups.contains(&vec![alone.index()]));
    assert!(groups.iter().flatten().any(|&i| i == first.index()));
    assert!(groups.iter().flatten().any(|&i| i == last.index()));
}

#[test]
fn not_parallel_system_never_overlaps_others() {
    // Given
    let mut runtime = runtime();
    let active = Arc::new(AtomicUsize::new(0));
    let overlapped = Arc::new(AtomicUsize::new(0));
    runtime.add_component(0, Score(0));
    for _ in 0..3 {
        let active = active.clone();
        runtime
            .make_system(move |_s: &Score| {
                active.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(5));
                active.fetch_sub(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    let (busy, seen) = (active.clone(), overlapped.clone());
    let handle = runtime
        .make_system_with(Options::new().not_parallel(), move |_s: &Score| {
            seen.fetch_add(busy.load(Ordering::SeqCst), Ordering::SeqCst);
        })
        .unwrap();

    // When
    for _ in 0..5 {
        runtime.update();
    }

    // Then
    assert!(runtime.system(handle).unwrap().access().is_exclusive());
    assert_eq!(overlapped.load(Ordering::SeqCst), 0);
}

#[test]
fn adding_a_variant_removes_its_sibling() {
    // Given
    let mut runtime = runtime();
    runtime.add_component(0..=4, Walking(1.0));
    runtime.commit_changes();

    // When
    runtime.add_component(2..=3, Running(3.0));
    runtime.commit_changes();

    // Then
    assert!(runtime.has_component::<Walking>(1));
    assert!(!runtime.has_component::<Walking>(2));
    assert!(runtime.has_component::<Running>(3));
    assert!(runtime.has_component::<Walking>(4));
    assert_eq!(runtime.entity_count::<Walking>(), 3);
}

#[test]
fn system_over_two_variants_is_rejected() {
    let mut runtime = runtime();
    let violations = collect_violations(&mut runtime);

    let result = runtime.make_system(|_w: &Walking, _r: &Running| {});

    assert!(result.is_err());
    assert_eq!(violations.lock().unwrap()[0].kind(), ViolationKind::Precondition);
}

#[test]
fn missing_component_goes_through_the_handler() {
    // Given
    let mut runtime = runtime();
    let violations = collect_violations(&mut runtime);
    runtime.add_component(0..=1, Score(1));
    runtime.commit_changes();

    // When
    let value = runtime.get_component::<Score>(7);

    // Then
    assert!(value.is_none());
    let violations = violations.lock().unwrap();
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].kind(), ViolationKind::Precondition);
}

#[derive(Default)]
struct Counting {
    live_bytes: AtomicUsize,
}

impl MemoryResource for Counting {
    fn allocate(&self, layout: Layout) -> NonNull<u8> {
        self.live_bytes.fetch_add(layout.size(), Ordering::Relaxed);
        SystemResource.allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.live_bytes.fetch_sub(layout.size(), Ordering::Relaxed);
        unsafe { SystemResource.deallocate(ptr, layout) }
    }
}

#[test]
fn memory_resource_backs_component_values() {
    // Given
    let mut runtime = runtime();
    let counting = Arc::new(Counting::default());
    runtime.add_component(0..=99, Score(4));
    runtime.commit_changes();

    // When existing values move into the new resource
    runtime.set_memory_resource::<Score>(counting.clone());

    // Then
    assert!(counting.live_bytes.load(Ordering::Relaxed) >= 100 * size_of::<Score>());
    assert_eq!(runtime.get_component::<Score>(99), Some(&Score(4)));

    // When moved back
    runtime.reset_memory_resource::<Score>();

    // Then
    assert_eq!(counting.live_bytes.load(Ordering::Relaxed), 0);
    assert_eq!(runtime.get_component::<Score>(0), Some(&Score(4)));
}
