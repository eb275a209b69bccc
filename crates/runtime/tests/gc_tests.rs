//! Mark-and-sweep collector integration tests.

use rye_runtime::{
    Heap, IntObject, ObjectFlags, Reference, StringObject, UserObject, VmState,
};

fn user(heap: &mut Heap, name: &str) -> Reference {
    heap.alloc(Box::new(UserObject::new(name)))
}

fn link(heap: &mut Heap, from: Reference, field: &str, to: Reference) {
    heap.get_mut(from)
        .expect("live object")
        .core_mut()
        .add_field_reference(field, to);
}

#[test]
fn reachable_objects_survive_and_unreachable_die() {
    // A -> B, C isolated; roots = {A}.
    let mut heap = Heap::new();
    let a = user(&mut heap, "A");
    let b = user(&mut heap, "B");
    let c = user(&mut heap, "C");
    link(&mut heap, a, "b", b);

    heap.mark(a);
    heap.sweep();

    assert!(heap.get(a).is_some());
    assert!(heap.get(b).is_some());
    assert!(heap.get(c).is_none());
    assert_eq!(heap.num_objects(), 2);
    assert!(heap.check_consistency());
}

#[test]
fn survivors_have_the_mark_bit_cleared() {
    let mut heap = Heap::new();
    let a = user(&mut heap, "A");
    let b = user(&mut heap, "B");
    link(&mut heap, a, "b", b);

    heap.mark(a);
    heap.sweep();

    for reference in [a, b] {
        let flags = heap.get(reference).expect("live object").core().flags;
        assert!(!flags.contains(ObjectFlags::MARKED));
    }
}

#[test]
fn sweep_with_no_roots_is_idempotent() {
    let mut heap = Heap::new();
    for value in 0..5 {
        heap.alloc(Box::new(IntObject::new(value)));
    }
    assert_eq!(heap.num_objects(), 5);

    heap.sweep();
    assert_eq!(heap.num_objects(), 0);
    heap.sweep();
    assert_eq!(heap.num_objects(), 0);
    assert!(heap.check_consistency());
}

#[test]
fn cycles_are_collected_when_unreachable() {
    let mut heap = Heap::new();
    let a = user(&mut heap, "A");
    let b = user(&mut heap, "B");
    link(&mut heap, a, "next", b);
    link(&mut heap, b, "next", a);

    // Reachable cycle survives.
    heap.mark(a);
    heap.sweep();
    assert_eq!(heap.num_objects(), 2);

    // Unreachable cycle dies.
    heap.sweep();
    assert_eq!(heap.num_objects(), 0);
    assert!(heap.check_consistency());
}

#[test]
fn null_field_references_are_tolerated() {
    let mut heap = Heap::new();
    let a = user(&mut heap, "A");
    link(&mut heap, a, "hole", Reference::NULL);

    heap.mark(a);
    heap.sweep();
    assert_eq!(heap.num_objects(), 1);
}

#[test]
fn vm_roots_cover_stack_frames_and_globals() {
    let mut state = VmState::new(Vec::new());
    let on_stack = state.heap.alloc(Box::new(IntObject::new(1)));
    let global = state.heap.alloc(Box::new(IntObject::new(2)));
    let dead = state.heap.alloc(Box::new(IntObject::new(3)));
    state.push(on_stack);
    state.globals.push(global);

    state.collect();

    assert!(state.heap.get(on_stack).is_some());
    assert!(state.heap.get(global).is_some());
    assert!(state.heap.get(dead).is_none());
    assert_eq!(state.heap.num_objects(), 2);
}

#[test]
fn clone_is_a_deep_structural_copy() {
    let mut heap = Heap::new();
    let leaf = heap.alloc(Box::new(StringObject::new("leaf")));
    let root = user(&mut heap, "Root");
    link(&mut heap, root, "leaf", leaf);

    let copy = heap.clone_object(root);
    assert_ne!(copy, root);

    let copied_leaf = heap
        .get(copy)
        .expect("copy")
        .core()
        .field_reference("leaf")
        .expect("field copied");
    assert_ne!(copied_leaf, leaf);

    // Mutating the copy's leaf leaves the original alone.
    let as_string = heap
        .get(copied_leaf)
        .and_then(|obj| obj.as_any().downcast_ref::<StringObject>())
        .expect("string leaf");
    assert_eq!(as_string.value, "leaf");
    assert_eq!(heap.num_objects(), 4);
}

#[test]
fn shared_substructure_stays_shared_in_clones() {
    let mut heap = Heap::new();
    let shared = user(&mut heap, "Shared");
    let root = user(&mut heap, "Root");
    link(&mut heap, root, "left", shared);
    link(&mut heap, root, "right", shared);

    let copy = heap.clone_object(root);
    let core = heap.get(copy).expect("copy").core();
    let left = core.field_reference("left").expect("left");
    let right = core.field_reference("right").expect("right");
    assert_eq!(left, right);
    // Root, shared, plus one copy of each.
    assert_eq!(heap.num_objects(), 4);
}

#[test]
fn dump_lists_live_objects() {
    let mut heap = Heap::new();
    heap.alloc(Box::new(IntObject::new(7)));
    heap.alloc(Box::new(StringObject::new("text")));

    let mut out = Vec::new();
    heap.dump(&mut out).expect("dump");
    let dumped = String::from_utf8(out).expect("utf8");
    assert!(dumped.contains('7'));
    assert!(dumped.contains("text"));
    assert_eq!(dumped.lines().count(), 2);
}
