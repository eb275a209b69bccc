//! Rye runtime: managed heap, object model, and VM state.
//!
//! The heap is an arena of slots collected by a two-phase mark-and-sweep
//! pass; references are typed handles holding a slot index, so sweeping
//! never invalidates a live handle. Everything here is single-threaded:
//! the VM mutates its stacks and the heap with no synchronization, and
//! native methods must not trigger a collection while they hold an object
//! taken out of its slot.

pub mod heap;
pub mod object;
pub mod vm;

pub use heap::{Heap, Reference, SlotIndex};
pub use object::{
    FloatObject, FuncObject, IntObject, NativeFunction, Object, ObjectCore, ObjectFlags,
    StringObject, UserObject,
};
pub use vm::{BytecodeWriter, Frame, InstructionStream, Opcode, TryFrame, VmException, VmState};

use std::sync::OnceLock;

/// Stderr logging gate, initialized once from `RYE_RUNTIME_LOG`.
pub(crate) fn log_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| std::env::var_os("RYE_RUNTIME_LOG").is_some())
}
