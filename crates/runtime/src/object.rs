//! Runtime object model.
//!
//! Every heap value carries an `ObjectCore` (flag bitmap, informational
//! reference count, and the ordered field list) behind the `Object` trait.
//! Variants implement call semantics, shallow cloning for the heap's deep
//! copy driver, and stringification.

use crate::heap::Reference;
use crate::vm::{Frame, VmException, VmState};

/// Per-object flag bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectFlags(u8);

impl ObjectFlags {
    pub const TEMPORARY: ObjectFlags = ObjectFlags(0x01);
    pub const CONST: ObjectFlags = ObjectFlags(0x02);
    pub const MARKED: ObjectFlags = ObjectFlags(0x04);

    pub fn contains(self, other: ObjectFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: ObjectFlags) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: ObjectFlags) {
        self.0 &= !other.0;
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

/// State common to every object variant.
#[derive(Debug, Clone, Default)]
pub struct ObjectCore {
    pub flags: ObjectFlags,
    /// Informational only; lifetime is governed by the collector.
    pub refcount: u32,
    fields: Vec<(String, Reference)>,
}

impl ObjectCore {
    pub fn new() -> Self {
        Self {
            flags: ObjectFlags::default(),
            refcount: 1,
            fields: Vec::new(),
        }
    }

    /// Append a named field reference, preserving insertion order.
    pub fn add_field_reference(&mut self, name: impl Into<String>, reference: Reference) {
        self.fields.push((name.into(), reference));
    }

    pub fn field_reference(&self, name: &str) -> Option<Reference> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, reference)| *reference)
    }

    pub fn field_reference_at(&self, index: usize) -> Option<Reference> {
        self.fields.get(index).map(|(_, reference)| *reference)
    }

    pub fn fields(&self) -> &[(String, Reference)] {
        &self.fields
    }
}

/// A polymorphic runtime value living on the heap.
pub trait Object: std::fmt::Debug {
    fn core(&self) -> &ObjectCore;
    fn core_mut(&mut self) -> &mut ObjectCore;

    /// Downcast support for hosts that need the concrete variant.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Call semantics. Non-callable variants raise a not-callable
    /// exception through the VM.
    fn invoke(&self, state: &mut VmState, nargs: u32);

    /// A fresh object of the same variant with an empty field list; the
    /// heap's clone driver copies fields afterwards.
    fn shallow_clone(&self) -> Box<dyn Object>;

    fn to_string(&self) -> String;
    fn type_string(&self) -> &'static str;
}

fn raise_not_callable(state: &mut VmState, type_string: &str) {
    state.handle_exception(VmException::NotCallable {
        type_string: type_string.to_string(),
    });
}

/// A bytecode function: address, arity, variadic flag.
#[derive(Debug)]
pub struct FuncObject {
    core: ObjectCore,
    addr: u64,
    nargs: u32,
    is_variadic: bool,
}

impl FuncObject {
    pub fn new(addr: u64, nargs: u32, is_variadic: bool) -> Self {
        Self {
            core: ObjectCore::new(),
            addr,
            nargs,
            is_variadic,
        }
    }

    pub fn address(&self) -> u64 {
        self.addr
    }

    pub fn num_args(&self) -> u32 {
        self.nargs
    }
}

impl Object for FuncObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    /// Invoke the function: check arity, save the stream position on the
    /// call stack, seek to the body, and execute until the `return`
    /// opcode pops the saved position back.
    fn invoke(&self, state: &mut VmState, nargs: u32) {
        if nargs != self.nargs && !self.is_variadic {
            // The call pushed its arguments; drop them before raising.
            for _ in 0..nargs {
                state.pop();
            }
            state.handle_exception(VmException::InvalidArgs {
                expected: self.nargs,
                got: nargs,
            });
            return;
        }

        state.push_frame(Frame::new(state.stream.position()));
        state.read_level += 1;
        state.stream.seek(self.addr as usize);

        while state.stream.position() < state.stream.len() {
            let Some(op) = state.stream.read_opcode() else {
                state.handle_exception(VmException::MalformedBytecode {
                    position: state.stream.position(),
                });
                break;
            };
            state.handle_instruction(op);

            if op == crate::vm::Opcode::Return {
                if let Some(frame) = state.pop_frame() {
                    state.stream.seek(frame.return_pos);
                    if crate::log_enabled() {
                        eprintln!(
                            "[rye runtime] returning to position {}",
                            frame.return_pos
                        );
                    }
                }
                state.read_level -= 1;
                break;
            }
            if state.halted() {
                break;
            }
        }
    }

    fn shallow_clone(&self) -> Box<dyn Object> {
        Box::new(FuncObject::new(self.addr, self.nargs, self.is_variadic))
    }

    fn to_string(&self) -> String {
        format!("<{}>", self.type_string())
    }

    fn type_string(&self) -> &'static str {
        "func"
    }
}

/// Signature of a host-provided native method.
pub type NativeFn = fn(&mut VmState, u32);

/// A foreign method provided by the host.
pub struct NativeFunction {
    core: ObjectCore,
    name: String,
    nargs: u32,
    func: NativeFn,
}

impl NativeFunction {
    pub fn new(name: impl Into<String>, nargs: u32, func: NativeFn) -> Self {
        Self {
            core: ObjectCore::new(),
            name: name.into(),
            nargs,
            func,
        }
    }
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("nargs", &self.nargs)
            .finish()
    }
}

impl Object for NativeFunction {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn invoke(&self, state: &mut VmState, nargs: u32) {
        if nargs != self.nargs {
            for _ in 0..nargs {
                state.pop();
            }
            state.handle_exception(VmException::InvalidArgs {
                expected: self.nargs,
                got: nargs,
            });
            return;
        }
        (self.func)(state, nargs);
    }

    fn shallow_clone(&self) -> Box<dyn Object> {
        Box::new(NativeFunction::new(self.name.clone(), self.nargs, self.func))
    }

    fn to_string(&self) -> String {
        format!("<native {}>", self.name)
    }

    fn type_string(&self) -> &'static str {
        "native"
    }
}

/// A heap string.
#[derive(Debug)]
pub struct StringObject {
    core: ObjectCore,
    pub value: String,
}

impl StringObject {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            core: ObjectCore::new(),
            value: value.into(),
        }
    }
}

impl Object for StringObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn invoke(&self, state: &mut VmState, _nargs: u32) {
        raise_not_callable(state, self.type_string());
    }

    fn shallow_clone(&self) -> Box<dyn Object> {
        Box::new(StringObject::new(self.value.clone()))
    }

    fn to_string(&self) -> String {
        self.value.clone()
    }

    fn type_string(&self) -> &'static str {
        "string"
    }
}

/// A heap integer.
#[derive(Debug)]
pub struct IntObject {
    core: ObjectCore,
    pub value: i64,
}

impl IntObject {
    pub fn new(value: i64) -> Self {
        Self {
            core: ObjectCore::new(),
            value,
        }
    }
}

impl Object for IntObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn invoke(&self, state: &mut VmState, _nargs: u32) {
        raise_not_callable(state, self.type_string());
    }

    fn shallow_clone(&self) -> Box<dyn Object> {
        Box::new(IntObject::new(self.value))
    }

    fn to_string(&self) -> String {
        self.value.to_string()
    }

    fn type_string(&self) -> &'static str {
        "int"
    }
}

/// A heap float.
#[derive(Debug)]
pub struct FloatObject {
    core: ObjectCore,
    pub value: f64,
}

impl FloatObject {
    pub fn new(value: f64) -> Self {
        Self {
            core: ObjectCore::new(),
            value,
        }
    }
}

impl Object for FloatObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn invoke(&self, state: &mut VmState, _nargs: u32) {
        raise_not_callable(state, self.type_string());
    }

    fn shallow_clone(&self) -> Box<dyn Object> {
        Box::new(FloatObject::new(self.value))
    }

    fn to_string(&self) -> String {
        self.value.to_string()
    }

    fn type_string(&self) -> &'static str {
        "float"
    }
}

/// A user instance: a named bag of fields.
#[derive(Debug)]
pub struct UserObject {
    core: ObjectCore,
    type_name: String,
}

impl UserObject {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            core: ObjectCore::new(),
            type_name: type_name.into(),
        }
    }
}

impl Object for UserObject {
    fn core(&self) -> &ObjectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ObjectCore {
        &mut self.core
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn invoke(&self, state: &mut VmState, _nargs: u32) {
        raise_not_callable(state, self.type_string());
    }

    fn shallow_clone(&self) -> Box<dyn Object> {
        Box::new(UserObject::new(self.type_name.clone()))
    }

    fn to_string(&self) -> String {
        format!("<object {}>", self.type_name)
    }

    fn type_string(&self) -> &'static str {
        "object"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_bitmap_round_trips() {
        let mut flags = ObjectFlags::default();
        assert!(!flags.contains(ObjectFlags::MARKED));
        flags.insert(ObjectFlags::MARKED);
        flags.insert(ObjectFlags::CONST);
        assert!(flags.contains(ObjectFlags::MARKED));
        assert!(flags.contains(ObjectFlags::CONST));
        flags.remove(ObjectFlags::MARKED);
        assert!(!flags.contains(ObjectFlags::MARKED));
        assert!(flags.contains(ObjectFlags::CONST));
    }

    #[test]
    fn fields_preserve_insertion_order() {
        let mut core = ObjectCore::new();
        core.add_field_reference("first", Reference::NULL);
        core.add_field_reference("second", Reference::NULL);
        assert_eq!(core.fields()[0].0, "first");
        assert_eq!(core.fields()[1].0, "second");
        assert!(core.field_reference("first").is_some());
        assert!(core.field_reference("missing").is_none());
    }

    #[test]
    fn stringification() {
        assert_eq!(IntObject::new(42).to_string(), "42");
        assert_eq!(StringObject::new("hi").to_string(), "hi");
        assert_eq!(FuncObject::new(0, 0, false).to_string(), "<func>");
        assert_eq!(UserObject::new("Point").to_string(), "<object Point>");
    }
}
