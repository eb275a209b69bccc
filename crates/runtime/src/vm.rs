//! VM state and instruction dispatch.
//!
//! The VM executes a seekable byte stream of fixed-width opcode tags with
//! opcode-specific operands. It owns the operand stack, the call stack of
//! saved stream positions, the try-frame stack used for exception
//! unwinding, and the managed heap. Execution is single-threaded and
//! strictly in program order.

use crate::heap::{Heap, Reference};
use crate::log_enabled;
use crate::object::{IntObject, StringObject};

/// VM-level exceptions, unwound through try frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmException {
    /// Arity mismatch on invocation.
    InvalidArgs { expected: u32, got: u32 },
    /// The invoked value does not support call semantics.
    NotCallable { type_string: String },
    /// The stream ended inside an instruction or held an unknown tag.
    MalformedBytecode { position: usize },
}

impl std::fmt::Display for VmException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VmException::InvalidArgs { expected, got } => {
                write!(
                    f,
                    "wrong number of arguments: expected {}, got {}",
                    expected, got
                )
            }
            VmException::NotCallable { type_string } => {
                write!(f, "value of type `{}` is not callable", type_string)
            }
            VmException::MalformedBytecode { position } => {
                write!(f, "malformed bytecode at position {}", position)
            }
        }
    }
}

impl std::error::Error for VmException {}

/// Instruction tags. Each occupies one byte in the stream, optionally
/// followed by opcode-specific operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Nop = 0,
    /// Push a null reference.
    PushNull = 1,
    /// Push a fresh integer object; operand: 8-byte little-endian value.
    PushInt = 2,
    /// Pop the top of the operand stack.
    Pop = 3,
    /// End the current function body.
    Return = 4,
}

impl Opcode {
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        match byte {
            0 => Some(Opcode::Nop),
            1 => Some(Opcode::PushNull),
            2 => Some(Opcode::PushInt),
            3 => Some(Opcode::Pop),
            4 => Some(Opcode::Return),
            _ => None,
        }
    }
}

/// A seekable instruction stream; positions are byte offsets.
#[derive(Debug, Default)]
pub struct InstructionStream {
    data: Vec<u8>,
    pos: usize,
}

impl InstructionStream {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    pub fn read_i64(&mut self) -> Option<i64> {
        let bytes = self.data.get(self.pos..self.pos + 8)?;
        self.pos += 8;
        Some(i64::from_le_bytes(bytes.try_into().ok()?))
    }

    pub fn read_opcode(&mut self) -> Option<Opcode> {
        Opcode::from_byte(self.read_u8()?)
    }
}

/// Emits an instruction stream; the encoding side of the wire contract.
#[derive(Debug, Default)]
pub struct BytecodeWriter {
    data: Vec<u8>,
}

impl BytecodeWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, op: Opcode) -> &mut Self {
        self.data.push(op as u8);
        self
    }

    pub fn emit_push_int(&mut self, value: i64) -> &mut Self {
        self.data.push(Opcode::PushInt as u8);
        self.data.extend_from_slice(&value.to_le_bytes());
        self
    }

    /// Current write offset, e.g. to record a function's address.
    pub fn position(&self) -> usize {
        self.data.len()
    }

    pub fn finish(self) -> Vec<u8> {
        self.data
    }
}

/// A call-stack entry: the stream position to return to, plus the frame's
/// local references (which are GC roots).
#[derive(Debug)]
pub struct Frame {
    pub return_pos: usize,
    pub locals: Vec<Reference>,
}

impl Frame {
    pub fn new(return_pos: usize) -> Self {
        Self {
            return_pos,
            locals: Vec::new(),
        }
    }
}

/// An exception handler registration.
#[derive(Debug, Clone, Copy)]
pub struct TryFrame {
    /// Stream position of the catch block.
    pub catch_pos: usize,
    /// Operand stack depth to restore before entering the handler.
    pub stack_depth: usize,
}

/// The single-threaded execution state of the VM.
#[derive(Debug)]
pub struct VmState {
    pub heap: Heap,
    /// Operand stack.
    pub stack: Vec<Reference>,
    /// Call stack of saved positions and frame locals.
    pub frames: Vec<Frame>,
    pub try_frames: Vec<TryFrame>,
    /// Globally held references; part of the GC root set.
    pub globals: Vec<Reference>,
    pub stream: InstructionStream,
    /// Current function nesting depth of the instruction reader.
    pub read_level: u32,
    /// Set when an exception unwound past every try frame.
    pub uncaught: Option<VmException>,
    halted: bool,
}

impl VmState {
    pub fn new(bytecode: Vec<u8>) -> Self {
        Self {
            heap: Heap::new(),
            stack: Vec::with_capacity(256),
            frames: Vec::new(),
            try_frames: Vec::new(),
            globals: Vec::new(),
            stream: InstructionStream::new(bytecode),
            read_level: 0,
            uncaught: None,
            halted: false,
        }
    }

    pub fn push(&mut self, reference: Reference) {
        self.stack.push(reference);
    }

    /// Pop the operand stack; null when empty.
    pub fn pop(&mut self) -> Reference {
        self.stack.pop().unwrap_or(Reference::NULL)
    }

    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    pub fn push_try_frame(&mut self, frame: TryFrame) {
        self.try_frames.push(frame);
    }

    pub fn pop_try_frame(&mut self) -> Option<TryFrame> {
        self.try_frames.pop()
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    /// Invoke the object behind `target` with `nargs` operands already on
    /// the stack. The object is moved out of its slot for the duration of
    /// the call; no collection may run in between.
    pub fn invoke(&mut self, target: Reference, nargs: u32) {
        let Some(obj) = self.heap.take(target) else {
            for _ in 0..nargs {
                self.pop();
            }
            self.handle_exception(VmException::NotCallable {
                type_string: "null".to_string(),
            });
            return;
        };
        obj.invoke(self, nargs);
        self.heap.restore(target, obj);
    }

    /// Unwind to the nearest enclosing try frame, restoring its operand
    /// stack depth and pushing the exception message for the handler.
    /// With no frame left, execution halts and the exception is recorded.
    pub fn handle_exception(&mut self, exception: VmException) {
        if let Some(frame) = self.try_frames.pop() {
            self.stack.truncate(frame.stack_depth);
            let message = self
                .heap
                .alloc(Box::new(StringObject::new(exception.to_string())));
            self.stack.push(message);
            self.stream.seek(frame.catch_pos);
            if log_enabled() {
                eprintln!(
                    "[rye runtime] exception caught at {}: {}",
                    frame.catch_pos, exception
                );
            }
        } else {
            if log_enabled() {
                eprintln!("[rye runtime] uncaught exception: {}", exception);
            }
            self.uncaught = Some(exception);
            self.halted = true;
        }
    }

    /// Execute one instruction. `Return` is a no-op here; the invocation
    /// loop performs the call-stack bookkeeping.
    pub fn handle_instruction(&mut self, op: Opcode) {
        match op {
            Opcode::Nop => {}
            Opcode::PushNull => self.push(Reference::NULL),
            Opcode::PushInt => match self.stream.read_i64() {
                Some(value) => {
                    let reference = self.heap.alloc(Box::new(IntObject::new(value)));
                    self.push(reference);
                }
                None => {
                    self.handle_exception(VmException::MalformedBytecode {
                        position: self.stream.position(),
                    });
                }
            },
            Opcode::Pop => {
                self.pop();
            }
            Opcode::Return => {}
        }
    }

    /// Run a full collection: mark from every root, then sweep.
    ///
    /// Roots are the operand stack, the call stack's frame locals, and
    /// the globally held references. Sweep does not begin until every
    /// root has been marked.
    pub fn collect(&mut self) {
        let roots: Vec<Reference> = self
            .stack
            .iter()
            .chain(self.frames.iter().flat_map(|frame| frame.locals.iter()))
            .chain(self.globals.iter())
            .copied()
            .collect();
        for root in roots {
            self.heap.mark(root);
        }
        self.heap.sweep();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_reads_and_seeks() {
        let mut writer = BytecodeWriter::new();
        writer.emit(Opcode::Nop).emit_push_int(7).emit(Opcode::Return);
        let mut stream = InstructionStream::new(writer.finish());

        assert_eq!(stream.read_opcode(), Some(Opcode::Nop));
        assert_eq!(stream.read_opcode(), Some(Opcode::PushInt));
        assert_eq!(stream.read_i64(), Some(7));
        assert_eq!(stream.read_opcode(), Some(Opcode::Return));
        assert_eq!(stream.read_opcode(), None);

        stream.seek(0);
        assert_eq!(stream.position(), 0);
    }

    #[test]
    fn unknown_tags_are_rejected() {
        assert_eq!(Opcode::from_byte(250), None);
        assert_eq!(Opcode::from_byte(4), Some(Opcode::Return));
    }

    #[test]
    fn pop_on_empty_stack_is_null() {
        let mut state = VmState::new(Vec::new());
        assert!(state.pop().is_null());
    }

    #[test]
    fn uncaught_exception_halts() {
        let mut state = VmState::new(Vec::new());
        state.handle_exception(VmException::InvalidArgs {
            expected: 2,
            got: 1,
        });
        assert!(state.halted());
        assert_eq!(
            state.uncaught,
            Some(VmException::InvalidArgs {
                expected: 2,
                got: 1
            })
        );
    }
}
