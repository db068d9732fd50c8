//! ember-core — the runtime types shared by the Ember compiler and VM.
//!
//! Contains everything needed to represent compiled bytecode and live
//! values without depending on the compiler or the interpreter loop:
//!
//! - `value`: the dynamically-typed [`Value`].
//! - `object`: heap object variants (`ObjData`) behind the [`ObjRef`] handle.
//! - `heap`: the object arena and mark-sweep collector primitives.
//! - `table`: the open-addressed hash table used for globals, instance
//!   fields, class methods, and string interning.
//! - `chunk`: the packed bytecode buffer, line map, and constant pool.
//!
//! This crate owns no interpreter loop and no parser; it is pure data model,
//! matching spec.md §3's separation of "data model" from "component design".

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod chunk;
pub mod error;
pub mod heap;
pub mod object;
pub mod table;
pub mod value;

pub use chunk::{Chunk, OpCode, MAX_CONSTANTS};
pub use error::LimitError;
pub use heap::Heap;
pub use object::{
    BoundMethodObj, ClassObj, ClosureObj, FunctionObj, InstanceObj, NativeFn, NativeObj, ObjData,
    ObjRef, StringObj, UpvalueObj, UpvalueState,
};
pub use table::Table;
pub use value::{format_value, type_name, Value};

/// Hard ceilings from spec.md §3.
pub mod limits {
    /// `FRAMES_MAX` — the call-frame stack never exceeds this.
    pub const FRAMES_MAX: usize = 64;
    /// Value stack slots available per frame.
    pub const STACK_SLOTS_PER_FRAME: usize = 256;
    /// `FRAMES_MAX * 256` — the value stack never exceeds this.
    pub const STACK_MAX: usize = FRAMES_MAX * STACK_SLOTS_PER_FRAME;
    /// The compiler's per-function local table has at most this many
    /// entries; slot 0 is reserved.
    pub const LOCALS_MAX: usize = 256;
    /// Distinct upvalues a single function may capture.
    pub const UPVALUES_MAX: usize = 256;
}
