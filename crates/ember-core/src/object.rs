//! Heap object variants.
//!
//! Every heap object would classically begin with a `{type_tag, is_marked,
//! next}` header; here the mark bit and allocation-list membership are
//! tracked by the arena slot in `heap.rs` (see DESIGN.md), so `ObjData` only
//! needs to carry each variant's own attributes.

use crate::chunk::Chunk;
use crate::table::Table;
use crate::value::Value;

/// A `Copy` handle standing in for a heap pointer. Equality is index
/// equality, which realizes the spec's "reference identity" requirement
/// without raw pointers or unsafe code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(u32);

impl ObjRef {
    pub(crate) fn new(index: u32) -> Self {
        ObjRef(index)
    }

    pub fn index(self) -> u32 {
        self.0
    }
}

/// A native function's signature: `(heap, args) -> Result<Value, String>`.
/// Takes `&mut Heap` (rather than just the argument slice, as spec.md §4's
/// component table literally describes) because a handful of natives need
/// to allocate — e.g. a native that returns a string must intern it.
/// Errors become a runtime error raised by the caller.
pub type NativeFn = fn(heap: &mut crate::heap::Heap, args: &[Value]) -> Result<Value, String>;

#[derive(Debug, Clone)]
pub struct StringObj {
    pub bytes: String,
    /// 32-bit FNV-1a hash of `bytes`, computed once at construction.
    pub hash: u32,
}

#[derive(Debug, Clone)]
pub struct FunctionObj {
    pub arity: u8,
    pub upvalue_count: u16,
    pub chunk: Chunk,
    /// `None` for the top-level script.
    pub name: Option<ObjRef>,
}

impl FunctionObj {
    pub fn new(name: Option<ObjRef>) -> Self {
        FunctionObj { arity: 0, upvalue_count: 0, chunk: Chunk::new(), name }
    }
}

#[derive(Debug, Clone)]
pub struct ClosureObj {
    pub function: ObjRef,
    pub upvalues: Vec<ObjRef>,
}

/// An upvalue is "open" while `location` still designates a live VM stack
/// slot, and "closed" once the value has been copied inline. Per spec.md
/// §9, stack interior pointers are encoded as indices, not raw pointers, so
/// that the (fixed-capacity, non-relocating) value stack can still be
/// addressed uniformly whether or not the target language allows interior
/// pointers.
#[derive(Debug, Clone)]
pub enum UpvalueState {
    Open { stack_slot: usize },
    Closed { value: Value },
}

#[derive(Debug, Clone)]
pub struct UpvalueObj {
    pub state: UpvalueState,
}

#[derive(Debug, Clone)]
pub struct NativeObj {
    pub name: ObjRef,
    pub arity: Option<u8>,
    pub function: NativeFn,
}

#[derive(Debug, Clone)]
pub struct ClassObj {
    pub name: ObjRef,
    pub methods: Table,
}

impl ClassObj {
    pub fn new(name: ObjRef) -> Self {
        ClassObj { name, methods: Table::new() }
    }
}

#[derive(Debug, Clone)]
pub struct InstanceObj {
    pub class: ObjRef,
    pub fields: Table,
}

impl InstanceObj {
    pub fn new(class: ObjRef) -> Self {
        InstanceObj { class, fields: Table::new() }
    }
}

#[derive(Debug, Clone)]
pub struct BoundMethodObj {
    pub receiver: Value,
    pub method: ObjRef,
}

/// The payload of a heap object, tagged by variant. Mirrors clox's
/// `Obj` variants (`OBJ_STRING`, `OBJ_FUNCTION`, `OBJ_CLOSURE`, `OBJ_UPVALUE`,
/// `OBJ_NATIVE`, `OBJ_CLASS`, `OBJ_INSTANCE`, `OBJ_BOUND_METHOD`).
#[derive(Debug, Clone)]
pub enum ObjData {
    String(StringObj),
    Function(FunctionObj),
    Closure(ClosureObj),
    Upvalue(UpvalueObj),
    Native(NativeObj),
    Class(ClassObj),
    Instance(InstanceObj),
    BoundMethod(BoundMethodObj),
}

impl ObjData {
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjData::String(_) => "string",
            ObjData::Function(_) => "function",
            ObjData::Closure(_) => "function",
            ObjData::Upvalue(_) => "upvalue",
            ObjData::Native(_) => "function",
            ObjData::Class(_) => "class",
            ObjData::Instance(_) => "instance",
            ObjData::BoundMethod(_) => "function",
        }
    }

    pub fn as_string(&self) -> Option<&StringObj> {
        match self {
            ObjData::String(s) => Some(s),
            _ => None,
        }
    }
}
