//! The fetch-decode-execute loop, call/invoke protocol, upvalue machinery,
//! and the mark-sweep collector's root set.
//!
//! Grounded on spec.md §4.4/§4.6 and `original_source/clox`'s `vm.c`/
//! `memory.c` (not present verbatim in the retrieved pack, but its behaviour
//! is pinned down exactly enough by spec.md to reproduce without guessing).
//! The teacher's `vitte-vm::Vm` keeps opcode semantics behind an `OpAdapter`
//! trait so the crate stays opcode-agnostic; this VM's opcode set is fixed
//! by the language, so that indirection is dropped and `run` dispatches
//! directly. The `VmOptions` builder shape (a small `Default` struct with
//! `with_*` setters) is kept from `vitte_vm::VmOptions`.

use ember_core::{
    limits, object::NativeFn, ClosureObj, Heap, ObjData, ObjRef, OpCode, Table, UpvalueState,
    Value,
};

const INIT_METHOD_NAME: &str = "init";

#[derive(Debug)]
struct CallFrame {
    closure: ObjRef,
    ip: usize,
    /// Index into `Vm::stack` of this frame's slot 0 (the callee itself).
    slots: usize,
}

/// One line of a runtime error's stack trace.
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub line: i32,
    pub name: String,
}

/// A runtime fault: unwinds every frame and resets the VM to an empty stack,
/// matching spec.md §4.4's single internal error sink. `Display` renders the
/// same multi-line report the sink prints to stderr, so a REPL can reuse it
/// without re-deriving the format.
#[derive(Debug, Clone)]
pub struct RuntimeError {
    pub message: String,
    pub trace: Vec<TraceFrame>,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.message)?;
        for frame in &self.trace {
            writeln!(f, "[line {}] in {}", frame.line, frame.name)?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Runtime knobs that don't change the language, only how the VM behaves
/// internally. Kept separate from `Vm` construction order so a caller can
/// build one up with `with_*` the way `vitte_vm::VmOptions` does.
#[derive(Debug, Clone, Copy, Default)]
pub struct VmOptions {
    pub stress_gc: bool,
}

impl VmOptions {
    pub fn with_stress_gc(mut self, on: bool) -> Self {
        self.stress_gc = on;
        self
    }
}

/// The stack machine. Owns every GC root except the heap's own interning
/// table: the value stack, call frames, open upvalues, and globals.
#[derive(Debug)]
pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: Table,
    /// Sorted descending by stack slot, matching clox's invariant for
    /// `captureUpvalue`'s linear scan.
    open_upvalues: Vec<ObjRef>,
    /// `"init"`, interned once so every `call_class` avoids re-finding it.
    init_string: ObjRef,
}

impl Vm {
    pub fn new(heap: &mut Heap, options: VmOptions) -> Self {
        heap.stress_gc = options.stress_gc;
        let init_string = heap.intern_string(INIT_METHOD_NAME);
        let mut vm = Vm {
            stack: Vec::with_capacity(limits::STACK_SLOTS_PER_FRAME),
            frames: Vec::with_capacity(limits::FRAMES_MAX),
            globals: Table::new(),
            open_upvalues: Vec::new(),
            init_string,
        };
        crate::natives::install(&mut vm, heap);
        vm
    }

    /// Defines a native function in the globals table. `arity` of `None`
    /// means the native accepts any argument count.
    pub fn define_native(
        &mut self,
        heap: &mut Heap,
        name: &str,
        arity: Option<u8>,
        function: NativeFn,
    ) {
        let name_obj = heap.intern_string(name);
        let native = heap.alloc_native(name_obj, arity, function);
        self.globals.set(heap, name_obj, Value::Obj(native));
    }

    /// Wraps `script` (a compiled top-level function) in a closure and runs
    /// it to completion. May be called repeatedly against the same `Vm`;
    /// globals and interned strings persist across calls, matching spec.md
    /// §5's REPL note.
    pub fn interpret(&mut self, heap: &mut Heap, script: ObjRef) -> Result<(), RuntimeError> {
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();

        let closure = heap.alloc_closure(ClosureObj { function: script, upvalues: Vec::new() });
        self.push(Value::Obj(closure));
        self.collect_if_needed(heap);
        self.frames.push(CallFrame { closure, ip: 0, slots: 0 });
        self.run(heap)
    }

    fn run(&mut self, heap: &mut Heap) -> Result<(), RuntimeError> {
        loop {
            let instruction = self.read_byte(heap);
            let Some(op) = OpCode::from_byte(instruction) else {
                return Err(self.runtime_error(heap, "Invalid opcode."));
            };
            match op {
                OpCode::Constant => {
                    let value = self.read_constant(heap);
                    self.push(value);
                }
                OpCode::Nil => self.push(Value::Nil),
                OpCode::True => self.push(Value::Bool(true)),
                OpCode::False => self.push(Value::Bool(false)),
                OpCode::Pop => {
                    self.pop();
                }
                OpCode::GetLocal => {
                    let slot = self.read_byte(heap) as usize;
                    let base = self.frames.last().unwrap().slots;
                    self.push(self.stack[base + slot]);
                }
                OpCode::SetLocal => {
                    let slot = self.read_byte(heap) as usize;
                    let base = self.frames.last().unwrap().slots;
                    self.stack[base + slot] = self.peek(0);
                }
                OpCode::GetGlobal => {
                    let name = self.read_string(heap);
                    match self.globals.get(heap, name) {
                        Some(value) => self.push(value),
                        None => {
                            let name = heap.string_obj(name).bytes.clone();
                            return Err(
                                self.runtime_error(heap, format!("Undefined variable '{name}'."))
                            );
                        }
                    }
                }
                OpCode::DefineGlobal => {
                    let name = self.read_string(heap);
                    let value = self.peek(0);
                    self.globals.set(heap, name, value);
                    self.pop();
                }
                OpCode::SetGlobal => {
                    let name = self.read_string(heap);
                    let value = self.peek(0);
                    if self.globals.set(heap, name, value) {
                        self.globals.delete(heap, name);
                        let name = heap.string_obj(name).bytes.clone();
                        return Err(
                            self.runtime_error(heap, format!("Undefined variable '{name}'."))
                        );
                    }
                }
                OpCode::GetUpvalue => {
                    let slot = self.read_byte(heap) as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue = heap.closure_obj(closure).upvalues[slot];
                    self.push(self.read_upvalue(heap, upvalue));
                }
                OpCode::SetUpvalue => {
                    let slot = self.read_byte(heap) as usize;
                    let closure = self.frames.last().unwrap().closure;
                    let upvalue = heap.closure_obj(closure).upvalues[slot];
                    let value = self.peek(0);
                    self.write_upvalue(heap, upvalue, value);
                }
                OpCode::GetProperty => {
                    let name = self.read_string(heap);
                    let receiver = self.peek(0);
                    let Value::Obj(obj) = receiver else {
                        return Err(self.runtime_error(heap, "Only instances have properties."));
                    };
                    if !matches!(heap.data(obj), ObjData::Instance(_)) {
                        return Err(self.runtime_error(heap, "Only instances have properties."));
                    }
                    let field = heap.instance_obj(obj).fields.get(heap, name);
                    if let Some(value) = field {
                        self.pop();
                        self.push(value);
                    } else {
                        let class = heap.instance_obj(obj).class;
                        let bound = self.bind_method(heap, class, name)?;
                        self.pop();
                        self.push(bound);
                    }
                }
                OpCode::SetProperty => {
                    let name = self.read_string(heap);
                    let receiver = self.peek(1);
                    let Value::Obj(obj) = receiver else {
                        return Err(self.runtime_error(heap, "Only instances have fields."));
                    };
                    if !matches!(heap.data(obj), ObjData::Instance(_)) {
                        return Err(self.runtime_error(heap, "Only instances have fields."));
                    }
                    let value = self.peek(0);
                    heap.set_instance_field(obj, name, value);
                    let value = self.pop();
                    self.pop();
                    self.push(value);
                }
                OpCode::Equal => {
                    let b = self.pop();
                    let a = self.pop();
                    self.push(Value::Bool(a == b));
                }
                OpCode::Greater => self.binary_compare(heap, |a, b| a > b)?,
                OpCode::Less => self.binary_compare(heap, |a, b| a < b)?,
                OpCode::Add => self.add(heap)?,
                OpCode::Subtract => self.binary_arith(heap, |a, b| a - b)?,
                OpCode::Multiply => self.binary_arith(heap, |a, b| a * b)?,
                OpCode::Divide => self.binary_arith(heap, |a, b| a / b)?,
                OpCode::Not => {
                    let value = self.pop();
                    self.push(Value::Bool(value.is_falsey()));
                }
                OpCode::Negate => match self.peek(0).as_number() {
                    Some(n) => {
                        self.pop();
                        self.push(Value::Number(-n));
                    }
                    None => return Err(self.runtime_error(heap, "Operand must be a number.")),
                },
                OpCode::Print => {
                    let value = self.pop();
                    println!("{}", ember_core::format_value(&value, heap));
                }
                OpCode::Jump => {
                    let offset = self.read_u16(heap);
                    self.frames.last_mut().unwrap().ip += offset as usize;
                }
                OpCode::JumpIfFalse => {
                    let offset = self.read_u16(heap);
                    if self.peek(0).is_falsey() {
                        self.frames.last_mut().unwrap().ip += offset as usize;
                    }
                }
                OpCode::Loop => {
                    let offset = self.read_u16(heap);
                    self.frames.last_mut().unwrap().ip -= offset as usize;
                }
                OpCode::Call => {
                    let arg_count = self.read_byte(heap);
                    let callee = self.peek(arg_count as usize);
                    self.call_value(heap, callee, arg_count)?;
                }
                OpCode::Invoke => {
                    let name = self.read_string(heap);
                    let arg_count = self.read_byte(heap);
                    self.invoke(heap, name, arg_count)?;
                }
                OpCode::Closure => {
                    let function = self
                        .read_constant(heap)
                        .as_obj()
                        .expect("CLOSURE constant must be a function");
                    let upvalue_count = heap.function_obj(function).upvalue_count;
                    let mut upvalues = Vec::with_capacity(upvalue_count as usize);
                    for _ in 0..upvalue_count {
                        let is_local = self.read_byte(heap) != 0;
                        let index = self.read_byte(heap) as usize;
                        let upvalue = if is_local {
                            let base = self.frames.last().unwrap().slots;
                            self.capture_upvalue(heap, base + index)
                        } else {
                            let enclosing = self.frames.last().unwrap().closure;
                            heap.closure_obj(enclosing).upvalues[index]
                        };
                        // Rooted on the stack while more upvalues may still
                        // allocate; folded into the closure and popped once
                        // the whole set exists.
                        self.push(Value::Obj(upvalue));
                        upvalues.push(upvalue);
                    }
                    for _ in 0..upvalues.len() {
                        self.pop();
                    }
                    let closure = heap.alloc_closure(ClosureObj { function, upvalues });
                    self.push(Value::Obj(closure));
                    self.collect_if_needed(heap);
                }
                OpCode::CloseUpvalue => {
                    let top = self.stack.len() - 1;
                    self.close_upvalues(heap, top);
                    self.pop();
                }
                OpCode::Return => {
                    let result = self.pop();
                    let frame = self.frames.pop().expect("RETURN with no active frame");
                    self.close_upvalues(heap, frame.slots);
                    self.stack.truncate(frame.slots);
                    if self.frames.is_empty() {
                        return Ok(());
                    }
                    self.push(result);
                }
                OpCode::Class => {
                    let name = self.read_string(heap);
                    let class = heap.alloc_class(name);
                    self.push(Value::Obj(class));
                    self.collect_if_needed(heap);
                }
                OpCode::Method => {
                    let name = self.read_string(heap);
                    let method = self.peek(0);
                    let class = self.peek(1).as_obj().expect("METHOD receiver must be a class");
                    heap.set_class_method(class, name, method);
                    self.pop();
                }
            }
        }
    }

    // ---- stack primitives ----
    //
    // Infallible: the compiler only ever emits bytecode whose stack effect
    // balances, and the one genuine overflow condition (runaway recursion)
    // is caught by the frame-count check in `call_closure`, not here.

    fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> Value {
        self.stack.pop().expect("stack underflow: malformed bytecode")
    }

    fn peek(&self, distance: usize) -> Value {
        self.stack[self.stack.len() - 1 - distance]
    }

    // ---- bytecode reading ----

    fn read_byte(&mut self, heap: &Heap) -> u8 {
        let frame = self.frames.last_mut().expect("read with no active frame");
        let function = heap.closure_obj(frame.closure).function;
        let byte = heap.function_obj(function).chunk.code[frame.ip];
        frame.ip += 1;
        byte
    }

    fn read_u16(&mut self, heap: &Heap) -> u16 {
        let frame = self.frames.last().unwrap();
        let function = heap.closure_obj(frame.closure).function;
        let value = heap.function_obj(function).chunk.read_u16(frame.ip);
        self.frames.last_mut().unwrap().ip += 2;
        value
    }

    fn read_constant(&mut self, heap: &Heap) -> Value {
        let index = self.read_byte(heap);
        let frame = self.frames.last().unwrap();
        let function = heap.closure_obj(frame.closure).function;
        heap.function_obj(function).chunk.constants[index as usize]
    }

    fn read_string(&mut self, heap: &Heap) -> ObjRef {
        self.read_constant(heap).as_obj().expect("constant must be an interned string")
    }

    // ---- arithmetic ----

    fn binary_arith(
        &mut self,
        heap: &Heap,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<(), RuntimeError> {
        let (Some(b), Some(a)) = (self.peek(0).as_number(), self.peek(1).as_number()) else {
            return Err(self.runtime_error(heap, "Operands must be numbers."));
        };
        self.pop();
        self.pop();
        self.push(Value::Number(f(a, b)));
        Ok(())
    }

    fn binary_compare(
        &mut self,
        heap: &Heap,
        f: impl Fn(f64, f64) -> bool,
    ) -> Result<(), RuntimeError> {
        let (Some(b), Some(a)) = (self.peek(0).as_number(), self.peek(1).as_number()) else {
            return Err(self.runtime_error(heap, "Operands must be numbers."));
        };
        self.pop();
        self.pop();
        self.push(Value::Bool(f(a, b)));
        Ok(())
    }

    fn add(&mut self, heap: &mut Heap) -> Result<(), RuntimeError> {
        match (self.peek(1), self.peek(0)) {
            (Value::Number(a), Value::Number(b)) => {
                self.pop();
                self.pop();
                self.push(Value::Number(a + b));
                Ok(())
            }
            (Value::Obj(a), Value::Obj(b))
                if matches!(heap.data(a), ObjData::String(_))
                    && matches!(heap.data(b), ObjData::String(_)) =>
            {
                self.concatenate(heap);
                Ok(())
            }
            _ => Err(self.runtime_error(heap, "Operands must be two numbers or two strings.")),
        }
    }

    /// `peek`s rather than `pop`s its operands while building the joined
    /// string, so they stay rooted on the stack if interning triggers a
    /// collection (spec.md §4.6's allocator-rooting rule).
    fn concatenate(&mut self, heap: &mut Heap) {
        let a = self.peek(1).as_obj().unwrap();
        let b = self.peek(0).as_obj().unwrap();
        let joined = heap.string_obj(a).bytes.clone() + &heap.string_obj(b).bytes;
        let result = heap.intern_string(&joined);
        self.pop();
        self.pop();
        self.push(Value::Obj(result));
        self.collect_if_needed(heap);
    }

    // ---- calls ----

    fn call_value(
        &mut self,
        heap: &mut Heap,
        callee: Value,
        arg_count: u8,
    ) -> Result<(), RuntimeError> {
        let Value::Obj(obj) = callee else {
            return Err(self.runtime_error(heap, "Can only call functions and classes."));
        };
        if matches!(heap.data(obj), ObjData::Closure(_)) {
            return self.call_closure(heap, obj, arg_count);
        }
        if matches!(heap.data(obj), ObjData::Native(_)) {
            return self.call_native(heap, obj, arg_count);
        }
        if let ObjData::BoundMethod(bound) = heap.data(obj) {
            let receiver = bound.receiver;
            let method = bound.method;
            let slot = self.stack.len() - arg_count as usize - 1;
            self.stack[slot] = receiver;
            return self.call_closure(heap, method, arg_count);
        }
        if matches!(heap.data(obj), ObjData::Class(_)) {
            return self.call_class(heap, obj, arg_count);
        }
        Err(self.runtime_error(heap, "Can only call functions and classes."))
    }

    fn call_closure(
        &mut self,
        heap: &Heap,
        closure: ObjRef,
        arg_count: u8,
    ) -> Result<(), RuntimeError> {
        let function = heap.closure_obj(closure).function;
        let arity = heap.function_obj(function).arity;
        if arg_count != arity {
            return Err(
                self.runtime_error(heap, format!("Expected {arity} arguments but got {arg_count}."))
            );
        }
        if self.frames.len() >= limits::FRAMES_MAX {
            return Err(self.runtime_error(heap, "Stack overflow."));
        }
        let slots = self.stack.len() - arg_count as usize - 1;
        self.frames.push(CallFrame { closure, ip: 0, slots });
        Ok(())
    }

    fn call_native(
        &mut self,
        heap: &mut Heap,
        obj: ObjRef,
        arg_count: u8,
    ) -> Result<(), RuntimeError> {
        let native = heap.native_obj(obj);
        let (function, expected_arity) = (native.function, native.arity);
        if let Some(arity) = expected_arity {
            if arity != arg_count {
                return Err(self
                    .runtime_error(heap, format!("Expected {arity} arguments but got {arg_count}.")));
            }
        }
        let args_start = self.stack.len() - arg_count as usize;
        let args: Vec<Value> = self.stack[args_start..].to_vec();
        match function(heap, &args) {
            Ok(result) => {
                self.stack.truncate(args_start - 1);
                self.push(result);
                self.collect_if_needed(heap);
                Ok(())
            }
            Err(message) => Err(self.runtime_error(heap, message)),
        }
    }

    fn call_class(&mut self, heap: &mut Heap, class: ObjRef, arg_count: u8) -> Result<(), RuntimeError> {
        let instance = heap.alloc_instance(class);
        let slot = self.stack.len() - arg_count as usize - 1;
        self.stack[slot] = Value::Obj(instance);
        self.collect_if_needed(heap);

        if let Some(Value::Obj(initializer)) =
            heap.class_obj(class).methods.get(heap, self.init_string)
        {
            return self.call_closure(heap, initializer, arg_count);
        }
        if arg_count != 0 {
            return Err(
                self.runtime_error(heap, format!("Expected 0 arguments but got {arg_count}."))
            );
        }
        Ok(())
    }

    fn invoke(&mut self, heap: &mut Heap, name: ObjRef, arg_count: u8) -> Result<(), RuntimeError> {
        let receiver = self.peek(arg_count as usize);
        let Value::Obj(obj) = receiver else {
            return Err(self.runtime_error(heap, "Only instances have methods."));
        };
        let ObjData::Instance(instance) = heap.data(obj) else {
            return Err(self.runtime_error(heap, "Only instances have methods."));
        };
        let field = instance.fields.get(heap, name);
        let class = instance.class;
        if let Some(value) = field {
            let slot = self.stack.len() - arg_count as usize - 1;
            self.stack[slot] = value;
            return self.call_value(heap, value, arg_count);
        }
        self.invoke_from_class(heap, class, name, arg_count)
    }

    fn invoke_from_class(
        &mut self,
        heap: &Heap,
        class: ObjRef,
        name: ObjRef,
        arg_count: u8,
    ) -> Result<(), RuntimeError> {
        match heap.class_obj(class).methods.get(heap, name) {
            Some(Value::Obj(method)) => self.call_closure(heap, method, arg_count),
            _ => {
                let name = heap.string_obj(name).bytes.clone();
                Err(self.runtime_error(heap, format!("Undefined property '{name}'.")))
            }
        }
    }

    fn bind_method(
        &mut self,
        heap: &mut Heap,
        class: ObjRef,
        name: ObjRef,
    ) -> Result<Value, RuntimeError> {
        match heap.class_obj(class).methods.get(heap, name) {
            Some(Value::Obj(method)) => {
                let receiver = self.peek(0);
                let bound = heap.alloc_bound_method(receiver, method);
                self.collect_if_needed(heap);
                Ok(Value::Obj(bound))
            }
            _ => {
                let name = heap.string_obj(name).bytes.clone();
                Err(self.runtime_error(heap, format!("Undefined property '{name}'.")))
            }
        }
    }

    // ---- upvalues ----

    fn read_upvalue(&self, heap: &Heap, upvalue: ObjRef) -> Value {
        match heap.upvalue_obj(upvalue).state {
            UpvalueState::Open { stack_slot } => self.stack[stack_slot],
            UpvalueState::Closed { value } => value,
        }
    }

    fn write_upvalue(&mut self, heap: &mut Heap, upvalue: ObjRef, value: Value) {
        match heap.upvalue_obj(upvalue).state {
            UpvalueState::Open { stack_slot } => self.stack[stack_slot] = value,
            UpvalueState::Closed { .. } => {
                heap.upvalue_obj_mut(upvalue).state = UpvalueState::Closed { value };
            }
        }
    }

    fn capture_upvalue(&mut self, heap: &mut Heap, stack_slot: usize) -> ObjRef {
        let existing = self.open_upvalues.iter().find(|&&u| {
            matches!(heap.upvalue_obj(u).state, UpvalueState::Open { stack_slot: s } if s == stack_slot)
        });
        if let Some(&found) = existing {
            return found;
        }
        let insert_at = self
            .open_upvalues
            .iter()
            .position(|&u| match heap.upvalue_obj(u).state {
                UpvalueState::Open { stack_slot: s } => s < stack_slot,
                UpvalueState::Closed { .. } => true,
            })
            .unwrap_or(self.open_upvalues.len());
        let created = heap.alloc_open_upvalue(stack_slot);
        self.open_upvalues.insert(insert_at, created);
        created
    }

    /// Closes every open upvalue at or above `from_slot`. `open_upvalues`
    /// is sorted descending, so these are always a prefix of the list.
    fn close_upvalues(&mut self, heap: &mut Heap, from_slot: usize) {
        while let Some(&first) = self.open_upvalues.first() {
            let at = match heap.upvalue_obj(first).state {
                UpvalueState::Open { stack_slot } => stack_slot,
                UpvalueState::Closed { .. } => break,
            };
            if at < from_slot {
                break;
            }
            let value = self.stack[at];
            heap.upvalue_obj_mut(first).state = UpvalueState::Closed { value };
            self.open_upvalues.remove(0);
        }
    }

    // ---- errors ----

    fn runtime_error(&mut self, heap: &Heap, message: impl Into<String>) -> RuntimeError {
        let message = message.into();
        let mut trace = Vec::with_capacity(self.frames.len());
        for frame in self.frames.iter().rev() {
            let function = heap.closure_obj(frame.closure).function;
            let line = heap.function_obj(function).chunk.line_at(frame.ip.saturating_sub(1));
            let name = match heap.function_obj(function).name {
                Some(n) => heap.string_obj(n).bytes.clone(),
                None => "script".to_string(),
            };
            trace.push(TraceFrame { line, name });
        }
        self.stack.clear();
        self.frames.clear();
        self.open_upvalues.clear();
        tracing::debug!(%message, frames = trace.len() as u64, "runtime error");
        RuntimeError { message, trace }
    }

    // ---- garbage collection ----

    fn mark_roots(&self, heap: &mut Heap) {
        heap.mark_object(self.init_string);
        for &value in &self.stack {
            heap.mark_value(value);
        }
        for frame in &self.frames {
            heap.mark_object(frame.closure);
        }
        for &upvalue in &self.open_upvalues {
            heap.mark_object(upvalue);
        }
        let entries: Vec<(ObjRef, Value)> = self.globals.iter().collect();
        for (key, value) in entries {
            heap.mark_object(key);
            heap.mark_value(value);
        }
    }

    fn collect_garbage(&self, heap: &mut Heap) {
        let before = heap.bytes_allocated;
        self.mark_roots(heap);
        heap.trace_all();
        heap.remove_white_strings();
        let freed = heap.sweep();
        heap.update_gc_threshold();
        tracing::trace!(
            before = before as u64,
            after = heap.bytes_allocated as u64,
            freed = freed as u64,
            next_gc = heap.next_gc as u64,
            "gc cycle"
        );
    }

    fn collect_if_needed(&self, heap: &mut Heap) {
        if heap.should_collect() {
            self.collect_garbage(heap);
        }
    }
}
