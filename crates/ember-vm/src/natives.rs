//! Native functions seeded into every fresh `Vm`'s globals table.
//!
//! `clock` mirrors clox's native function table (`original_source/clox`
//! wires one native, `clock`, the same way at VM startup); `type` has no
//! original counterpart and is added because spec.md §4.4 calls for a
//! minimal ambient standard library beyond bare arithmetic and printing.

use std::sync::OnceLock;
use std::time::Instant;

use ember_core::{Heap, Value};

use crate::Vm;

static START: OnceLock<Instant> = OnceLock::new();

pub(crate) fn install(vm: &mut Vm, heap: &mut Heap) {
    vm.define_native(heap, "clock", Some(0), clock);
    vm.define_native(heap, "type", Some(1), type_of);
}

/// Seconds elapsed since the process (more precisely, the first VM) started.
fn clock(_heap: &mut Heap, _args: &[Value]) -> Result<Value, String> {
    let start = START.get_or_init(Instant::now);
    Ok(Value::Number(start.elapsed().as_secs_f64()))
}

/// The runtime type name of its single argument, as an interned string.
fn type_of(heap: &mut Heap, args: &[Value]) -> Result<Value, String> {
    let name = ember_core::type_name(&args[0], heap);
    Ok(Value::Obj(heap.intern_string(name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Heap;

    #[test]
    fn clock_returns_a_nonnegative_number() {
        let mut heap = Heap::new();
        let result = clock(&mut heap, &[]).unwrap();
        assert!(matches!(result, Value::Number(n) if n >= 0.0));
    }

    #[test]
    fn type_of_names_every_kind() {
        let mut heap = Heap::new();
        let name = heap.intern_string("Widget");
        let obj = heap.alloc_class(name);
        for (value, expected) in [
            (Value::Nil, "nil"),
            (Value::Bool(true), "bool"),
            (Value::Number(1.0), "number"),
            (Value::Obj(obj), "class"),
        ] {
            let Value::Obj(name) = type_of(&mut heap, &[value]).unwrap() else {
                panic!("type() must return a string");
            };
            assert_eq!(heap.string_obj(name).bytes, expected);
        }
    }
}
