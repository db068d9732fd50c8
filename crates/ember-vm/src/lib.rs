//! ember-vm — the stack-based bytecode interpreter.
//!
//! ```
//! # use ember_core::Heap;
//! # use ember_vm::{Vm, VmOptions};
//! let mut heap = Heap::new();
//! let mut vm = Vm::new(&mut heap, VmOptions::default());
//! let script = ember_compiler::compile("print 1 + 2;", &mut heap).unwrap();
//! vm.interpret(&mut heap, script).unwrap();
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

mod natives;
mod vm;

pub use vm::{RuntimeError, TraceFrame, Vm, VmOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::Heap;

    fn run(source: &str) -> Result<(Heap, Vm), RuntimeError> {
        let mut heap = Heap::new();
        let mut vm = Vm::new(&mut heap, VmOptions::default());
        let script = ember_compiler::compile(source, &mut heap)
            .unwrap_or_else(|errors| panic!("expected {source:?} to compile, got {errors:?}"));
        vm.interpret(&mut heap, script)?;
        Ok((heap, vm))
    }

    #[test]
    fn arithmetic_and_string_concatenation() {
        run("print 1 + 2 * 3;").unwrap();
        run(r#"print "foo" + "bar";"#).unwrap();
    }

    #[test]
    fn closures_capture_and_mutate_shared_upvalues() {
        run(r#"
            fun makeCounter() {
              var count = 0;
              fun increment() {
                count = count + 1;
                return count;
              }
              return increment;
            }
            var counter = makeCounter();
            if (counter() != 1) { print "fail 1"; }
            if (counter() != 2) { print "fail 2"; }
        "#)
        .unwrap();
    }

    #[test]
    fn classes_methods_and_bound_methods() {
        run(r#"
            class Greeter {
              init(name) { this.name = name; }
              greet() { return "hi " + this.name; }
            }
            var g = Greeter("Ada");
            var bound = g.greet;
            if (bound() != "hi Ada") { print "fail"; }
        "#)
        .unwrap();
    }

    #[test]
    fn field_shadows_method_for_both_invoke_and_get_property_call() {
        let source = r#"
            class Box {
              value() { return "method"; }
            }
            fun asField() { return "field"; }
            var b = Box();
            b.value = asField;
            print b.value();
        "#;
        // The field assigned over `value` wins under both the INVOKE fast
        // path and the GET_PROPERTY-then-CALL desugaring; this only checks
        // that the program runs to completion without a runtime error.
        run(source).unwrap();
    }

    #[test]
    fn native_clock_and_type_dispatch_through_call() {
        run(r#"
            var t = type(1);
            if (t != "number") { print "fail number"; }
            if (type("x") != "string") { print "fail string"; }
            if (type(nil) != "nil") { print "fail nil"; }
            if (type(true) != "bool") { print "fail bool"; }
            var elapsed = clock();
            if (elapsed < 0) { print "fail clock"; }
        "#)
        .unwrap();
    }

    #[test]
    fn undefined_variable_is_a_runtime_error_with_trace() {
        let mut heap = Heap::new();
        let mut vm = Vm::new(&mut heap, VmOptions::default());
        let script = ember_compiler::compile("print nope;", &mut heap).unwrap();
        let err = vm.interpret(&mut heap, script).unwrap_err();
        assert_eq!(err.message, "Undefined variable 'nope'.");
        assert_eq!(err.trace.len(), 1);
        assert_eq!(err.trace[0].name, "script");
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        let err = run("var x = 1; x();").unwrap_err();
        assert_eq!(err.message, "Can only call functions and classes.");
    }

    #[test]
    fn wrong_arity_is_a_runtime_error() {
        let err = run("fun f(a, b) { return a + b; } f(1);").unwrap_err();
        assert_eq!(err.message, "Expected 2 arguments but got 1.");
    }

    #[test]
    fn adding_number_and_string_is_a_runtime_error() {
        let err = run(r#"print 1 + "two";"#).unwrap_err();
        assert_eq!(err.message, "Operands must be two numbers or two strings.");
    }

    #[test]
    fn runtime_error_resets_the_stack_for_later_interpret_calls() {
        let mut heap = Heap::new();
        let mut vm = Vm::new(&mut heap, VmOptions::default());
        let bad = ember_compiler::compile("print nope;", &mut heap).unwrap();
        assert!(vm.interpret(&mut heap, bad).is_err());
        let good = ember_compiler::compile("print 1 + 1;", &mut heap).unwrap();
        assert!(vm.interpret(&mut heap, good).is_ok());
    }

    #[test]
    fn globals_persist_across_repeated_interpret_calls() {
        let mut heap = Heap::new();
        let mut vm = Vm::new(&mut heap, VmOptions::default());
        let first = ember_compiler::compile("var x = 10;", &mut heap).unwrap();
        vm.interpret(&mut heap, first).unwrap();
        let second = ember_compiler::compile("if (x != 10) { print \"fail\"; }", &mut heap).unwrap();
        vm.interpret(&mut heap, second).unwrap();
    }

    #[test]
    fn stress_gc_runs_a_collection_on_every_allocation_without_crashing() {
        let mut heap = Heap::new();
        let mut vm = Vm::new(&mut heap, VmOptions::default().with_stress_gc(true));
        let script = ember_compiler::compile(
            r#"
            class Node {
              init(value) { this.value = value; }
            }
            var total = 0;
            var i = 0;
            while (i < 50) {
              var n = Node(i);
              total = total + n.value;
              i = i + 1;
            }
            print total;
            "#,
            &mut heap,
        )
        .unwrap();
        vm.interpret(&mut heap, script).unwrap();
    }

    #[test]
    fn unreachable_closure_is_collected_once_stress_gc_runs() {
        let mut heap = Heap::new();
        let mut vm = Vm::new(&mut heap, VmOptions::default().with_stress_gc(true));
        let script = ember_compiler::compile(
            r#"
            fun makeGreeting() {
              var greeting = "temporary";
              fun show() { return greeting; }
              return show;
            }
            makeGreeting();
            var after = "anchor";
            print after;
            "#,
            &mut heap,
        )
        .unwrap();
        vm.interpret(&mut heap, script).unwrap();
    }
}
