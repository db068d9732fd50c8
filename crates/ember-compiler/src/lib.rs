//! Single-pass, precedence-climbing compiler: turns a source string
//! straight into a top-level [`ember_core::object::FunctionObj`] on the
//! heap, with no intermediate AST.
//!
//! ```
//! # use ember_core::Heap;
//! # use ember_compiler::compile;
//! let mut heap = Heap::new();
//! let script = compile("print 1 + 2;", &mut heap).unwrap();
//! assert_eq!(heap.type_name_of(script), "function");
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

mod class_compiler;
mod compiler;
mod scanner;

use ember_core::{Heap, ObjRef};

pub use scanner::{Scanner, Token, TokenType};

/// One diagnostic produced while scanning or parsing. `message` already
/// carries the `at '<lexeme>'`/`at end` context (see spec.md §7's reporting
/// format); the driver is responsible only for the `[line N] Error` prefix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[line {line}] Error{message}")]
pub struct CompileError {
    pub line: u32,
    pub message: String,
}

/// Compiles `source` into a top-level script function allocated on `heap`.
/// On any scan or parse error, returns every diagnostic collected (panic
/// mode suppresses cascades but does not stop at the first error).
pub fn compile(source: &str, heap: &mut Heap) -> Result<ObjRef, Vec<CompileError>> {
    compiler::Compiler::compile(source, heap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_core::{OpCode, Value};

    fn compile_ok(source: &str, heap: &mut Heap) -> ember_core::ObjRef {
        compile(source, heap).unwrap_or_else(|errors| {
            panic!("expected {source:?} to compile, got {errors:?}");
        })
    }

    #[test]
    fn compiles_arithmetic_print_statement() {
        let mut heap = Heap::new();
        let script = compile_ok("print 1 + 2;", &mut heap);
        let function = heap.function_obj(script);
        assert!(function.chunk.code.contains(&(OpCode::Add as u8)));
        assert!(function.chunk.code.contains(&(OpCode::Print as u8)));
    }

    #[test]
    fn reports_self_referencing_local_initializer() {
        let mut heap = Heap::new();
        let result = compile("var a = 1; { var a = a + 2; print a; }", &mut heap);
        let errors = result.expect_err("self-referencing initializer must be rejected");
        assert!(errors.iter().any(|e| e.message.contains("own initializer")));
    }

    #[test]
    fn reports_return_from_top_level() {
        let mut heap = Heap::new();
        let result = compile("return 1;", &mut heap);
        let errors = result.expect_err("return at top level must be rejected");
        assert!(errors.iter().any(|e| e.message.contains("top-level code")));
    }

    #[test]
    fn function_declaration_emits_closure_with_matching_upvalue_operands() {
        let mut heap = Heap::new();
        let script = compile_ok(
            "fun makeCounter() { var i = 0; fun c() { i = i + 1; return i; } return c; }",
            &mut heap,
        );
        let function = heap.function_obj(script);
        let closure_pos =
            function.chunk.code.iter().position(|&b| b == OpCode::Closure as u8).unwrap();
        let inner_const_index = function.chunk.code[closure_pos + 1];
        let inner = match function.chunk.constants[inner_const_index as usize] {
            Value::Obj(r) => r,
            _ => panic!("expected the inner function to be a constant"),
        };
        let inner_fn = heap.function_obj(inner);
        assert_eq!(inner_fn.upvalue_count, 1);
    }

    #[test]
    fn too_many_locals_is_a_compile_error() {
        let mut heap = Heap::new();
        let mut source = String::from("{ ");
        for i in 0..260 {
            source.push_str(&format!("var v{i} = {i};"));
        }
        source.push('}');
        let result = compile(&source, &mut heap);
        let errors = result.expect_err("257th local must be rejected");
        assert!(errors.iter().any(|e| e.message.contains("Too many local variables")));
    }

    #[test]
    fn class_with_method_compiles() {
        let mut heap = Heap::new();
        compile_ok(
            r#"class Greeter { greet(name) { print "hi " + name; } }
               var g = Greeter(); g.greet("world");"#,
            &mut heap,
        );
    }

    #[test]
    fn reports_one_error_per_invalid_top_level_return() {
        let mut heap = Heap::new();
        let source = indoc::indoc! {"
            return 1;
            return 2;
        "};
        let errors = compile(source, &mut heap).expect_err("both returns must be rejected");
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        pretty_assertions::assert_eq!(
            messages,
            vec![
                " at 'return': Can't return from top-level code.",
                " at 'return': Can't return from top-level code.",
            ]
        );
    }
}
