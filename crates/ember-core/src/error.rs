//! Shared error types. Grounded on `vitte-core/src/lib.rs`'s `Error` enum
//! (`#[derive(thiserror::Error)]`, narrow `#[error("...")]` messages).

use thiserror::Error;

/// Chunk-construction limits exceeded at compile time. Raised by
/// `ember-core` primitives (`Chunk::add_constant`) and surfaced by
/// `ember-compiler` as a `CompileError` with source position attached.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum LimitError {
    #[error("Too many constants in one chunk.")]
    TooManyConstants,
    #[error("Too many local variables in function.")]
    TooManyLocals,
    #[error("Too many upvalues in function.")]
    TooManyUpvalues,
    #[error("Loop body too large.")]
    LoopBodyTooLarge,
    #[error("Too many arguments.")]
    TooManyArguments,
}
