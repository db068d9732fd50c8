//! Tracks whether the compiler is currently inside a class body, so `this`
//! can be resolved (or rejected) without threading an extra flag through
//! every statement-compiling function.

/// Pushed on entry to a `class` declaration, popped on exit. A dedicated
/// stack (rather than a single flag) because nothing stops nested
/// declarations syntactically, and because a unit marker type is easier to
/// grow than a lone `bool` if `this` resolution ever needs per-class state.
pub struct ClassCompiler;
