//! Token stream → Chunk, via single-pass precedence-climbing (Pratt)
//! parsing. Parses and emits bytecode in the same walk: there is no
//! intermediate AST.

use ember_core::error::LimitError;
use ember_core::object::FunctionObj;
use ember_core::{limits, Chunk, Heap, ObjRef, OpCode, Value};

use crate::class_compiler::ClassCompiler;
use crate::scanner::{Scanner, Token, TokenType};
use crate::CompileError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FunctionKind {
    Script,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq)]
enum Precedence {
    None,
    Assignment, // =
    Or,         // or
    And,        // and
    Equality,   // == !=
    Comparison, // < > <= >=
    Term,       // + -
    Factor,     // * /
    Unary,      // ! -
    Call,       // . ()
    Primary,
}

impl Precedence {
    fn next(self) -> Precedence {
        match self {
            Precedence::None => Precedence::Assignment,
            Precedence::Assignment => Precedence::Or,
            Precedence::Or => Precedence::And,
            Precedence::And => Precedence::Equality,
            Precedence::Equality => Precedence::Comparison,
            Precedence::Comparison => Precedence::Term,
            Precedence::Term => Precedence::Factor,
            Precedence::Factor => Precedence::Unary,
            Precedence::Unary => Precedence::Call,
            Precedence::Call => Precedence::Primary,
            Precedence::Primary => Precedence::Primary,
        }
    }
}

type ParseFn<'src, 'heap> = fn(&mut Compiler<'src, 'heap>, bool);

#[derive(Clone, Copy)]
struct ParseRule<'src, 'heap> {
    prefix: Option<ParseFn<'src, 'heap>>,
    infix: Option<ParseFn<'src, 'heap>>,
    precedence: Precedence,
}

const fn rule<'src, 'heap>(
    prefix: Option<ParseFn<'src, 'heap>>,
    infix: Option<ParseFn<'src, 'heap>>,
    precedence: Precedence,
) -> ParseRule<'src, 'heap> {
    ParseRule { prefix, infix, precedence }
}

fn get_rule<'src, 'heap>(kind: TokenType) -> ParseRule<'src, 'heap> {
    use Precedence as P;
    use TokenType as T;
    match kind {
        T::LeftParen => rule(
            Some(Compiler::grouping),
            Some(Compiler::call),
            P::Call,
        ),
        T::Dot => rule(None, Some(Compiler::dot), P::Call),
        T::Minus => rule(
            Some(Compiler::unary),
            Some(Compiler::binary),
            P::Term,
        ),
        T::Plus => rule(None, Some(Compiler::binary), P::Term),
        T::Slash => rule(None, Some(Compiler::binary), P::Factor),
        T::Star => rule(None, Some(Compiler::binary), P::Factor),
        T::Bang => rule(Some(Compiler::unary), None, P::None),
        T::BangEqual => rule(None, Some(Compiler::binary), P::Equality),
        T::EqualEqual => rule(None, Some(Compiler::binary), P::Equality),
        T::Greater | T::GreaterEqual | T::Less | T::LessEqual => {
            rule(None, Some(Compiler::binary), P::Comparison)
        }
        T::Identifier => rule(Some(Compiler::variable), None, P::None),
        T::StringLit => rule(Some(Compiler::string), None, P::None),
        T::Number => rule(Some(Compiler::number), None, P::None),
        T::And => rule(None, Some(Compiler::and_), P::And),
        T::Or => rule(None, Some(Compiler::or_), P::Or),
        T::False | T::True | T::Nil => rule(Some(Compiler::literal), None, P::None),
        T::This => rule(Some(Compiler::this_), None, P::None),
        T::Super => rule(Some(Compiler::super_), None, P::None),
        _ => rule(None, None, P::None),
    }
}

struct Local<'src> {
    name: &'src str,
    depth: i32,
    is_captured: bool,
}

#[derive(Clone, Copy)]
struct UpvalueDesc {
    index: u8,
    is_local: bool,
}

struct FunctionFrame<'src> {
    function: FunctionObj,
    kind: FunctionKind,
    locals: Vec<Local<'src>>,
    upvalues: Vec<UpvalueDesc>,
    scope_depth: i32,
}

impl<'src> FunctionFrame<'src> {
    fn new(kind: FunctionKind, name: Option<ObjRef>) -> Self {
        // Slot 0 is reserved: the receiver for methods, an unnameable
        // placeholder for plain functions and the top-level script.
        let receiver_name = if kind == FunctionKind::Method || kind == FunctionKind::Initializer {
            "this"
        } else {
            ""
        };
        FunctionFrame {
            function: FunctionObj::new(name),
            kind,
            locals: vec![Local { name: receiver_name, depth: 0, is_captured: false }],
            upvalues: Vec::new(),
            scope_depth: 0,
        }
    }
}

struct Parser<'src> {
    scanner: Scanner<'src>,
    current: Token<'src>,
    previous: Token<'src>,
    had_error: bool,
    panic_mode: bool,
}

pub(crate) struct Compiler<'src, 'heap> {
    parser: Parser<'src>,
    heap: &'heap mut Heap,
    frames: Vec<FunctionFrame<'src>>,
    classes: Vec<ClassCompiler>,
    errors: Vec<CompileError>,
}

impl<'src, 'heap> Compiler<'src, 'heap> {
    pub(crate) fn compile(source: &'src str, heap: &'heap mut Heap) -> Result<ObjRef, Vec<CompileError>> {
        tracing::trace!(bytes = source.len(), "compiling");
        // Both start out as an unread sentinel; the `advance()` call below
        // fills `current` with the first real (or error) token, same as
        // clox leaving `parser.current` uninitialized until the first
        // `advance()`.
        let sentinel = Token { kind: TokenType::Eof, lexeme: "", line: 0 };
        let parser = Parser {
            scanner: Scanner::new(source),
            current: sentinel,
            previous: sentinel,
            had_error: false,
            panic_mode: false,
        };
        let mut compiler = Compiler {
            parser,
            heap,
            frames: vec![FunctionFrame::new(FunctionKind::Script, None)],
            classes: Vec::new(),
            errors: Vec::new(),
        };
        compiler.advance();

        while !compiler.check(TokenType::Eof) {
            compiler.declaration();
        }
        compiler.consume(TokenType::Eof, "Expect end of expression.");

        let (function, upvalues) = compiler.end_compiler();
        debug_assert!(upvalues.is_empty(), "the top-level script never captures anything");

        if compiler.parser.had_error {
            tracing::debug!(count = compiler.errors.len(), "compile failed");
            Err(compiler.errors)
        } else {
            tracing::trace!("compile succeeded");
            Ok(compiler.heap.alloc_function(function))
        }
    }

    // ---- token plumbing ----

    fn advance(&mut self) {
        self.parser.previous = self.parser.current;
        loop {
            self.parser.current = self.parser.scanner.scan_token();
            if self.parser.current.kind != TokenType::Error {
                break;
            }
            let message = self.parser.current.lexeme.to_string();
            self.error_at_current(&message);
        }
    }

    fn check(&self, kind: TokenType) -> bool {
        self.parser.current.kind == kind
    }

    fn matches(&mut self, kind: TokenType) -> bool {
        if !self.check(kind) {
            return false;
        }
        self.advance();
        true
    }

    fn consume(&mut self, kind: TokenType, message: &str) {
        if self.parser.current.kind == kind {
            self.advance();
            return;
        }
        self.error_at_current(message);
    }

    fn error_at_current(&mut self, message: &str) {
        let token = self.parser.current;
        self.error_at(token, message);
    }

    fn error(&mut self, message: &str) {
        let token = self.parser.previous;
        self.error_at(token, message);
    }

    fn error_at(&mut self, token: Token<'src>, message: &str) {
        if self.parser.panic_mode {
            return;
        }
        self.parser.panic_mode = true;
        self.parser.had_error = true;
        let where_ = if token.kind == TokenType::Eof {
            " at end".to_string()
        } else if token.kind == TokenType::Error {
            String::new()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        tracing::debug!(line = token.line, %message, "compile error");
        self.errors.push(CompileError { line: token.line, message: format!("{where_}: {message}") });
    }

    fn synchronize(&mut self) {
        self.parser.panic_mode = false;
        while self.parser.current.kind != TokenType::Eof {
            if self.parser.previous.kind == TokenType::Semicolon {
                return;
            }
            match self.parser.current.kind {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => self.advance(),
            }
        }
    }

    // ---- bytecode emission ----

    fn current_frame(&mut self) -> &mut FunctionFrame<'src> {
        self.frames.last_mut().expect("at least the script frame is always present")
    }

    fn current_chunk(&mut self) -> &mut Chunk {
        &mut self.current_frame().function.chunk
    }

    fn emit_byte(&mut self, byte: u8) {
        let line = self.parser.previous.line as i32;
        self.current_chunk().write(byte, line);
    }

    fn emit_op(&mut self, op: OpCode) {
        self.emit_byte(op as u8);
    }

    fn emit_op_byte(&mut self, op: OpCode, byte: u8) {
        self.emit_op(op);
        self.emit_byte(byte);
    }

    fn emit_return(&mut self) {
        if self.current_frame().kind == FunctionKind::Initializer {
            self.emit_op_byte(OpCode::GetLocal, 0);
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.emit_op(OpCode::Return);
    }

    /// Adds `value` to the current chunk's constant pool without emitting
    /// `CONSTANT`; used by callers (like `CLOSURE`) that need the raw index.
    fn make_constant(&mut self, value: Value) -> u8 {
        match self.current_chunk().add_constant(value) {
            Ok(index) => index,
            Err(_) => {
                self.error(&LimitError::TooManyConstants.to_string());
                0
            }
        }
    }

    fn emit_constant(&mut self, value: Value) {
        let index = self.make_constant(value);
        self.emit_op_byte(OpCode::Constant, index);
    }

    fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        self.emit_byte(0xff);
        self.emit_byte(0xff);
        self.current_chunk().code.len() - 2
    }

    fn patch_jump(&mut self, offset: usize) {
        let jump = self.current_chunk().code.len() - offset - 2;
        if jump > u16::MAX as usize {
            self.error("Too much code to jump over.");
            return;
        }
        self.current_chunk().patch_jump_operand(offset, jump as u16);
    }

    fn emit_loop(&mut self, loop_start: usize) {
        self.emit_op(OpCode::Loop);
        let offset = self.current_chunk().code.len() - loop_start + 2;
        if offset > u16::MAX as usize {
            self.error(&LimitError::LoopBodyTooLarge.to_string());
        }
        let offset = offset as u16;
        self.emit_byte((offset >> 8) as u8);
        self.emit_byte((offset & 0xff) as u8);
    }

    fn end_compiler(&mut self) -> (FunctionObj, Vec<UpvalueDesc>) {
        self.emit_return();
        let frame = self.frames.pop().expect("matching push in compile()/function()");
        let mut function = frame.function;
        function.upvalue_count = frame.upvalues.len() as u16;
        (function, frame.upvalues)
    }

    // ---- scope & variable resolution ----

    fn begin_scope(&mut self) {
        self.current_frame().scope_depth += 1;
    }

    fn end_scope(&mut self) {
        self.current_frame().scope_depth -= 1;
        let depth = self.current_frame().scope_depth;
        loop {
            let frame = self.current_frame();
            let Some(local) = frame.locals.last() else { break };
            if local.depth <= depth {
                break;
            }
            let is_captured = local.is_captured;
            frame.locals.pop();
            if is_captured {
                self.emit_op(OpCode::CloseUpvalue);
            } else {
                self.emit_op(OpCode::Pop);
            }
        }
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        let handle = self.heap.intern_string(name);
        self.make_constant(Value::Obj(handle))
    }

    fn add_local(&mut self, name: &'src str) {
        if self.current_frame().locals.len() >= limits::LOCALS_MAX {
            self.error(&LimitError::TooManyLocals.to_string());
            return;
        }
        self.current_frame().locals.push(Local { name, depth: -1, is_captured: false });
    }

    fn declare_variable(&mut self, name: Token<'src>) {
        if self.current_frame().scope_depth == 0 {
            return;
        }
        let depth = self.current_frame().scope_depth;
        let mut duplicate = false;
        for local in self.current_frame().locals.iter().rev() {
            if local.depth != -1 && local.depth < depth {
                break;
            }
            if local.name == name.lexeme {
                duplicate = true;
                break;
            }
        }
        if duplicate {
            self.error("Already a variable with this name in this scope.");
            return;
        }
        self.add_local(name.lexeme);
    }

    fn parse_variable(&mut self, message: &str) -> u8 {
        self.consume(TokenType::Identifier, message);
        let name = self.parser.previous;
        self.declare_variable(name);
        if self.current_frame().scope_depth > 0 {
            return 0;
        }
        self.identifier_constant(name.lexeme)
    }

    fn mark_initialized(&mut self) {
        if self.current_frame().scope_depth == 0 {
            return;
        }
        let depth = self.current_frame().scope_depth;
        self.current_frame().locals.last_mut().unwrap().depth = depth;
    }

    fn define_variable(&mut self, global: u8) {
        if self.current_frame().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        self.emit_op_byte(OpCode::DefineGlobal, global);
    }

    fn resolve_local(&mut self, frame_index: usize, name: &str) -> Option<u8> {
        let mut found = None;
        for (i, local) in self.frames[frame_index].locals.iter().enumerate().rev() {
            if local.name == name {
                found = Some((i, local.depth));
                break;
            }
        }
        let (index, depth) = found?;
        if depth == -1 {
            self.error("Can't read local variable in its own initializer.");
        }
        Some(index as u8)
    }

    fn resolve_upvalue(&mut self, frame_index: usize, name: &str) -> Option<u8> {
        if frame_index == 0 {
            return None;
        }
        let enclosing = frame_index - 1;
        if let Some(local_index) = self.resolve_local(enclosing, name) {
            self.frames[enclosing].locals[local_index as usize].is_captured = true;
            return Some(self.add_upvalue(frame_index, local_index, true));
        }
        if let Some(upvalue_index) = self.resolve_upvalue(enclosing, name) {
            return Some(self.add_upvalue(frame_index, upvalue_index, false));
        }
        None
    }

    fn add_upvalue(&mut self, frame_index: usize, index: u8, is_local: bool) -> u8 {
        let existing = self.frames[frame_index]
            .upvalues
            .iter()
            .position(|u| u.index == index && u.is_local == is_local);
        if let Some(i) = existing {
            return i as u8;
        }
        if self.frames[frame_index].upvalues.len() >= limits::UPVALUES_MAX {
            self.error(&LimitError::TooManyUpvalues.to_string());
            return 0;
        }
        self.frames[frame_index].upvalues.push(UpvalueDesc { index, is_local });
        (self.frames[frame_index].upvalues.len() - 1) as u8
    }

    fn named_variable(&mut self, name: Token<'src>, can_assign: bool) {
        let frame_index = self.frames.len() - 1;
        let (get_op, set_op, arg) = if let Some(slot) = self.resolve_local(frame_index, name.lexeme)
        {
            (OpCode::GetLocal, OpCode::SetLocal, slot)
        } else if let Some(slot) = self.resolve_upvalue(frame_index, name.lexeme) {
            (OpCode::GetUpvalue, OpCode::SetUpvalue, slot)
        } else {
            let constant = self.identifier_constant(name.lexeme);
            (OpCode::GetGlobal, OpCode::SetGlobal, constant)
        };

        if can_assign && self.matches(TokenType::Equal) {
            self.expression();
            self.emit_op_byte(set_op, arg);
        } else {
            self.emit_op_byte(get_op, arg);
        }
    }

    // ---- declarations & statements ----

    fn declaration(&mut self) {
        if self.matches(TokenType::Class) {
            self.class_declaration();
        } else if self.matches(TokenType::Fun) {
            self.fun_declaration();
        } else if self.matches(TokenType::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }
        if self.parser.panic_mode {
            self.synchronize();
        }
    }

    fn class_declaration(&mut self) {
        self.consume(TokenType::Identifier, "Expect class name.");
        let class_name = self.parser.previous;
        let name_constant = self.identifier_constant(class_name.lexeme);
        self.declare_variable(class_name);

        self.emit_op_byte(OpCode::Class, name_constant);
        self.define_variable(name_constant);

        self.classes.push(ClassCompiler);

        self.named_variable(class_name, false);
        self.consume(TokenType::LeftBrace, "Expect '{' before class body.");
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.method();
        }
        self.consume(TokenType::RightBrace, "Expect '}' after class body.");
        self.emit_op(OpCode::Pop);

        self.classes.pop();
    }

    fn method(&mut self) {
        self.consume(TokenType::Identifier, "Expect method name.");
        let name = self.parser.previous.lexeme;
        let constant = self.identifier_constant(name);
        let kind = if name == "init" { FunctionKind::Initializer } else { FunctionKind::Method };
        self.function(kind);
        self.emit_op_byte(OpCode::Method, constant);
    }

    fn fun_declaration(&mut self) {
        let global = self.parse_variable("Expect function name.");
        self.mark_initialized();
        self.function(FunctionKind::Function);
        self.define_variable(global);
    }

    fn function(&mut self, kind: FunctionKind) {
        let name = self.heap.intern_string(self.parser.previous.lexeme);
        self.frames.push(FunctionFrame::new(kind, Some(name)));
        // Gives parameters and top-level body locals scope_depth 1 instead
        // of 0, so `define_variable` treats them as locals rather than
        // globals; the frame (and this scope bump) is simply discarded
        // when `end_compiler` pops it, with no matching `end_scope`.
        self.begin_scope();

        self.consume(TokenType::LeftParen, "Expect '(' after function name.");
        if !self.check(TokenType::RightParen) {
            loop {
                if self.current_frame().function.arity == u8::MAX {
                    self.error_at_current("Can't have more than 255 parameters.");
                } else {
                    self.current_frame().function.arity += 1;
                }
                let constant = self.parse_variable("Expect parameter name.");
                self.define_variable(constant);
                if !self.matches(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.");
        self.consume(TokenType::LeftBrace, "Expect '{' before function body.");
        self.block();

        let (function, upvalues) = self.end_compiler();
        let handle = self.heap.alloc_function(function);
        let const_index = self.make_constant(Value::Obj(handle));
        self.emit_op_byte(OpCode::Closure, const_index);
        for upvalue in upvalues {
            self.emit_byte(upvalue.is_local as u8);
            self.emit_byte(upvalue.index);
        }
    }

    fn var_declaration(&mut self) {
        let global = self.parse_variable("Expect variable name.");
        if self.matches(TokenType::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.");
        self.define_variable(global);
    }

    fn statement(&mut self) {
        if self.matches(TokenType::Print) {
            self.print_statement();
        } else if self.matches(TokenType::If) {
            self.if_statement();
        } else if self.matches(TokenType::Return) {
            self.return_statement();
        } else if self.matches(TokenType::While) {
            self.while_statement();
        } else if self.matches(TokenType::For) {
            self.for_statement();
        } else if self.matches(TokenType::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else {
            self.expression_statement();
        }
    }

    fn block(&mut self) {
        while !self.check(TokenType::RightBrace) && !self.check(TokenType::Eof) {
            self.declaration();
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.");
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after value.");
        self.emit_op(OpCode::Print);
    }

    fn return_statement(&mut self) {
        if self.current_frame().kind == FunctionKind::Script {
            self.error("Can't return from top-level code.");
        }
        if self.matches(TokenType::Semicolon) {
            self.emit_return();
        } else {
            if self.current_frame().kind == FunctionKind::Initializer {
                self.error("Can't return a value from an initializer.");
            }
            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after return value.");
            self.emit_op(OpCode::Return);
        }
    }

    fn if_statement(&mut self) {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let then_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();

        let else_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(then_jump);
        self.emit_op(OpCode::Pop);

        if self.matches(TokenType::Else) {
            self.statement();
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self) {
        let loop_start = self.current_chunk().code.len();
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.");
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after condition.");

        let exit_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_loop(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.");

        if self.matches(TokenType::Semicolon) {
            // no initializer
        } else if self.matches(TokenType::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.current_chunk().code.len();
        let mut exit_jump = None;
        if !self.matches(TokenType::Semicolon) {
            self.expression();
            self.consume(TokenType::Semicolon, "Expect ';' after loop condition.");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        if !self.matches(TokenType::RightParen) {
            let body_jump = self.emit_jump(OpCode::Jump);
            let increment_start = self.current_chunk().code.len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenType::RightParen, "Expect ')' after for clauses.");

            self.emit_loop(loop_start);
            loop_start = increment_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_loop(loop_start);

        if let Some(exit_jump) = exit_jump {
            self.patch_jump(exit_jump);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenType::Semicolon, "Expect ';' after expression.");
        self.emit_op(OpCode::Pop);
    }

    fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let Some(prefix_rule) = get_rule(self.parser.previous.kind).prefix else {
            self.error("Expect expression.");
            return;
        };
        let can_assign = precedence <= Precedence::Assignment;
        prefix_rule(self, can_assign);

        while precedence <= get_rule(self.parser.current.kind).precedence {
            self.advance();
            let infix_rule =
                get_rule(self.parser.previous.kind).infix.expect("precedence table is consistent");
            infix_rule(self, can_assign);
        }

        if can_assign && self.matches(TokenType::Equal) {
            self.error("Invalid assignment target.");
        }
    }

    // ---- parse rules (prefix / infix) ----

    fn grouping(&mut self, _can_assign: bool) {
        self.expression();
        self.consume(TokenType::RightParen, "Expect ')' after expression.");
    }

    fn unary(&mut self, _can_assign: bool) {
        let operator = self.parser.previous.kind;
        self.parse_precedence(Precedence::Unary);
        match operator {
            TokenType::Bang => self.emit_op(OpCode::Not),
            TokenType::Minus => self.emit_op(OpCode::Negate),
            _ => unreachable!("unary only dispatches on ! and -"),
        }
    }

    fn binary(&mut self, _can_assign: bool) {
        let operator = self.parser.previous.kind;
        let rule = get_rule(operator);
        self.parse_precedence(rule.precedence.next());
        match operator {
            TokenType::BangEqual => {
                self.emit_op(OpCode::Equal);
                self.emit_op(OpCode::Not);
            }
            TokenType::EqualEqual => self.emit_op(OpCode::Equal),
            TokenType::Greater => self.emit_op(OpCode::Greater),
            TokenType::GreaterEqual => {
                self.emit_op(OpCode::Less);
                self.emit_op(OpCode::Not);
            }
            TokenType::Less => self.emit_op(OpCode::Less),
            TokenType::LessEqual => {
                self.emit_op(OpCode::Greater);
                self.emit_op(OpCode::Not);
            }
            TokenType::Plus => self.emit_op(OpCode::Add),
            TokenType::Minus => self.emit_op(OpCode::Subtract),
            TokenType::Star => self.emit_op(OpCode::Multiply),
            TokenType::Slash => self.emit_op(OpCode::Divide),
            _ => unreachable!("binary only dispatches on the operators listed above"),
        }
    }

    fn call(&mut self, _can_assign: bool) {
        let arg_count = self.argument_list();
        self.emit_op_byte(OpCode::Call, arg_count);
    }

    fn dot(&mut self, can_assign: bool) {
        self.consume(TokenType::Identifier, "Expect property name after '.'.");
        let name = self.identifier_constant(self.parser.previous.lexeme);

        if can_assign && self.matches(TokenType::Equal) {
            self.expression();
            self.emit_op_byte(OpCode::SetProperty, name);
        } else if self.matches(TokenType::LeftParen) {
            let arg_count = self.argument_list();
            self.emit_op(OpCode::Invoke);
            self.emit_byte(name);
            self.emit_byte(arg_count);
        } else {
            self.emit_op_byte(OpCode::GetProperty, name);
        }
    }

    fn argument_list(&mut self) -> u8 {
        let mut count: u32 = 0;
        if !self.check(TokenType::RightParen) {
            loop {
                self.expression();
                if count == u8::MAX as u32 {
                    self.error(&LimitError::TooManyArguments.to_string());
                }
                count += 1;
                if !self.matches(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after arguments.");
        count as u8
    }

    fn number(&mut self, _can_assign: bool) {
        let value: f64 = self.parser.previous.lexeme.parse().expect("scanner only emits digits");
        self.emit_constant(Value::Number(value));
    }

    fn string(&mut self, _can_assign: bool) {
        let lexeme = self.parser.previous.lexeme;
        let contents = &lexeme[1..lexeme.len() - 1];
        let handle = self.heap.intern_string(contents);
        self.emit_constant(Value::Obj(handle));
    }

    fn literal(&mut self, _can_assign: bool) {
        match self.parser.previous.kind {
            TokenType::False => self.emit_op(OpCode::False),
            TokenType::True => self.emit_op(OpCode::True),
            TokenType::Nil => self.emit_op(OpCode::Nil),
            _ => unreachable!("literal only dispatches on false/true/nil"),
        }
    }

    fn variable(&mut self, can_assign: bool) {
        let name = self.parser.previous;
        self.named_variable(name, can_assign);
    }

    fn this_(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'this' outside of a class.");
            return;
        }
        let this_token = self.parser.previous;
        self.named_variable(this_token, false);
    }

    fn super_(&mut self, _can_assign: bool) {
        if self.classes.is_empty() {
            self.error("Can't use 'super' outside of a class.");
        } else {
            self.error("Can't use 'super' in a class with no superclass.");
        }
    }

    fn and_(&mut self, _can_assign: bool) {
        let end_jump = self.emit_jump(OpCode::JumpIfFalse);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::And);
        self.patch_jump(end_jump);
    }

    fn or_(&mut self, _can_assign: bool) {
        let else_jump = self.emit_jump(OpCode::JumpIfFalse);
        let end_jump = self.emit_jump(OpCode::Jump);
        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);
        self.parse_precedence(Precedence::Or);
        self.patch_jump(end_jump);
    }
}
