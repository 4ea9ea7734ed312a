//! Lisplet - a minimal Lisp-family language.
//!
//! This crate provides a tree-walking evaluator for a small, untyped,
//! dynamically evaluated Lisp. The language has integers, booleans,
//! symbols, strings, immutable lists, and lexically scoped closures:
//!
//! ```lisp
//! (define x 10)
//! (if (> x 5) "big" "small")        ; conditionals
//! (defn double (n) (* n 2))         ; named functions
//! (cons 1 (quote (2 3)))            ; list construction
//! (let ((a 1) (b (+ a 1))) (+ a b)) ; sequential local bindings
//! ```
//!
//! ## Evaluation model
//!
//! Evaluation is strict and left-to-right. Only `quote`, `if`, and `cond`
//! suppress evaluation of a sub-expression. Environments are single
//! assignment: defining a symbol twice in the same frame is an error, and
//! shadowing happens only by extending into a new frame (function
//! parameters and `let` bindings). Extension copies the parent frame, so
//! a child scope never aliases its parent's storage.
//!
//! Closures capture their defining frame by shared ownership. A function
//! defined with `defn` therefore sees its own name once the definition
//! completes, which is what makes recursion work.
//!
//! ## Limitations
//!
//! There is no tail-call elimination: evaluation depth equals AST nesting
//! depth plus call depth, so deeply recursive user programs exhaust the
//! host call stack. There are also no timeouts - a non-terminating user
//! program loops until the process is killed.
//!
//! ## Modules
//!
//! - `ast`: the `Value` type shared by AST nodes and runtime values
//! - `forms`: the closed enumeration of special forms and math operators
//! - `evaluator`: environments, closures, and the evaluation engine
//! - `reader`: S-expression parsing from text (feature `reader`)

use std::fmt;

/// Maximum parsing depth to prevent stack overflow on deeply nested input.
/// This is a reader-only guard; the evaluator itself has no depth limit.
pub const MAX_PARSE_DEPTH: usize = 64;

/// Categorizes the different kinds of parsing errors.
#[derive(Debug, PartialEq, Clone)]
pub enum ParseErrorKind {
    /// Invalid or unexpected syntax (bad tokens, malformed expressions)
    InvalidSyntax,
    /// Input ended before the expression was complete (EOF, unterminated string, unclosed parens)
    Incomplete,
    /// Expression nesting exceeded the maximum parse depth
    TooDeeplyNested,
    /// Extra input found after a complete, valid expression
    TrailingContent,
}

/// A structured error providing detailed information about a parsing failure.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, context: Option<String>) -> Self {
        ParseError {
            kind,
            message: message.into(),
            context,
        }
    }

    /// Create a simple ParseError with a kind and message but no context
    pub fn from_message(kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None)
    }

    /// Create a ParseError with context extracted from input at a given offset
    pub fn with_context(
        kind: ParseErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        // Show some context before the error position as well
        let context_start = error_offset.saturating_sub(20);

        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.len() < input.len() {
            display_context.push_str("[...]");
        }

        // Replace newlines with visible markers for better error display
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context))
    }
}

/// Error types for the interpreter.
///
/// Every failure is raised synchronously and propagated with `?` to the
/// nearest caller that chooses to handle it; nothing inside the evaluator
/// ever swallows an error. The REPL (or a test harness) is the only layer
/// that catches and displays these.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Reader-level failure; never produced by the evaluator
    Parse(ParseError),
    /// Lookup of a name with no binding in the frame
    UnboundSymbol(String),
    /// Redefinition attempt in the same frame
    AlreadyDefined(String),
    /// Special form or closure invoked with the wrong argument count.
    /// Counts are whole-form lengths for special forms and parameter
    /// counts for closures.
    Arity {
        form: String,
        expected: usize,
        got: usize,
    },
    /// Wrong value kind for math, collection access, or a definition target
    Type(String),
    /// `head`/`tail` on an empty list or string; carries the form name
    EmptyCollection(String),
    /// Attempted application of a value that is not a closure
    NotCallable(String),
    /// Evaluation of the empty form `()`
    EmptyCall,
}

impl Error {
    /// Create an arity error for the named form
    pub fn arity(form: impl Into<String>, expected: usize, got: usize) -> Self {
        Error::Arity {
            form: form.into(),
            expected,
            got,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(e) => {
                write!(f, "Parse error: {}", e.message)?;
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::UnboundSymbol(name) => write!(f, "Unbound symbol: {name}"),
            Error::AlreadyDefined(name) => write!(f, "Symbol already defined: {name}"),
            Error::Arity {
                form,
                expected,
                got,
            } => write!(
                f,
                "Wrong number of arguments to {form}: expected {expected}, got {got}"
            ),
            Error::Type(msg) => write!(f, "Type error: {msg}"),
            Error::EmptyCollection(form) => {
                write!(f, "Cannot take {form} of an empty collection")
            }
            Error::NotCallable(value) => write!(f, "Not a function: {value}"),
            Error::EmptyCall => write!(f, "Cannot evaluate an empty call ()"),
        }
    }
}

pub mod ast;
pub mod evaluator;
pub mod forms;

#[cfg(feature = "reader")]
pub mod reader;
