//! Core expression evaluation engine.
//!
//! [`evaluate`] walks an AST node in a lexical [`Environment`] and produces
//! a value. Atoms other than symbols evaluate to themselves, symbols are
//! looked up, and list forms are classified by their head: special form,
//! math operator, or function application (see `forms` for the closed
//! form set). All argument evaluation is strict and left-to-right; only
//! `quote`, `if`, and `cond` suppress evaluation of a sub-expression.
//!
//! Environments are single flat frames with shared ownership. `extend`
//! copies every binding of the parent into a fresh frame, so child scopes
//! never alias parent storage; cloning an `Environment` value shares the
//! frame, which is how closures capture their defining scope.

use crate::Error;
use crate::ast::Value;
use crate::forms::{Arity, MathOp, SpecialForm};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A lexical scope: one flat frame of symbol bindings.
///
/// Cloning shares the frame (closures capture their defining environment
/// this way); [`Environment::extend`] copies it. There is no parent
/// pointer: extension flattens every ancestor binding into the new frame,
/// so lookup never chains.
#[derive(Clone, Default)]
pub struct Environment {
    bindings: Rc<RefCell<HashMap<String, Value>>>,
}

impl Environment {
    /// Create an empty frame. The host builds the global environment with
    /// this once per session and passes it to every top-level `evaluate`.
    pub fn new() -> Self {
        Environment::default()
    }

    /// Look up a symbol in this frame.
    pub fn lookup(&self, symbol: &str) -> Result<Value, Error> {
        self.bindings
            .borrow()
            .get(symbol)
            .cloned()
            .ok_or_else(|| Error::UnboundSymbol(symbol.to_owned()))
    }

    /// Bind a symbol in this frame. Bindings are single assignment:
    /// re-defining a symbol that already exists in the same frame fails.
    ///
    /// Returns the `symbol = value` confirmation echoed by a top-level
    /// REPL.
    pub fn define(&self, symbol: &str, value: Value) -> Result<Value, Error> {
        let mut bindings = self.bindings.borrow_mut();
        if bindings.contains_key(symbol) {
            return Err(Error::AlreadyDefined(symbol.to_owned()));
        }
        let echo = format!("{symbol} = {value}");
        bindings.insert(symbol.to_owned(), value);
        Ok(Value::String(echo))
    }

    /// Create a new frame holding a copy of this frame's bindings
    /// overridden by `bindings`. This frame is unaffected, and later
    /// definitions here are invisible to the new frame.
    pub fn extend(&self, bindings: impl IntoIterator<Item = (String, Value)>) -> Environment {
        let mut copied = self.bindings.borrow().clone();
        for (name, value) in bindings {
            copied.insert(name, value);
        }
        Environment {
            bindings: Rc::new(RefCell::new(copied)),
        }
    }

    /// All bindings in this frame as (name, value) pairs sorted by name.
    pub fn all_bindings(&self) -> Vec<(String, Value)> {
        let mut result: Vec<_> = self
            .bindings
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        result.sort_by(|a, b| a.0.cmp(&b.0));
        result
    }
}

// A frame can reach itself through a closure it holds, so Debug must not
// descend into the bindings.
impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#<environment/{}>", self.bindings.borrow().len())
    }
}

/// A user-defined function: parameter names, body expression, and the
/// environment captured when `lambda` or `defn` executed. Immutable after
/// construction.
#[derive(Clone)]
pub struct Closure {
    pub(crate) params: Vec<String>,
    pub(crate) body: Box<Value>,
    pub(crate) env: Environment,
}

impl Closure {
    pub fn new(params: Vec<String>, body: Value, env: Environment) -> Self {
        Closure {
            params,
            body: Box::new(body),
            env,
        }
    }

    /// Number of parameters this closure expects.
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Evaluate an AST node in the given environment.
pub fn evaluate(node: &Value, env: &Environment) -> Result<Value, Error> {
    match node {
        // Self-evaluating atoms. Closures appear here when an
        // already-resolved value is re-evaluated during application.
        Value::Integer(_) | Value::Boolean(_) | Value::String(_) | Value::Closure(_) => {
            Ok(node.clone())
        }

        // Symbol reference
        Value::Symbol(name) => env.lookup(name),

        // List forms: special form, math, or application
        Value::List(elements) => eval_form(elements, env),
    }
}

/// Classify a list form by its head and route it to the matching rule.
fn eval_form(elements: &[Value], env: &Environment) -> Result<Value, Error> {
    let [head, args @ ..] = elements else {
        return Err(Error::EmptyCall);
    };

    match head {
        Value::Symbol(name) => {
            if let Some(form) = SpecialForm::from_name(name) {
                eval_special_form(form, elements, env)
            } else if let Some(op) = MathOp::from_name(name) {
                eval_math(op, elements, env)
            } else {
                // A plain symbol head must name a callable value.
                apply(env.lookup(name)?, args, env)
            }
        }

        // Already-resolved closure in head position
        Value::Closure(closure) => apply_closure(closure, args, env),

        // A nested form expected to evaluate to a closure
        Value::List(_) => apply(evaluate(head, env)?, args, env),

        // Self-evaluating atoms are never callable
        _ => Err(Error::NotCallable(head.to_string())),
    }
}

/// Dispatch a special form. The match is exhaustive over the closed form
/// set, so adding a form without a handler fails to compile.
fn eval_special_form(
    form: SpecialForm,
    elements: &[Value],
    env: &Environment,
) -> Result<Value, Error> {
    form.arity().validate(form.name(), elements.len())?;
    let args = &elements[1..];

    match form {
        SpecialForm::Quote => Ok(args[0].clone()),
        SpecialForm::Atom => Ok(Value::Boolean(evaluate(&args[0], env)?.is_atom())),
        SpecialForm::Eq => eval_eq(args, env),
        SpecialForm::If => eval_if(args, env),
        SpecialForm::Define => eval_define(args, env),
        SpecialForm::Lambda => eval_lambda(args, env),
        SpecialForm::Defn => eval_defn(args, env),
        SpecialForm::Cons => eval_cons(args, env),
        SpecialForm::Head => eval_head(args, env),
        SpecialForm::Tail => eval_tail(args, env),
        SpecialForm::Empty => eval_empty(args, env),
        SpecialForm::Cond => eval_cond(args, env),
        SpecialForm::Let => eval_let(args, env),
    }
}

/// Evaluate a math form: operator plus exactly two integer operands.
fn eval_math(op: MathOp, elements: &[Value], env: &Environment) -> Result<Value, Error> {
    // Math forms share the whole-form arity convention of special forms.
    Arity::Exact(3).validate(op.name(), elements.len())?;
    let lhs = evaluate(&elements[1], env)?;
    let rhs = evaluate(&elements[2], env)?;
    op.apply(&lhs, &rhs)
}

/// Any value other than boolean false passes a condition.
fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Boolean(false))
}

/// eq: true iff both evaluated operands are atoms and equal by value.
/// Compound values (lists, closures) are never eq, even to themselves.
fn eval_eq(args: &[Value], env: &Environment) -> Result<Value, Error> {
    let lhs = evaluate(&args[0], env)?;
    let rhs = evaluate(&args[1], env)?;
    Ok(Value::Boolean(lhs.is_atom() && rhs.is_atom() && lhs == rhs))
}

/// if: evaluate the condition, then exactly one branch. The untaken
/// branch is never evaluated.
fn eval_if(args: &[Value], env: &Environment) -> Result<Value, Error> {
    if is_truthy(&evaluate(&args[0], env)?) {
        evaluate(&args[1], env)
    } else {
        evaluate(&args[2], env)
    }
}

/// define: bind a symbol to an evaluated value in the current frame.
fn eval_define(args: &[Value], env: &Environment) -> Result<Value, Error> {
    let Value::Symbol(name) = &args[0] else {
        return Err(Error::Type(format!(
            "define requires a symbol, got {}",
            args[0]
        )));
    };
    let value = evaluate(&args[1], env)?;
    env.define(name, value)
}

/// lambda: build a closure over the current environment.
fn eval_lambda(args: &[Value], env: &Environment) -> Result<Value, Error> {
    Ok(Value::Closure(build_closure(&args[0], &args[1], env)?))
}

/// defn: sugar for binding a symbol to a newly built closure.
fn eval_defn(args: &[Value], env: &Environment) -> Result<Value, Error> {
    let Value::Symbol(name) = &args[0] else {
        return Err(Error::Type(format!(
            "defn requires a symbol, got {}",
            args[0]
        )));
    };
    let closure = build_closure(&args[1], &args[2], env)?;
    env.define(name, Value::Closure(closure))
}

/// Shared by `lambda` and `defn`: validate the parameter list and capture
/// the defining environment by shared ownership, shadowing included.
fn build_closure(params_node: &Value, body: &Value, env: &Environment) -> Result<Closure, Error> {
    let Value::List(param_nodes) = params_node else {
        return Err(Error::Type(format!(
            "lambda parameters must be a list, got {params_node}"
        )));
    };

    let mut params = Vec::with_capacity(param_nodes.len());
    for node in param_nodes {
        let Value::Symbol(name) = node else {
            return Err(Error::Type(format!(
                "lambda parameters must be symbols, got {node}"
            )));
        };
        // A duplicate parameter would bind one symbol twice in the call frame.
        if params.contains(name) {
            return Err(Error::AlreadyDefined(name.clone()));
        }
        params.push(name.clone());
    }

    Ok(Closure::new(params, body.clone(), env.clone()))
}

/// cons: string concatenation when both operands are strings, otherwise
/// prepend onto a list.
fn eval_cons(args: &[Value], env: &Environment) -> Result<Value, Error> {
    let item = evaluate(&args[0], env)?;
    let collection = evaluate(&args[1], env)?;
    match (item, collection) {
        (Value::String(first), Value::String(rest)) => Ok(Value::String(first + &rest)),
        (item, Value::List(rest)) => {
            let mut list = Vec::with_capacity(rest.len() + 1);
            list.push(item);
            list.extend(rest);
            Ok(Value::List(list))
        }
        (_, other) => Err(Error::Type(format!(
            "cons requires a list as second operand, got {other}"
        ))),
    }
}

/// head: first element of a list, or first character of a string.
fn eval_head(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match evaluate(&args[0], env)? {
        Value::String(s) => match s.chars().next() {
            Some(first) => Ok(Value::String(first.to_string())),
            None => Err(Error::EmptyCollection("head".to_owned())),
        },
        Value::List(items) => items
            .first()
            .cloned()
            .ok_or_else(|| Error::EmptyCollection("head".to_owned())),
        other => Err(Error::Type(format!(
            "head requires a list or string, got {other}"
        ))),
    }
}

/// tail: everything but the first element/character. Returns a new value,
/// the operand is untouched.
fn eval_tail(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match evaluate(&args[0], env)? {
        Value::String(s) => {
            let mut chars = s.chars();
            if chars.next().is_none() {
                return Err(Error::EmptyCollection("tail".to_owned()));
            }
            Ok(Value::String(chars.as_str().to_owned()))
        }
        Value::List(items) => {
            if items.is_empty() {
                return Err(Error::EmptyCollection("tail".to_owned()));
            }
            Ok(Value::List(items[1..].to_vec()))
        }
        other => Err(Error::Type(format!(
            "tail requires a list or string, got {other}"
        ))),
    }
}

/// empty: whether the evaluated string/list has zero length.
fn eval_empty(args: &[Value], env: &Environment) -> Result<Value, Error> {
    match evaluate(&args[0], env)? {
        Value::String(s) => Ok(Value::Boolean(s.is_empty())),
        Value::List(items) => Ok(Value::Boolean(items.is_empty())),
        other => Err(Error::Type(format!(
            "empty requires a list or string, got {other}"
        ))),
    }
}

/// cond: evaluate predicates in order, return the body of the first
/// truthy one. Falls through to #f when no predicate is truthy.
fn eval_cond(clauses: &[Value], env: &Environment) -> Result<Value, Error> {
    for clause in clauses {
        let pair = match clause {
            Value::List(pair) if pair.len() == 2 => pair,
            other => {
                return Err(Error::Type(format!(
                    "cond clause must be a (predicate expression) pair, got {other}"
                )));
            }
        };
        if is_truthy(&evaluate(&pair[0], env)?) {
            return evaluate(&pair[1], env);
        }
    }
    Ok(Value::Boolean(false))
}

/// let: bind (symbol expression) pairs sequentially, each binding visible
/// to the next expression, then evaluate the body in the extended frame.
fn eval_let(args: &[Value], env: &Environment) -> Result<Value, Error> {
    let Value::List(bindings) = &args[0] else {
        return Err(Error::Type(format!(
            "let bindings must be a list, got {}",
            args[0]
        )));
    };

    let mut scope = env.clone();
    for binding in bindings {
        let pair = match binding {
            Value::List(pair) if pair.len() == 2 => pair,
            other => {
                return Err(Error::Type(format!(
                    "let binding must be a (symbol expression) pair, got {other}"
                )));
            }
        };
        let Value::Symbol(name) = &pair[0] else {
            return Err(Error::Type(format!("let binds symbols, got {}", pair[0])));
        };
        // Each binding extends into a fresh frame, so later bindings may
        // shadow earlier ones.
        let value = evaluate(&pair[1], &scope)?;
        scope = scope.extend([(name.clone(), value)]);
    }

    evaluate(&args[1], &scope)
}

/// Require the callee to be a closure and apply it.
fn apply(callee: Value, args: &[Value], env: &Environment) -> Result<Value, Error> {
    match callee {
        Value::Closure(closure) => apply_closure(&closure, args, env),
        other => Err(Error::NotCallable(other.to_string())),
    }
}

/// Closure application: evaluate every argument expression left-to-right
/// in the CALLER's environment, check the count against the parameter
/// list, then evaluate the body in the closure's captured environment
/// extended with the parameter bindings. The caller's environment has no
/// further effect on the body.
fn apply_closure(closure: &Closure, args: &[Value], env: &Environment) -> Result<Value, Error> {
    let mut evaluated = Vec::with_capacity(args.len());
    for arg in args {
        evaluated.push(evaluate(arg, env)?);
    }

    if evaluated.len() != closure.arity() {
        return Err(Error::arity(
            format!("#<closure/{}>", closure.arity()),
            closure.arity(),
            evaluated.len(),
        ));
    }

    let call_env = closure
        .env
        .extend(closure.params.iter().cloned().zip(evaluated));
    evaluate(&closure.body, &call_env)
}

#[cfg(test)]
mod environment_tests {
    use super::*;
    use crate::ast::{sym, val};

    #[test]
    fn test_lookup_and_define() {
        let env = Environment::new();
        assert_eq!(
            env.lookup("x"),
            Err(Error::UnboundSymbol("x".to_owned()))
        );

        let echo = env.define("x", val(10)).unwrap();
        assert_eq!(echo, val("x = 10"));
        assert_eq!(env.lookup("x"), Ok(val(10)));

        // Single assignment within one frame
        assert_eq!(
            env.define("x", val(20)),
            Err(Error::AlreadyDefined("x".to_owned()))
        );
        assert_eq!(env.lookup("x"), Ok(val(10)));
    }

    #[test]
    fn test_extend_shadows_without_touching_parent() {
        let parent = Environment::new();
        parent.define("a", val(1)).unwrap();
        parent.define("b", val(2)).unwrap();

        let child = parent.extend([("b".to_owned(), val(99)), ("c".to_owned(), val(3))]);

        // Child sees every ancestor binding plus the overrides
        assert_eq!(child.lookup("a"), Ok(val(1)));
        assert_eq!(child.lookup("b"), Ok(val(99)));
        assert_eq!(child.lookup("c"), Ok(val(3)));

        // Parent is unaffected
        assert_eq!(parent.lookup("b"), Ok(val(2)));
        assert!(parent.lookup("c").is_err());

        // Flattening copies inherited names into the new frame, so they
        // count as already defined there; shadowing requires extend
        let grandchild = child.extend([]);
        assert!(grandchild.define("a", val(42)).is_err());
    }

    #[test]
    fn test_extend_copies_rather_than_aliases() {
        let parent = Environment::new();
        parent.define("x", val(1)).unwrap();

        let child = parent.extend([]);

        // Definitions made in the parent after extension are invisible to
        // the child, and vice versa: the frames share no storage.
        parent.define("late", val(7)).unwrap();
        assert!(child.lookup("late").is_err());

        child.define("own", val(8)).unwrap();
        assert!(parent.lookup("own").is_err());
    }

    #[test]
    fn test_clone_shares_the_frame() {
        // Closure capture relies on clone sharing: definitions added to the
        // frame after capture are visible through the captured handle.
        let env = Environment::new();
        let captured = env.clone();
        env.define("later", val(1)).unwrap();
        assert_eq!(captured.lookup("later"), Ok(val(1)));
    }

    #[test]
    fn test_all_bindings_sorted() {
        let env = Environment::new();
        env.define("zebra", val(1)).unwrap();
        env.define("apple", sym("a")).unwrap();

        let names: Vec<_> = env
            .all_bindings()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(names, vec!["apple".to_owned(), "zebra".to_owned()]);
    }
}
