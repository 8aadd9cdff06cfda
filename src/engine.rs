//! Reference engine: a small ECMAScript-subset interpreter.
//!
//! The engine keeps a single global scope for its whole life. Every call to
//! [`Evaluator::evaluate`] parses one snippet and runs it as global code, so
//! later snippets see the bindings earlier ones made. A snippet that does not
//! parse throws a `SyntaxError` object rather than failing on the Rust side.

pub mod ast;
pub mod interp;
pub mod parser;
pub mod scope;

use tracing::{debug, trace};

use crate::runner::{Evaluator, Outcome};
use crate::value::{ErrorKind, NativeFunction, ObjectKind, ObjectRef, Value};
use interp::{EvaluationContext, Throw};
use scope::Scope;

pub struct Engine {
    scope: Scope,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine whose global scope holds the built-ins.
    pub fn new() -> Self {
        let mut scope = Scope::new();
        scope.assign("undefined", Value::Undefined);
        scope.assign("NaN", Value::Number(f64::NAN));
        scope.assign("Infinity", Value::Number(f64::INFINITY));
        for kind in ErrorKind::ALL {
            let constructor = ObjectRef::new(ObjectKind::ErrorConstructor(kind));
            scope.assign(kind.name(), Value::Object(constructor));
        }
        for native in NativeFunction::ALL {
            scope.assign(native.name(), Value::Object(ObjectRef::new(ObjectKind::Native(native))));
        }
        Self { scope }
    }

    /// Reads a global binding.
    pub fn global(&self, name: &str) -> Option<Value> {
        self.scope.lookup(name)
    }

    /// Binds a global, replacing any earlier binding of the same name.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.scope.assign(name, value);
    }

    pub fn global_names(&self) -> Vec<String> {
        self.scope.global_names()
    }
}

impl Evaluator for Engine {
    fn evaluate(&mut self, source: &str) -> Outcome {
        let program = match parser::parse_program(source) {
            Ok(program) => program,
            Err(error) => {
                debug!(source, %error, "snippet did not parse");
                let Throw(thrown) = interp::error(ErrorKind::SyntaxError, error.to_string());
                return Outcome::Threw(thrown);
            }
        };
        trace!(source, statements = program.len(), "evaluating snippet");
        match EvaluationContext::new(&mut self.scope).run(&program) {
            Ok(value) => Outcome::Completed(value),
            Err(Throw(thrown)) => Outcome::Threw(thrown),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(engine: &mut Engine, source: &str) -> Value {
        match engine.evaluate(source) {
            Outcome::Completed(value) => value,
            Outcome::Threw(thrown) => panic!("`{source}` threw {thrown}"),
        }
    }

    #[test]
    fn bindings_persist_between_snippets() {
        let mut engine = Engine::new();
        assert!(completed(&mut engine, "i = 3; i++").strict_equals(&Value::from(3)));
        assert!(completed(&mut engine, "i").strict_equals(&Value::from(4)));
        assert!(engine.global("i").is_some());
    }

    #[test]
    fn parse_failures_throw_syntax_errors() {
        let mut engine = Engine::new();
        let Outcome::Threw(thrown) = engine.evaluate("var = ;") else {
            panic!("expected a throw");
        };
        let error = thrown.as_object().and_then(ObjectRef::error_kind);
        assert_eq!(error, Some(ErrorKind::SyntaxError));
    }

    #[test]
    fn builtins_are_installed() {
        let mut engine = Engine::new();
        assert!(completed(&mut engine, "typeof RangeError").strict_equals(&Value::from("function")));
        assert!(completed(&mut engine, "isNaN(NaN)").strict_equals(&Value::from(true)));
        assert!(completed(&mut engine, "String(Infinity)").strict_equals(&Value::from("Infinity")));
        assert!(engine.global_names().contains(&"URIError".to_string()));
    }

    #[test]
    fn embedders_can_define_globals() {
        let mut engine = Engine::new();
        engine.define_global("answer", Value::from(42));
        assert!(completed(&mut engine, "answer + 1").strict_equals(&Value::from(43)));
    }
}
