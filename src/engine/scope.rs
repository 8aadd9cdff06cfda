//! Variable bindings.
//!
//! The global frame lives as long as the engine. `catch` parameters get a
//! frame of their own that is popped when the handler ends. `var` always
//! declares in the global frame: snippets run as global code.

use im::HashMap;

use crate::value::Value;

#[derive(Debug, Clone)]
pub struct Scope {
    frames: Vec<HashMap<String, Value>>,
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).cloned())
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains_key(name))
    }

    /// `var name`: binds `undefined` globally unless a global of that name
    /// already exists. Catch parameters do not count.
    pub fn declare(&mut self, name: &str) {
        if !self.global_mut().contains_key(name) {
            self.global_mut().insert(name.to_string(), Value::Undefined);
        }
    }

    /// Writes the innermost binding of `name`; an unbound name becomes a new
    /// global.
    pub fn assign(&mut self, name: &str, value: Value) {
        let frame = match self.frames.iter().rposition(|frame| frame.contains_key(name)) {
            Some(index) => &mut self.frames[index],
            None => self.global_mut(),
        };
        frame.insert(name.to_string(), value);
    }

    pub fn push_frame(&mut self, name: &str, value: Value) {
        let mut frame = HashMap::new();
        frame.insert(name.to_string(), value);
        self.frames.push(frame);
    }

    /// Drops the innermost frame. The global frame is never popped.
    pub fn pop_frame(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Global bindings, sorted by name.
    pub fn global_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.frames[0].keys().cloned().collect();
        names.sort();
        names
    }

    fn global_mut(&mut self) -> &mut HashMap<String, Value> {
        &mut self.frames[0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_creates_globals() {
        let mut scope = Scope::new();
        scope.assign("i", Value::from(3));
        assert!(scope.lookup("i").unwrap().strict_equals(&Value::from(3)));
        assert_eq!(scope.global_names(), vec!["i"]);
    }

    #[test]
    fn catch_frames_shadow_and_disappear() {
        let mut scope = Scope::new();
        scope.assign("e", Value::from("outer"));
        scope.push_frame("e", Value::from("inner"));
        scope.assign("e", Value::from("changed"));
        scope.assign("other", Value::from(1));
        assert!(scope.lookup("e").unwrap().strict_equals(&Value::from("changed")));
        scope.pop_frame();
        assert!(scope.lookup("e").unwrap().strict_equals(&Value::from("outer")));
        assert!(scope.is_declared("other"));
    }

    #[test]
    fn declare_keeps_existing_values() {
        let mut scope = Scope::new();
        scope.assign("c", Value::from(1));
        scope.declare("c");
        assert!(scope.lookup("c").unwrap().strict_equals(&Value::from(1)));
        scope.pop_frame();
        assert!(scope.is_declared("c"));
    }

    #[test]
    fn declare_inside_a_catch_frame_still_binds_a_global() {
        let mut scope = Scope::new();
        scope.push_frame("e", Value::from(0));
        scope.declare("e");
        assert!(scope.lookup("e").unwrap().strict_equals(&Value::from(0)));
        scope.pop_frame();
        assert!(matches!(scope.lookup("e"), Some(Value::Undefined)));
    }
}
