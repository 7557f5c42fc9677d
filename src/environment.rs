use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{NoxError, Result};
use crate::value::Value;

/// One frame of the lexical scope chain. Children hold a strong link to
/// their enclosing frame; the globals frame has none.
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Value>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Value) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.values.get(name) {
            Ok(value.clone())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow().get(name, line)
        } else {
            Err(NoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), value);
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(NoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// Read a binding exactly `distance` frames out. `None` means the
    /// resolver's static picture and the runtime chain disagree, which the
    /// caller reports as an undefined variable.
    pub fn get_at(
        environment: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
    ) -> Option<Value> {
        Self::ancestor(environment, distance)
            .and_then(|frame| frame.borrow().values.get(name).cloned())
    }

    /// Write a binding exactly `distance` frames out. Returns whether the
    /// binding existed.
    pub fn assign_at(
        environment: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
    ) -> bool {
        match Self::ancestor(environment, distance) {
            Some(frame) => {
                let mut frame = frame.borrow_mut();

                if frame.values.contains_key(name) {
                    frame.values.insert(name.to_string(), value);
                    true
                } else {
                    false
                }
            }

            None => false,
        }
    }

    fn ancestor(
        environment: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current: Rc<RefCell<Environment>> = Rc::clone(environment);

        for _ in 0..distance {
            let enclosing = current.borrow().enclosing.clone()?;
            current = enclosing;
        }

        Some(current)
    }
}
