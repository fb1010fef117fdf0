//! Canned results outside expectation bookkeeping.
//!
//! Each method name carries at most one binding kind at a time. Registering a
//! different kind for the same name replaces whatever was there.

use crate::value::Value;
use std::collections::HashMap;

/// Round-robin sequence of canned values, each repeated `count` times
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RotatingQueue {
    entries: Vec<(Value, usize)>,
    cursor: usize,
}

impl RotatingQueue {
    fn push(&mut self, value: Value, count: usize) {
        if count > 0 {
            self.entries.push((value, count));
        }
    }

    fn period(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    fn next(&mut self) -> Value {
        let period = self.period();
        if period == 0 {
            return Value::Null;
        }
        let mut pos = self.cursor % period;
        self.cursor += 1;
        for (value, count) in &self.entries {
            if pos < *count {
                return value.clone();
            }
            pos -= count;
        }
        Value::Null
    }

    /// Number of answers handed out so far
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }
}

/// One method's canned-answer binding
#[derive(Debug, Clone, PartialEq)]
pub enum StubBinding {
    /// Same value on every call
    Fixed(Value),
    /// Values handed out in round-robin order
    Rotating(RotatingQueue),
    /// Values keyed by the exact argument tuple
    Keyed(Vec<(Vec<Value>, Value)>),
}

impl StubBinding {
    fn answer(&mut self, args: &[Value]) -> Value {
        match self {
            Self::Fixed(value) => value.clone(),
            Self::Rotating(queue) => queue.next(),
            Self::Keyed(table) => table
                .iter()
                .find(|(key, _)| key.as_slice() == args)
                .map(|(_, value)| value.clone())
                .unwrap_or_default(),
        }
    }
}

/// Stub bindings keyed by method name
#[derive(Debug, Default)]
pub struct StubTable {
    bindings: HashMap<String, StubBinding>,
}

impl StubTable {
    /// Bind a fixed value, discarding any other binding for `method`
    pub fn set_fixed(&mut self, method: &str, value: Value) {
        self.bindings
            .insert(method.to_string(), StubBinding::Fixed(value));
    }

    /// Append `value` (repeated `count` times) to `method`'s rotating queue
    pub fn push_in_order(&mut self, method: &str, value: Value, count: usize) {
        let binding = self
            .bindings
            .entry(method.to_string())
            .or_insert_with(|| StubBinding::Rotating(RotatingQueue::default()));
        if !matches!(binding, StubBinding::Rotating(_)) {
            *binding = StubBinding::Rotating(RotatingQueue::default());
        }
        if let StubBinding::Rotating(queue) = binding {
            queue.push(value, count);
        }
    }

    /// Bind `value` to the exact argument tuple `key`
    pub fn set_for_params(&mut self, method: &str, key: Vec<Value>, value: Value) {
        let binding = self
            .bindings
            .entry(method.to_string())
            .or_insert_with(|| StubBinding::Keyed(Vec::new()));
        if !matches!(binding, StubBinding::Keyed(_)) {
            *binding = StubBinding::Keyed(Vec::new());
        }
        if let StubBinding::Keyed(table) = binding {
            match table.iter_mut().find(|(existing, _)| *existing == key) {
                Some(entry) => entry.1 = value,
                None => table.push((key, value)),
            }
        }
    }

    /// Whether `method` has any binding
    #[must_use]
    pub fn contains(&self, method: &str) -> bool {
        self.bindings.contains_key(method)
    }

    /// The binding registered for `method`
    #[must_use]
    pub fn binding(&self, method: &str) -> Option<&StubBinding> {
        self.bindings.get(method)
    }

    /// Answer a call, or `None` when `method` has no binding.
    ///
    /// A keyed binding that misses answers `Some(Value::Null)`.
    pub fn answer(&mut self, method: &str, args: &[Value]) -> Option<Value> {
        self.bindings
            .get_mut(method)
            .map(|binding| binding.answer(args))
    }
}
