// File: src/interpreter/iterator.rs
//
// The reset/next protocol behind the foreach form. Iteration state is
// snapshotted at reset time, which keeps hash ordering stable for the
// duration of a single loop and lets file handles drain line by line.

use super::value::Value;

pub enum ValueIter {
    Array { elements: Vec<Value>, pos: usize },
    Hash { pairs: Vec<(Value, Value)>, pos: usize },
    Str { chars: Vec<char>, pos: usize },
    File { lines: Vec<String>, pos: usize },
}

impl ValueIter {
    /// Builds an iterator over the value, or None when the value does
    /// not support iteration.
    pub fn from_value(value: &Value) -> Option<ValueIter> {
        match value {
            Value::Array { elements, .. } => {
                Some(ValueIter::Array { elements: elements.borrow().clone(), pos: 0 })
            }
            Value::Hash(store) => {
                let pairs = store
                    .borrow()
                    .values()
                    .map(|pair| (pair.key.clone(), pair.value.clone()))
                    .collect();
                Some(ValueIter::Hash { pairs, pos: 0 })
            }
            Value::Str(s) => Some(ValueIter::Str { chars: s.chars().collect(), pos: 0 }),
            Value::File(file) => {
                Some(ValueIter::File { lines: file.borrow_mut().remaining_lines(), pos: 0 })
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        match self {
            ValueIter::Array { pos, .. }
            | ValueIter::Hash { pos, .. }
            | ValueIter::Str { pos, .. }
            | ValueIter::File { pos, .. } => *pos = 0,
        }
    }

    /// Yields `(element, index)` pairs; hashes yield `(value, key)`.
    pub fn next(&mut self) -> Option<(Value, Value)> {
        match self {
            ValueIter::Array { elements, pos } => {
                let element = elements.get(*pos)?.clone();
                let index = Value::Int(*pos as i64);
                *pos += 1;
                Some((element, index))
            }
            ValueIter::Hash { pairs, pos } => {
                let (key, value) = pairs.get(*pos)?.clone();
                *pos += 1;
                Some((value, key))
            }
            ValueIter::Str { chars, pos } => {
                let c = chars.get(*pos)?;
                let element = Value::str(c.to_string());
                let index = Value::Int(*pos as i64);
                *pos += 1;
                Some((element, index))
            }
            ValueIter::File { lines, pos } => {
                let line = lines.get(*pos)?.clone();
                let index = Value::Int(*pos as i64);
                *pos += 1;
                Some((Value::str(line), index))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ValueIter;
    use crate::interpreter::Value;

    #[test]
    fn test_array_iteration_yields_element_and_index() {
        let arr = Value::array(vec![Value::Int(10), Value::Int(20)]);
        let mut iter = ValueIter::from_value(&arr).unwrap();
        iter.reset();
        assert!(matches!(iter.next(), Some((Value::Int(10), Value::Int(0)))));
        assert!(matches!(iter.next(), Some((Value::Int(20), Value::Int(1)))));
        assert!(iter.next().is_none());
    }

    #[test]
    fn test_string_iteration_is_by_rune() {
        let s = Value::str("héllo");
        let mut iter = ValueIter::from_value(&s).unwrap();
        let mut count = 0;
        while iter.next().is_some() {
            count += 1;
        }
        assert_eq!(count, 5);
    }

    #[test]
    fn test_hash_iteration_yields_value_then_key() {
        let hash = Value::hash_of(vec![("a", Value::Int(1))]);
        let mut iter = ValueIter::from_value(&hash).unwrap();
        match iter.next() {
            Some((Value::Int(1), Value::Str(key))) => assert_eq!(key.as_ref(), "a"),
            other => panic!("unexpected iteration result: {:?}", other),
        }
    }

    #[test]
    fn test_non_iterable_values() {
        assert!(ValueIter::from_value(&Value::Int(1)).is_none());
        assert!(ValueIter::from_value(&Value::Null).is_none());
    }
}
