use regex::Regex;

/// A grammar attribute value. Attribute consumers request a specific type and
/// silently ignore values of any other type.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    Str(String),
    Int(i32),
    Bool(bool),
}

impl AttrValue {
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            AttrValue::Str(ref value) => Some(value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match *self {
            AttrValue::Int(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            AttrValue::Bool(value) => Some(value),
            _ => None,
        }
    }
}

struct AttrEntry {
    name: String,
    pattern: Option<Regex>,
    value: AttrValue,
}

/// An ordered attribute bag attached to a rule or to the grammar root.
///
/// Entries may be qualified by a regex pattern, in which case they only apply
/// when the pattern matches the lookup target (a rule name, a sub-expression
/// function name, or an emitted class name, depending on the attribute).
/// Qualified entries are always preferred over unqualified ones.
pub struct Attrs {
    entries: Vec<AttrEntry>,
}

impl Attrs {
    pub fn new() -> Attrs {
        Attrs {
            entries: Vec::new(),
        }
    }

    pub fn insert(&mut self, name: &str, value: AttrValue) {
        self.entries.push(AttrEntry {
            name: name.to_string(),
            pattern: None,
            value,
        });
    }

    /// Inserts an entry qualified by `pattern`, anchored to match the whole
    /// lookup target. An unparsable pattern is dropped.
    pub fn insert_scoped(&mut self, name: &str, pattern: &str, value: AttrValue) {
        match Regex::new(&format!("^(?:{})$", pattern)) {
            Ok(regex) => self.entries.push(AttrEntry {
                name: name.to_string(),
                pattern: Some(regex),
                value,
            }),
            Err(err) => warn!("ignoring attribute '{}' with bad pattern: {}", name, err),
        }
    }

    /// Resolves `name` against `target`: pattern-qualified entries matching
    /// the target win over unqualified ones; within each class the earliest
    /// declaration wins. Qualified entries never match without a target.
    pub fn lookup(&self, name: &str, target: Option<&str>) -> Option<&AttrValue> {
        if let Some(target) = target {
            for entry in &self.entries {
                if entry.name != name {
                    continue;
                }
                if let Some(ref pattern) = entry.pattern {
                    if pattern.is_match(target) {
                        return Some(&entry.value);
                    }
                }
            }
        }

        self.entries
            .iter()
            .find(|entry| entry.name == name && entry.pattern.is_none())
            .map(|entry| &entry.value)
    }

    /// Reverse lookup for token aliasing: finds the name of the first
    /// unqualified entry whose string value equals `value`.
    pub fn find_name_by_value(&self, value: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.pattern.is_none() && entry.value.as_str() == Some(value))
            .map(|entry| &entry.name[..])
    }
}
