//! Append-only `(display name, module path)` ↔ code dictionary

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashMap;

use super::CodeGenerator;

/// Dictionary key: `(display name, module path)`; the module path is empty
/// when the frame has none.
pub type SymbolKey = (String, String);

/// Bijection between symbol keys and compact codes.
///
/// Entries are never removed. Assignment order is kept so the reverse mapping
/// serialises in the order codes were handed out.
#[derive(Debug, Default)]
pub struct SymbolDictionary {
    generator: CodeGenerator,
    codes: HashMap<SymbolKey, String>,
    /// `(code, key)` in assignment order
    entries: Vec<(String, SymbolKey)>,
}

impl SymbolDictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Code for `(name, module)`, assigning a fresh one on first sight.
    pub fn code_for(&mut self, name: &str, module: &str) -> String {
        let key = (name.to_string(), module.to_string());
        if let Some(code) = self.codes.get(&key) {
            return code.clone();
        }

        let code = self.generator.next_code();
        self.entries.push((code.clone(), key.clone()));
        self.codes.insert(key, code.clone());
        code
    }

    /// Number of distinct symbols seen so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Code → key mapping, serialisable as `{"<code>": ["<name>", "<module>"], ...}`.
    #[must_use]
    pub fn reverse_mapping(&self) -> ReverseMapping<'_> {
        ReverseMapping { entries: &self.entries }
    }
}

/// Borrowed view of a [`SymbolDictionary`] in code-assignment order.
#[derive(Debug, Clone, Copy)]
pub struct ReverseMapping<'a> {
    entries: &'a [(String, SymbolKey)],
}

impl<'a> ReverseMapping<'a> {
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a SymbolKey)> {
        self.entries.iter().map(|(code, key)| (code.as_str(), key))
    }

    #[must_use]
    pub fn get(&self, code: &str) -> Option<&'a SymbolKey> {
        self.entries.iter().find(|(c, _)| c == code).map(|(_, key)| key)
    }
}

impl Serialize for ReverseMapping<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (code, key) in self.entries {
            map.serialize_entry(code, key)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_for_is_idempotent() {
        let mut dict = SymbolDictionary::new();

        let foo = dict.code_for("foo", "/usr/lib/libc.so.6");
        let bar = dict.code_for("bar", "");
        assert_ne!(foo, bar);
        assert_eq!(dict.code_for("foo", "/usr/lib/libc.so.6"), foo);
        assert_eq!(dict.code_for("bar", ""), bar);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_same_name_different_module_gets_new_code() {
        let mut dict = SymbolDictionary::new();

        let a = dict.code_for("foo", "/a");
        let b = dict.code_for("foo", "/b");
        assert_ne!(a, b);
    }

    #[test]
    fn test_reverse_mapping_inverts_code_for() {
        let mut dict = SymbolDictionary::new();
        let pairs = [("a", "x"), ("b", ""), ("a", "x"), ("c", "y"), ("b", "")];

        let codes: Vec<String> = pairs.iter().map(|(n, m)| dict.code_for(n, m)).collect();

        let reverse = dict.reverse_mapping();
        for ((name, module), code) in pairs.iter().zip(&codes) {
            let key = reverse.get(code).unwrap();
            assert_eq!((key.0.as_str(), key.1.as_str()), (*name, *module));
        }
        assert_eq!(reverse.iter().count(), 3);
    }

    #[test]
    fn test_reverse_mapping_serialises_in_assignment_order() {
        let mut dict = SymbolDictionary::new();
        dict.code_for("first", "/bin/a");
        dict.code_for("(cut)", "");

        let json = serde_json::to_string(&dict.reverse_mapping()).unwrap();
        assert_eq!(json, r#"{" ":["first","/bin/a"],"!":["(cut)",""]}"#);
    }
}
