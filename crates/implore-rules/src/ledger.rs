//! Append-only store of named values

use crate::config::LookupOrder;
use crate::value::TypedValue;

/// Ordered record of every value seeded into or produced by a process.
///
/// Names are not unique. [`Ledger::get`] resolves duplicates according to
/// the configured [`LookupOrder`].
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    entries: Vec<TypedValue>,
    lookup: LookupOrder,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookup(lookup: LookupOrder) -> Self {
        Self {
            entries: Vec::new(),
            lookup,
        }
    }

    pub fn lookup(&self) -> LookupOrder {
        self.lookup
    }

    pub fn set_lookup(&mut self, lookup: LookupOrder) {
        self.lookup = lookup;
    }

    pub fn push(&mut self, entry: TypedValue) {
        self.entries.push(entry);
    }

    pub fn get(&self, name: &str) -> Option<&TypedValue> {
        match self.lookup {
            LookupOrder::FirstMatch => self.entries.iter().find(|e| e.name == name),
            LookupOrder::LastMatch => self.entries.iter().rev().find(|e| e.name == name),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|e| e.name == name)
    }

    /// Entry names in append order, repeats included
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[TypedValue] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypedValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Payload;

    fn ledger(lookup: LookupOrder) -> Ledger {
        let mut ledger = Ledger::with_lookup(lookup);
        ledger.push(TypedValue::new("x", Payload::Number(1.0)));
        ledger.push(TypedValue::new("y", Payload::Number(2.0)));
        ledger.push(TypedValue::new("x", Payload::Number(3.0)));
        ledger
    }

    #[test]
    fn first_match_returns_earliest() {
        let ledger = ledger(LookupOrder::FirstMatch);
        assert_eq!(ledger.get("x").unwrap().value, Payload::Number(1.0));
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn last_match_returns_latest() {
        let ledger = ledger(LookupOrder::LastMatch);
        assert_eq!(ledger.get("x").unwrap().value, Payload::Number(3.0));
        assert!(ledger.get("z").is_none());
    }

    #[test]
    fn names_keep_append_order() {
        let ledger = ledger(LookupOrder::FirstMatch);
        assert_eq!(ledger.names().collect::<Vec<_>>(), vec!["x", "y", "x"]);
    }

    #[test]
    fn clear_empties() {
        let mut ledger = ledger(LookupOrder::FirstMatch);
        ledger.clear();
        assert!(ledger.is_empty());
        assert!(!ledger.contains("x"));
    }
}
