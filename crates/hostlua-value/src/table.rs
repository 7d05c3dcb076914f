use crate::{ScriptKey, ScriptValue, TableId};
use hostlua_types::TypeDescription;
use std::collections::HashMap;

/// What a table stands for; decides how a raw miss is handled.
#[derive(Debug, Clone, PartialEq)]
pub enum TableKind {
    Plain,
    /// Intermediate node of the host namespace tree, carrying its dotted prefix.
    Namespace(String),
    /// Static table of a host type.
    Class(TypeDescription),
}

#[derive(Debug, Clone)]
pub struct ScriptTable {
    pub kind: TableKind,
    entries: HashMap<ScriptKey, ScriptValue>,
}

impl ScriptTable {
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    pub fn raw_get(&self, key: &ScriptKey) -> Option<&ScriptValue> {
        self.entries.get(key)
    }

    /// Assigning nil removes the entry.
    pub fn raw_set(&mut self, key: ScriptKey, value: ScriptValue) {
        if value.is_nil() {
            self.entries.remove(&key);
        } else {
            self.entries.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScriptKey, &ScriptValue)> {
        self.entries.iter()
    }
}

/// Table arena of one scripting context.
#[derive(Debug, Default)]
pub struct TableHeap {
    tables: Vec<ScriptTable>,
}

impl TableHeap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self, kind: TableKind) -> TableId {
        let id = TableId::new(self.tables.len() as u32);
        self.tables.push(ScriptTable::new(kind));
        id
    }

    pub fn get(&self, id: TableId) -> Option<&ScriptTable> {
        self.tables.get(id.index())
    }

    pub fn get_mut(&mut self, id: TableId) -> Option<&mut ScriptTable> {
        self.tables.get_mut(id.index())
    }

    pub fn raw_get(&self, id: TableId, key: &ScriptKey) -> ScriptValue {
        self.get(id)
            .and_then(|t| t.raw_get(key))
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `false` for an unknown table.
    pub fn raw_set(&mut self, id: TableId, key: ScriptKey, value: ScriptValue) -> bool {
        match self.get_mut(id) {
            Some(t) => {
                t.raw_set(key, value);
                true
            }
            None => false,
        }
    }

    pub fn kind(&self, id: TableId) -> Option<&TableKind> {
        self.get(id).map(|t| &t.kind)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_set_nil_removes_entry() {
        let mut heap = TableHeap::new();
        let t = heap.create(TableKind::Plain);
        heap.raw_set(t, "a".into(), ScriptValue::Integer(1));
        assert_eq!(heap.raw_get(t, &"a".into()), ScriptValue::Integer(1));
        heap.raw_set(t, "a".into(), ScriptValue::Nil);
        assert_eq!(heap.get(t).map(|t| t.len()), Some(0));
    }

    #[test]
    fn test_unknown_table_reads_nil() {
        let heap = TableHeap::new();
        assert_eq!(heap.raw_get(TableId::new(7), &"x".into()), ScriptValue::Nil);
    }
}
