//! Host type names projected into a tree of script tables.
use crate::error::BindError;
use hostlua_types::TypeDescription;
use hostlua_value::{ScriptKey, ScriptValue, TableHeap, TableId, TableKind};
use std::collections::HashMap;

#[derive(Debug)]
pub struct NamespaceTree {
    root: TableId,
    by_type: HashMap<TypeDescription, TableId>,
}

/// `Ns.Sub`, then enclosing class names, then the type's own name.
fn segments(ty: &TypeDescription) -> Vec<String> {
    let def = ty.definition();
    def.namespace
        .split('.')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .chain(def.enclosing.iter().cloned())
        .chain(std::iter::once(def.name.clone()))
        .collect()
}

impl NamespaceTree {
    pub fn new(heap: &mut TableHeap) -> Self {
        Self {
            root: heap.create(TableKind::Namespace(String::new())),
            by_type: HashMap::new(),
        }
    }

    pub fn root(&self) -> TableId {
        self.root
    }

    /// Class table of `ty`, creating it and every missing ancestor table.
    /// A namespace table already sitting at the leaf keeps its entries.
    pub fn ensure_path(&mut self, heap: &mut TableHeap, ty: &TypeDescription) -> Result<TableId, BindError> {
        if let Some(id) = self.by_type.get(ty) {
            return Ok(*id);
        }
        let segments = segments(ty);
        let Some((leaf, parents)) = segments.split_last() else {
            return Err(BindError::MissingClassTable(ty.to_string()));
        };

        let mut current = self.root;
        let mut path = String::new();
        for segment in parents {
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(segment);
            current = match heap.raw_get(current, &ScriptKey::from(segment.as_str())) {
                ScriptValue::Table(id) => id,
                ScriptValue::Nil => {
                    let id = heap.create(TableKind::Namespace(path.clone()));
                    heap.raw_set(current, segment.as_str().into(), ScriptValue::Table(id));
                    id
                }
                _ => {
                    return Err(BindError::NamespaceConflict {
                        path,
                        type_name: ty.to_string(),
                    })
                }
            };
        }

        let key = ScriptKey::from(leaf.as_str());
        let id = match heap.raw_get(current, &key) {
            ScriptValue::Table(existing) => match heap.kind(existing) {
                Some(TableKind::Class(other)) if other == ty => existing,
                Some(TableKind::Namespace(_)) => {
                    let id = heap.create(TableKind::Class(ty.clone()));
                    let entries: Vec<_> = heap
                        .get(existing)
                        .map(|t| t.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        .unwrap_or_default();
                    for (k, v) in entries {
                        heap.raw_set(id, k, v);
                    }
                    heap.raw_set(current, key, ScriptValue::Table(id));
                    id
                }
                _ => {
                    return Err(BindError::NamespaceConflict {
                        path: ty.full_name(),
                        type_name: ty.to_string(),
                    })
                }
            },
            ScriptValue::Nil => {
                let id = heap.create(TableKind::Class(ty.clone()));
                heap.raw_set(current, key, ScriptValue::Table(id));
                id
            }
            _ => {
                return Err(BindError::NamespaceConflict {
                    path: ty.full_name(),
                    type_name: ty.to_string(),
                })
            }
        };
        self.by_type.insert(ty.clone(), id);
        Ok(id)
    }

    pub fn load(&self, ty: &TypeDescription) -> Option<TableId> {
        self.by_type.get(ty).copied()
    }

    /// Walks a dotted path from the root without creating anything.
    pub fn lookup(&self, heap: &TableHeap, path: &str) -> ScriptValue {
        let mut current = ScriptValue::Table(self.root);
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            let ScriptValue::Table(id) = current else {
                return ScriptValue::Nil;
            };
            current = heap.raw_get(id, &segment.into());
        }
        current
    }

    /// Forgets the flat entry for `ty`; the path tables stay in place.
    pub fn forget(&mut self, ty: &TypeDescription) -> Option<TableId> {
        self.by_type.remove(ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlua_types::TypeRegistry;

    #[test]
    fn test_ensure_path_is_idempotent() {
        let registry = TypeRegistry::new();
        let mut heap = TableHeap::new();
        let mut tree = NamespaceTree::new(&mut heap);
        let ty = registry.class_builder("Game.World", "Map").build();
        let a = tree.ensure_path(&mut heap, &ty).unwrap();
        let tables = heap.len();
        let b = tree.ensure_path(&mut heap, &ty).unwrap();
        assert_eq!(a, b);
        assert_eq!(heap.len(), tables);
        assert_eq!(tree.lookup(&heap, "Game.World.Map"), ScriptValue::Table(a));
        assert_eq!(
            heap.kind(tree.lookup(&heap, "Game").as_table().unwrap()),
            Some(&TableKind::Namespace("Game".into()))
        );
    }

    #[test]
    fn test_nested_type_lives_under_its_outer_class() {
        let registry = TypeRegistry::new();
        let mut heap = TableHeap::new();
        let mut tree = NamespaceTree::new(&mut heap);
        let outer = registry.class_builder("Game", "Grid").build();
        let inner = registry.class_builder("Game", "Cell").nested_in(&["Grid"]).build();
        let outer_id = tree.ensure_path(&mut heap, &outer).unwrap();
        let inner_id = tree.ensure_path(&mut heap, &inner).unwrap();
        assert_eq!(heap.raw_get(outer_id, &"Cell".into()), ScriptValue::Table(inner_id));
    }

    #[test]
    fn test_namespace_placeholder_merges_into_class_table() {
        let registry = TypeRegistry::new();
        let mut heap = TableHeap::new();
        let mut tree = NamespaceTree::new(&mut heap);
        let inner = registry.class_builder("Game", "Cell").nested_in(&["Grid"]).build();
        let outer = registry.class_builder("Game", "Grid").build();
        let inner_id = tree.ensure_path(&mut heap, &inner).unwrap();
        let outer_id = tree.ensure_path(&mut heap, &outer).unwrap();
        assert_eq!(heap.kind(outer_id), Some(&TableKind::Class(outer.clone())));
        assert_eq!(heap.raw_get(outer_id, &"Cell".into()), ScriptValue::Table(inner_id));
        assert_eq!(tree.lookup(&heap, "Game.Grid"), ScriptValue::Table(outer_id));
    }

    #[test]
    fn test_non_table_ancestor_is_a_conflict() {
        let registry = TypeRegistry::new();
        let mut heap = TableHeap::new();
        let mut tree = NamespaceTree::new(&mut heap);
        heap.raw_set(tree.root(), "Game".into(), ScriptValue::Integer(1));
        let ty = registry.class_builder("Game", "Map").build();
        assert!(matches!(
            tree.ensure_path(&mut heap, &ty),
            Err(BindError::NamespaceConflict { .. })
        ));
    }
}
