use crate::{registry::CoreTypes, TypeDescription};

/// Base-type chain of a type, derived to root, excluding the type itself.
pub struct Ancestors {
    next: Option<TypeDescription>,
}

impl Iterator for Ancestors {
    type Item = TypeDescription;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        self.next = current.base().cloned();
        Some(current)
    }
}

pub fn ancestors(ty: &TypeDescription) -> Ancestors {
    Ancestors {
        next: ty.base().cloned(),
    }
}

pub struct TypeComparer<'a> {
    core: &'a CoreTypes,
}

impl<'a> TypeComparer<'a> {
    pub fn new(core: &'a CoreTypes) -> Self {
        Self { core }
    }

    pub fn is_same_or_subclass(&self, ty: &TypeDescription, of: &TypeDescription) -> bool {
        ty == of || ancestors(ty).any(|a| &a == of)
    }

    /// Whether a value whose runtime type is `from` can be stored in a slot of type `to`.
    pub fn is_assignable(&self, from: &TypeDescription, to: &TypeDescription) -> bool {
        if to == &self.core.object || self.is_same_or_subclass(from, to) {
            return true;
        }
        if to.is_interface() {
            let implements = |t: &TypeDescription| t.definition().interfaces.iter().any(|i| i == to);
            if implements(from) || ancestors(from).any(|a| implements(&a)) {
                return true;
            }
        }
        match (from.element_type(), to.element_type()) {
            (Some(fe), Some(te)) => !fe.is_value_type() && self.is_assignable(fe, te),
            _ => false,
        }
    }

    /// Whether `to` can hold a value of `from`'s type, i.e. `to.IsAssignableFrom(from)`.
    pub fn accepts(&self, to: &TypeDescription, from: &TypeDescription) -> bool {
        self.is_assignable(from, to)
    }
}
