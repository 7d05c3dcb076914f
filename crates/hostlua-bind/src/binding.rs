//! Per-type dispatch tables.
use crate::{config::BindingMode, lazy::LazyMemberKind};
use hostlua_types::TypeDescription;
use hostlua_value::{CallableHandle, TableId};
use std::collections::HashMap;

/// Script metamethods backed by host operator methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metamethod {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Unm,
    Eq,
    Lt,
    Le,
    BitAnd,
    BitOr,
    BitXor,
    BitNot,
    Shl,
    Shr,
}

impl Metamethod {
    pub fn from_operator_method(name: &str) -> Option<Self> {
        use Metamethod::*;
        Some(match name {
            "op_Addition" => Add,
            "op_Subtraction" => Sub,
            "op_Multiply" => Mul,
            "op_Division" => Div,
            "op_Modulus" => Mod,
            "op_UnaryNegation" => Unm,
            "op_Equality" => Eq,
            "op_LessThan" => Lt,
            "op_LessThanOrEqual" => Le,
            "op_BitwiseAnd" => BitAnd,
            "op_BitwiseOr" => BitOr,
            "op_ExclusiveOr" => BitXor,
            "op_OnesComplement" => BitNot,
            "op_LeftShift" => Shl,
            "op_RightShift" => Shr,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        use Metamethod::*;
        match self {
            Add => "__add",
            Sub => "__sub",
            Mul => "__mul",
            Div => "__div",
            Mod => "__mod",
            Unm => "__unm",
            Eq => "__eq",
            Lt => "__lt",
            Le => "__le",
            BitAnd => "__band",
            BitOr => "__bor",
            BitXor => "__bxor",
            BitNot => "__bnot",
            Shl => "__shl",
            Shr => "__shr",
        }
    }

    pub fn is_unary(self) -> bool {
        matches!(self, Metamethod::Unm | Metamethod::BitNot)
    }
}

/// A dispatch table slot. Lazily bound members start `Unbound` and hold the
/// stub that generates them; the transition to `Bound` happens once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberSlot {
    Bound(CallableHandle),
    Unbound(CallableHandle),
}

impl MemberSlot {
    /// What a lookup hands to the scripting runtime.
    pub fn callable(self) -> CallableHandle {
        match self {
            MemberSlot::Bound(h) | MemberSlot::Unbound(h) => h,
        }
    }

    pub fn is_bound(self) -> bool {
        matches!(self, MemberSlot::Bound(_))
    }
}

/// Which of the six member tables a member lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberTable {
    Methods,
    Getters,
    Setters,
    ClassMethods,
    ClassGetters,
    ClassSetters,
}

impl MemberTable {
    pub fn for_member(kind: LazyMemberKind, is_static: bool) -> Self {
        use LazyMemberKind::*;
        match (kind, is_static) {
            (Method | Event, false) => MemberTable::Methods,
            (Method | Event, true) => MemberTable::ClassMethods,
            (FieldGet | PropertyGet, false) => MemberTable::Getters,
            (FieldGet | PropertyGet, true) => MemberTable::ClassGetters,
            (FieldSet | PropertySet, false) => MemberTable::Setters,
            (FieldSet | PropertySet, true) => MemberTable::ClassSetters,
        }
    }
}

/// Dispatch tables of one host type within one context.
#[derive(Debug, Clone)]
pub struct TypeBinding {
    pub ty: TypeDescription,
    pub mode: BindingMode,
    pub methods: HashMap<String, MemberSlot>,
    pub getters: HashMap<String, MemberSlot>,
    pub setters: HashMap<String, MemberSlot>,
    pub class_methods: HashMap<String, MemberSlot>,
    pub class_getters: HashMap<String, MemberSlot>,
    pub class_setters: HashMap<String, MemberSlot>,
    pub operators: HashMap<Metamethod, CallableHandle>,
    pub item_getter: Option<CallableHandle>,
    pub item_setter: Option<CallableHandle>,
    pub constructor: Option<CallableHandle>,
    pub class_table: TableId,
    pub base: Option<TypeDescription>,
    /// Base chain from the direct base to the root, resolved at bind time.
    pub ancestors: Vec<TypeDescription>,
    /// Non-public members have been installed.
    pub private_accessible: bool,
}

impl TypeBinding {
    pub fn new(
        ty: &TypeDescription,
        mode: BindingMode,
        class_table: TableId,
        ancestors: Vec<TypeDescription>,
    ) -> Self {
        Self {
            ty: ty.clone(),
            mode,
            methods: HashMap::new(),
            getters: HashMap::new(),
            setters: HashMap::new(),
            class_methods: HashMap::new(),
            class_getters: HashMap::new(),
            class_setters: HashMap::new(),
            operators: HashMap::new(),
            item_getter: None,
            item_setter: None,
            constructor: None,
            class_table,
            base: ty.base().cloned(),
            ancestors,
            private_accessible: false,
        }
    }

    pub fn table(&self, table: MemberTable) -> &HashMap<String, MemberSlot> {
        match table {
            MemberTable::Methods => &self.methods,
            MemberTable::Getters => &self.getters,
            MemberTable::Setters => &self.setters,
            MemberTable::ClassMethods => &self.class_methods,
            MemberTable::ClassGetters => &self.class_getters,
            MemberTable::ClassSetters => &self.class_setters,
        }
    }

    pub fn table_mut(&mut self, table: MemberTable) -> &mut HashMap<String, MemberSlot> {
        match table {
            MemberTable::Methods => &mut self.methods,
            MemberTable::Getters => &mut self.getters,
            MemberTable::Setters => &mut self.setters,
            MemberTable::ClassMethods => &mut self.class_methods,
            MemberTable::ClassGetters => &mut self.class_getters,
            MemberTable::ClassSetters => &mut self.class_setters,
        }
    }

    pub fn slot(&self, table: MemberTable, name: &str) -> Option<MemberSlot> {
        self.table(table).get(name).copied()
    }

    /// Number of members still waiting for their first use.
    pub fn unbound_count(&self) -> usize {
        [
            &self.methods,
            &self.getters,
            &self.setters,
            &self.class_methods,
            &self.class_getters,
            &self.class_setters,
        ]
        .iter()
        .flat_map(|t| t.values())
        .filter(|s| !s.is_bound())
        .count()
    }
}
