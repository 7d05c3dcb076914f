//! Per-scripting-context bridge state.
use crate::{
    binding::{MemberSlot, MemberTable, TypeBinding},
    callable::NativeFunction,
    config::{BindingMode, BridgeConfig},
    error::{BindError, ScriptError},
    extension::ExtensionMap,
    generator::{generate, generate_item_accessors, generate_operator, reflect},
    lazy::{LazyMember, LazyStub},
    metrics::BindingMetrics,
    namespace::NamespaceTree,
    overload::{CallShape, OverloadGroup},
    translator::ObjectTranslator,
    wrap::{ConstructorWrap, DelegateCtor, EnumCastFrom, HostFunction},
};
use hostlua_types::{
    comparer::ancestors, Delegate, HostValue, MemberAccess, MethodDescription, TypeDescription,
    TypeRegistry, Visibility,
};
use hostlua_value::{
    CallFrame, CallableHandle, ScriptKey, ScriptValue, TableHeap, TableId, ValueExchange,
};
use std::{collections::HashMap, sync::Arc};

/// Everything one scripting context knows about the host: the dispatch
/// tables of every bound type, the namespace tree, the identity cache and
/// the native callables handed out to script.
///
/// A context is isolated from every other context. It does no internal
/// locking; see [`SharedContext`](crate::sync::SharedContext).
pub struct BridgeContext {
    pub(crate) registry: Arc<TypeRegistry>,
    pub(crate) config: BridgeConfig,
    pub(crate) heap: TableHeap,
    pub(crate) namespaces: NamespaceTree,
    pub(crate) translator: ObjectTranslator,
    pub(crate) bindings: HashMap<TypeDescription, TypeBinding>,
    pub(crate) callables: Vec<Arc<NativeFunction>>,
    extensions: Option<Arc<ExtensionMap>>,
    pub(crate) metrics: Arc<BindingMetrics>,
}

fn skip_nested(ty: &TypeDescription) -> bool {
    let def = ty.definition();
    (ty.is_delegate() && !def.is_abstract) || def.is_generic_definition
}

impl BridgeContext {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self::with_config(registry, BridgeConfig::default())
    }

    pub fn with_config(registry: Arc<TypeRegistry>, config: BridgeConfig) -> Self {
        let metrics = Arc::new(BindingMetrics::new());
        let mut heap = TableHeap::new();
        let namespaces = NamespaceTree::new(&mut heap);
        Self {
            registry,
            config,
            heap,
            namespaces,
            translator: ObjectTranslator::new(metrics.clone()),
            bindings: HashMap::new(),
            callables: vec![],
            extensions: None,
            metrics,
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn heap(&self) -> &TableHeap {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut TableHeap {
        &mut self.heap
    }

    pub fn translator(&self) -> &ObjectTranslator {
        &self.translator
    }

    pub fn metrics(&self) -> &Arc<BindingMetrics> {
        &self.metrics
    }

    pub fn binding(&self, ty: &TypeDescription) -> Option<&TypeBinding> {
        self.bindings.get(ty)
    }

    pub fn is_bound(&self, ty: &TypeDescription) -> bool {
        self.bindings.contains_key(ty)
    }

    pub fn register_callable(&mut self, function: NativeFunction) -> Result<CallableHandle, BindError> {
        let index = u32::try_from(self.callables.len()).map_err(|_| BindError::CallableLimit)?;
        self.callables.push(Arc::new(function));
        Ok(CallableHandle::new(index))
    }

    /// Registers an embedder-supplied native function.
    pub fn register_function(
        &mut self,
        name: &str,
        body: impl Fn(&mut BridgeContext, &mut CallFrame) -> Result<(), ScriptError> + Send + Sync + 'static,
    ) -> Result<ScriptValue, BindError> {
        let handle = self.register_callable(
            HostFunction {
                name: name.to_string(),
                body: Arc::new(body),
            }
            .into(),
        )?;
        Ok(ScriptValue::Function(handle))
    }

    pub fn callable(&self, handle: CallableHandle) -> Option<Arc<NativeFunction>> {
        self.callables.get(handle.index()).cloned()
    }

    /// Number of native callables handed out so far.
    pub fn callable_count(&self) -> usize {
        self.callables.len()
    }

    /// Extension methods of every registered container, collected on first use.
    pub(crate) fn extension_map(&mut self) -> Option<Arc<ExtensionMap>> {
        if !self.config.merge_extension_methods {
            return None;
        }
        let registry = &self.registry;
        Some(
            self.extensions
                .get_or_insert_with(|| Arc::new(ExtensionMap::collect(registry)))
                .clone(),
        )
    }

    /// Binds `ty` with the context's configured access and mode. Binding an
    /// already bound type returns its existing class table.
    pub fn bind(&mut self, ty: &TypeDescription) -> Result<TableId, BindError> {
        self.bind_with(ty, self.config.member_access, self.config.binding_mode)
    }

    pub fn bind_with(
        &mut self,
        ty: &TypeDescription,
        access: MemberAccess,
        mode: BindingMode,
    ) -> Result<TableId, BindError> {
        if let Some(binding) = self.bindings.get(ty) {
            return Ok(binding.class_table);
        }
        if let Some(base) = ty.base() {
            self.bind_with(base, access, mode)?;
        }

        let class_table = self.namespaces.ensure_path(&mut self.heap, ty)?;
        self.bindings.insert(
            ty.clone(),
            TypeBinding::new(ty, mode, class_table, ancestors(ty).collect()),
        );
        self.install_members(ty, access, mode)?;

        let marker = self.push_any(HostValue::Type(ty.clone()))?;
        self.heap
            .raw_set(class_table, "UnderlyingSystemType".into(), marker);

        if ty.is_enum() {
            for (name, value) in ty.enum_members() {
                let pushed = self.push_any(HostValue::Enum {
                    ty: ty.clone(),
                    value: *value,
                })?;
                self.heap.raw_set(class_table, name.as_str().into(), pushed);
            }
            let cast = self.register_callable(EnumCastFrom { ty: ty.clone() }.into())?;
            self.heap
                .raw_set(class_table, "__CastFrom".into(), ScriptValue::Function(cast));
        }

        self.install_constructor(ty)?;

        if self.config.bind_nested_types {
            for nested in &ty.definition().nested_types {
                if nested.definition().visibility == Visibility::Public && !skip_nested(nested) {
                    self.bind_with(nested, access, mode)?;
                }
            }
        }

        self.metrics.record_type_bound();
        tracing::debug!(type_name = %ty, ?mode, ?access, "bound host type");
        Ok(class_table)
    }

    pub fn ensure_bound(&mut self, ty: &TypeDescription) -> Result<(), BindError> {
        if !self.is_bound(ty) {
            self.bind(ty)?;
        }
        Ok(())
    }

    /// Fills the member tables of an already inserted binding.
    fn install_members(
        &mut self,
        ty: &TypeDescription,
        access: MemberAccess,
        mode: BindingMode,
    ) -> Result<(), BindError> {
        let class_table = self
            .namespaces
            .load(ty)
            .ok_or_else(|| BindError::MissingClassTable(ty.to_string()))?;
        let extensions = self.extension_map();
        let reflection = reflect(self.registry.core(), ty, access, extensions.as_deref());

        for (name, value) in reflection.constants {
            let pushed = self.push_any(value)?;
            self.heap.raw_set(class_table, name.into(), pushed);
        }

        let mut slots: Vec<(MemberTable, String, MemberSlot)> = vec![];
        for member in &reflection.members {
            let slot = match mode {
                BindingMode::Eager => {
                    self.metrics.record_member_generated();
                    MemberSlot::Bound(self.register_callable(generate(ty, member))?)
                }
                BindingMode::Lazy => MemberSlot::Unbound(
                    self.register_callable(
                        LazyStub {
                            member: LazyMember {
                                ty: ty.clone(),
                                kind: member.kind,
                                name: member.name.clone(),
                                is_static: member.is_static,
                                access,
                            },
                        }
                        .into(),
                    )?,
                ),
            };
            slots.push((
                MemberTable::for_member(member.kind, member.is_static),
                member.name.clone(),
                slot,
            ));
        }

        let operators: Vec<_> = reflection
            .operators
            .iter()
            .map(|(op, methods)| Ok::<_, BindError>((*op, self.register_callable(generate_operator(ty, *op, methods))?)))
            .collect::<Result<_, BindError>>()?;
        let items = generate_item_accessors(ty, &reflection.indexers)
            .map(|(get, set)| Ok::<_, BindError>((self.register_callable(get)?, self.register_callable(set)?)))
            .transpose()?;

        let binding = self
            .bindings
            .get_mut(ty)
            .ok_or_else(|| BindError::MissingBinding(ty.to_string()))?;
        for (table, name, slot) in slots {
            binding.table_mut(table).insert(name, slot);
        }
        binding.operators.extend(operators);
        if let Some((get, set)) = items {
            binding.item_getter = Some(get);
            binding.item_setter = Some(set);
        }
        Ok(())
    }

    fn install_constructor(&mut self, ty: &TypeDescription) -> Result<(), BindError> {
        let def = ty.definition();
        if ty.is_delegate() {
            let handle = self.register_callable(DelegateCtor { ty: ty.clone() }.into())?;
            return self.set_constructor(ty, handle);
        }
        if def.is_abstract || ty.is_interface() || ty.is_enum() {
            return Ok(());
        }
        let constructors: Vec<_> = def
            .constructors
            .iter()
            .filter(|c| c.visibility == Visibility::Public)
            .map(|c| MethodDescription::new(ty.clone(), c.clone()))
            .collect();
        if constructors.is_empty() && !ty.is_value_type() {
            return Ok(());
        }
        let group = OverloadGroup::new(ty, ".ctor", CallShape::Constructor, constructors);
        let handle = self.register_callable(ConstructorWrap { group }.into())?;
        self.set_constructor(ty, handle)
    }

    fn set_constructor(&mut self, ty: &TypeDescription, handle: CallableHandle) -> Result<(), BindError> {
        let binding = self
            .bindings
            .get_mut(ty)
            .ok_or_else(|| BindError::MissingBinding(ty.to_string()))?;
        binding.constructor = Some(handle);
        Ok(())
    }

    /// Adds the non-public members of a bound type to its tables, then does
    /// the same for its non-public nested types.
    pub fn make_private_accessible(&mut self, ty: &TypeDescription) -> Result<(), BindError> {
        let (mode, done) = self
            .bindings
            .get(ty)
            .map(|b| (b.mode, b.private_accessible))
            .ok_or_else(|| BindError::MissingBinding(ty.to_string()))?;
        if done {
            return Ok(());
        }
        if self.namespaces.load(ty).is_none() {
            return Err(BindError::MissingClassTable(ty.to_string()));
        }
        self.install_members(ty, MemberAccess::NonPublic, mode)?;
        if let Some(binding) = self.bindings.get_mut(ty) {
            binding.private_accessible = true;
        }
        tracing::debug!(type_name = %ty, "made non-public members accessible");

        for nested in &ty.definition().nested_types {
            if nested.definition().visibility == Visibility::NonPublic && !skip_nested(nested) {
                self.bind_with(nested, self.config.member_access, mode)?;
                self.make_private_accessible(nested)?;
            }
        }
        Ok(())
    }

    /// Drops the dispatch tables of `ty`. Lookups walking through it skip
    /// it from then on; its class table stays reachable by path.
    pub fn unregister(&mut self, ty: &TypeDescription) -> bool {
        let removed = self.bindings.remove(ty).is_some();
        if removed {
            self.namespaces.forget(ty);
            tracing::debug!(type_name = %ty, "unregistered host type");
        }
        removed
    }

    /// Root of the namespace tree, the table scripts see as `CS`.
    pub fn cs_root(&self) -> ScriptValue {
        ScriptValue::Table(self.namespaces.root())
    }

    /// Binds `ty` if needed and returns its class table.
    pub fn load_class(&mut self, ty: &TypeDescription) -> Result<ScriptValue, BindError> {
        self.bind(ty).map(ScriptValue::Table)
    }

    /// Walks a dotted path from the root, importing namespaces and types as
    /// it goes. Unknown names resolve to nil.
    pub fn global(&mut self, path: &str) -> Result<ScriptValue, ScriptError> {
        let mut current = self.cs_root();
        for segment in path.split('.').filter(|s| !s.is_empty()) {
            if current.is_nil() {
                break;
            }
            current = self.index(&current, &ScriptValue::string(segment))?;
        }
        Ok(current)
    }

    /// Invokes every script target of a delegate with `args`, returning the
    /// results of the last one.
    pub fn invoke_delegate(
        &mut self,
        delegate: &Delegate,
        args: Vec<HostValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        let args = args
            .into_iter()
            .map(|a| self.push_any(a))
            .collect::<Result<Vec<_>, _>>()?;
        self.call_targets(delegate, args)
    }

    pub(crate) fn call_targets(
        &mut self,
        delegate: &Delegate,
        args: Vec<ScriptValue>,
    ) -> Result<Vec<ScriptValue>, ScriptError> {
        let mut results = vec![];
        for target in delegate.targets() {
            let handle = CallableHandle::from_raw(*target)
                .ok_or_else(|| ScriptError::NotCallable(delegate.ty.to_string()))?;
            let mut frame = CallFrame::new(args.clone());
            self.call_handle(handle, &mut frame)?;
            results = frame.into_results();
        }
        Ok(results)
    }

    /// Sets a raw entry on a table; used by embedders to publish globals.
    pub fn raw_set(&mut self, table: TableId, key: &str, value: ScriptValue) -> bool {
        self.heap.raw_set(table, ScriptKey::from(key), value)
    }
}

impl ValueExchange for BridgeContext {
    type Error = ScriptError;
    type Callable = NativeFunction;

    fn push_value(&mut self, frame: &mut CallFrame, value: HostValue) -> Result<(), ScriptError> {
        let pushed = self.push_any(value)?;
        frame.push(pushed);
        Ok(())
    }

    fn read_value(
        &mut self,
        frame: &CallFrame,
        index: usize,
        expected: &TypeDescription,
    ) -> Result<HostValue, ScriptError> {
        let value = frame.arg(index);
        if self.compatibility(value, expected).is_none() {
            return Err(ScriptError::TypeMismatch(format!(
                "#{} expected {}, got {}",
                index + 1,
                expected,
                value.type_name()
            )));
        }
        self.to_host(value, expected)
    }

    fn raise_error(&self, message: String) -> ScriptError {
        ScriptError::Runtime(message)
    }

    fn register_callable(&mut self, callable: NativeFunction) -> Result<CallableHandle, ScriptError> {
        BridgeContext::register_callable(self, callable).map_err(ScriptError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostlua_types::members::{FieldDefinition, MethodDefinition};

    fn fixture() -> (Arc<TypeRegistry>, TypeDescription, TypeDescription) {
        let registry = Arc::new(TypeRegistry::new());
        let core = registry.core().clone();
        let base = registry
            .class_builder("Game", "Entity")
            .method(MethodDefinition::new("Id", |_| Ok(HostValue::Int32(1))).returns(&core.int32))
            .build();
        let derived = registry
            .class_builder("Game", "Player")
            .extends(&base)
            .field(FieldDefinition::new("score", &core.int32))
            .build();
        registry.register(&base).unwrap();
        registry.register(&derived).unwrap();
        (registry, base, derived)
    }

    #[test]
    fn test_binding_derived_binds_base_first() {
        let (registry, base, derived) = fixture();
        let mut ctx = BridgeContext::new(registry);
        ctx.bind(&derived).unwrap();
        assert!(ctx.is_bound(&base));
        let binding = ctx.binding(&derived).unwrap();
        assert_eq!(binding.ancestors[0], base);
        assert_eq!(binding.base.as_ref(), Some(&base));
        assert!(binding.getters.contains_key("score"));
        assert!(binding.setters.contains_key("score"));
    }

    #[test]
    fn test_lazy_mode_installs_stubs() {
        let (registry, base, _) = fixture();
        let mut ctx = BridgeContext::with_config(registry, BridgeConfig::default().lazy());
        ctx.bind(&base).unwrap();
        let binding = ctx.binding(&base).unwrap();
        assert!(matches!(binding.methods.get("Id"), Some(MemberSlot::Unbound(_))));
        assert_eq!(binding.unbound_count(), 1);
    }

    #[test]
    fn test_unregister_forgets_binding() {
        let (registry, base, _) = fixture();
        let mut ctx = BridgeContext::new(registry);
        ctx.bind(&base).unwrap();
        assert!(ctx.unregister(&base));
        assert!(!ctx.is_bound(&base));
        assert!(!ctx.unregister(&base));
    }

    #[test]
    fn test_private_access_requires_binding() {
        let (registry, base, _) = fixture();
        let mut ctx = BridgeContext::new(registry);
        assert_eq!(
            ctx.make_private_accessible(&base),
            Err(BindError::MissingBinding("Game.Entity".into()))
        );
    }
}
