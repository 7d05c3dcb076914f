use hostlua_types::{
    generics::{is_supported_method, MethodType},
    MethodDescription, TypeDescription, TypeRegistry, Visibility,
};
use std::collections::HashMap;

/// Extension methods grouped by the type they extend.
#[derive(Debug, Default, Clone)]
pub struct ExtensionMap {
    by_type: HashMap<TypeDescription, Vec<MethodDescription>>,
}

/// The extended type is the first parameter's type, or the first
/// constraint of that parameter when it is a method generic.
fn extended_type(method: &MethodDescription) -> Option<TypeDescription> {
    let first = method.method.parameters.first()?;
    match &first.ty {
        MethodType::Base(ty) => Some(ty.clone()),
        MethodType::MethodGeneric(index) => {
            let constraint = method.method.generic_parameters.get(*index)?.constraints.first()?;
            constraint.is_class().then(|| constraint.clone())
        }
    }
}

impl ExtensionMap {
    pub fn collect(registry: &TypeRegistry) -> Self {
        let mut by_type: HashMap<TypeDescription, Vec<MethodDescription>> = HashMap::new();
        for container in registry.extension_containers() {
            for method in &container.definition().methods {
                if !(method.is_static
                    && method.is_extension
                    && method.visibility == Visibility::Public
                    && is_supported_method(method))
                {
                    continue;
                }
                let description = MethodDescription::new(container.clone(), method.clone());
                match extended_type(&description) {
                    Some(ty) => by_type.entry(ty).or_default().push(description),
                    None => tracing::debug!(method = ?description, "extension method has no class receiver"),
                }
            }
        }
        Self { by_type }
    }

    pub fn methods_of(&self, ty: &TypeDescription) -> &[MethodDescription] {
        self.by_type.get(ty).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}
