//! Shared host type universe for the integration tests.
#![allow(dead_code)]

use hostlua_bind::{BridgeConfig, BridgeContext};
use hostlua_types::{
    builder::PropertyBuilder,
    generics::{GenericParameter, MethodType},
    members::{FieldDefinition, MethodDefinition, Parameter},
    HostException, HostValue, Object, TypeDescription, TypeRegistry,
};
use hostlua_value::ScriptValue;
use std::sync::Arc;

pub struct Universe {
    pub registry: Arc<TypeRegistry>,
    pub entity: TypeDescription,
    pub player: TypeDescription,
    pub stats: TypeDescription,
    pub journal: TypeDescription,
    pub vector: TypeDescription,
    pub color: TypeDescription,
    pub handler: TypeDescription,
    pub inventory: TypeDescription,
    pub math: TypeDescription,
    pub extensions: TypeDescription,
    pub patched: TypeDescription,
}

fn as_f64(value: &HostValue) -> f64 {
    value.as_f64().unwrap_or_default()
}

pub fn universe() -> Universe {
    let registry = Arc::new(TypeRegistry::new());
    let core = registry.core().clone();

    let handler = registry.delegate_builder("Game", "ScoreHandler").build();

    let entity = registry
        .class_builder("Game", "Entity")
        .field(FieldDefinition::new("id", &core.int32))
        .method(
            MethodDefinition::new("Describe", |_| Ok(HostValue::string("entity")))
                .returns(&core.string),
        )
        .method(
            MethodDefinition::new("Fail", |_| {
                Err(HostException::new("boom").with_stack_trace("at Game.Entity.Fail"))
            }),
        )
        .constructor(MethodDefinition::new("ctor", |_| Ok(HostValue::Null)))
        .build();

    let stats = registry
        .class_builder("Game", "Stats")
        .nested_in(&["Player"])
        .field(FieldDefinition::new("wins", &core.int32))
        .constructor(MethodDefinition::new("ctor", |_| Ok(HostValue::Null)))
        .build();

    let journal = registry
        .class_builder("Game", "Journal")
        .nested_in(&["Player"])
        .non_public()
        .method(
            MethodDefinition::new("Entries", |_| Ok(HostValue::Int32(3)))
                .non_public()
                .static_method()
                .returns(&core.int32),
        )
        .build();

    let player = registry
        .class_builder("Game", "Player")
        .extends(&entity)
        .field(FieldDefinition::new("score", &core.int32))
        .field(FieldDefinition::new("Count", &core.int32).static_field())
        .field(FieldDefinition::new("MaxLevel", &core.int32).literal(HostValue::Int32(99)))
        .auto_property("Name", &core.string, false)
        .property(
            PropertyBuilder::new("Level", &core.int32).getter(|inv| {
                let score = inv.this_field("score")?.as_i64().unwrap_or_default();
                Ok(HostValue::Int32((score / 10) as i32))
            }),
        )
        .event("Scored", &handler, false)
        .method(
            MethodDefinition::new("Add", |mut inv| {
                let n = inv.arg(0)?.as_i64().unwrap_or_default();
                let score = inv.this_field("score")?.as_i64().unwrap_or_default();
                inv.set_this_field("score", HostValue::Int32((score + n) as i32))?;
                Ok(HostValue::string("int"))
            })
            .param("n", &core.int32)
            .returns(&core.string),
        )
        .method(
            MethodDefinition::new("Add", |_| Ok(HostValue::string("double")))
                .param("n", &core.double)
                .returns(&core.string),
        )
        .method(
            MethodDefinition::new("TryHalve", |mut inv| {
                let n = inv.arg(0)?.as_i64().unwrap_or_default();
                inv.args[1] = HostValue::Int32((n / 2) as i32);
                Ok(HostValue::Boolean(n % 2 == 0))
            })
            .param("n", &core.int32)
            .with_parameter(Parameter::new("half", &core.int32).out())
            .returns(&core.boolean),
        )
        .method(
            MethodDefinition::new("Secret", |_| Ok(HostValue::Int32(42)))
                .non_public()
                .returns(&core.int32),
        )
        .method(
            MethodDefinition::new("Rank", |_| Ok(HostValue::string("public")))
                .returns(&core.string),
        )
        .method(
            MethodDefinition::new("Rank", |_| Ok(HostValue::string("private")))
                .param("verbose", &core.boolean)
                .non_public()
                .returns(&core.string),
        )
        .method(
            MethodDefinition::new("Reset", |inv| {
                inv.set_static_field("Count", HostValue::Int32(0));
                Ok(HostValue::Null)
            })
            .static_method(),
        )
        .method(
            MethodDefinition::new("Pick", |inv| Ok(inv.arg(0)?.clone()))
                .static_method()
                .generic(GenericParameter::new("T").constrained_to(&entity))
                .with_parameter(Parameter::new("item", MethodType::MethodGeneric(0)))
                .returns(MethodType::MethodGeneric(0)),
        )
        .method(
            MethodDefinition::new("Make", |_| Ok(HostValue::Null))
                .static_method()
                .generic(GenericParameter::new("T"))
                .returns(MethodType::MethodGeneric(0)),
        )
        .constructor(
            MethodDefinition::new("ctor", |mut inv| {
                let name = inv.arg(0)?.clone();
                inv.set_this_field("<Name>k__BackingField", name)?;
                Ok(HostValue::Null)
            })
            .param("name", &core.string),
        )
        .nested(&stats)
        .nested(&journal)
        .build();

    let vector = registry
        .struct_builder("Game", "Vector2")
        .field(FieldDefinition::new("x", &core.double))
        .field(FieldDefinition::new("y", &core.double))
        .constructor(
            MethodDefinition::new("ctor", |mut inv| {
                let x = inv.arg(0)?.clone();
                let y = inv.arg(1)?.clone();
                inv.set_this_field("x", x)?;
                inv.set_this_field("y", y)?;
                Ok(HostValue::Null)
            })
            .param("x", &core.double)
            .param("y", &core.double),
        )
        .method(
            MethodDefinition::new("Scale", |mut inv| {
                let k = as_f64(inv.arg(0)?);
                let x = as_f64(&inv.this_field("x")?);
                let y = as_f64(&inv.this_field("y")?);
                inv.set_this_field("x", HostValue::Double(x * k))?;
                inv.set_this_field("y", HostValue::Double(y * k))?;
                Ok(HostValue::Null)
            })
            .param("k", &core.double),
        )
        .operator(
            MethodDefinition::new("op_Addition", |inv| {
                let (a, b) = (inv.arg(0)?, inv.arg(1)?);
                let mut sum = Object::new(inv.declaring_type);
                for f in ["x", "y"] {
                    let total = a.field(f).map(|v| as_f64(&v)).unwrap_or_default()
                        + b.field(f).map(|v| as_f64(&v)).unwrap_or_default();
                    sum.storage.set(f, HostValue::Double(total));
                }
                Ok(HostValue::ValueType(Box::new(sum)))
            })
            .param("a", &core.value_type)
            .param("b", &core.value_type)
            .returns(&core.value_type),
        )
        .method(
            MethodDefinition::new("ToString", |inv| {
                let x = as_f64(&inv.this_field("x")?);
                let y = as_f64(&inv.this_field("y")?);
                Ok(HostValue::string(format!("({x}, {y})")))
            })
            .returns(&core.string),
        )
        .build();

    let math = registry
        .class_builder("Game", "Math")
        .abstract_type()
        .method(
            MethodDefinition::new("F", |_| Ok(HostValue::string("int")))
                .static_method()
                .param("x", &core.int32)
                .returns(&core.string),
        )
        .method(
            MethodDefinition::new("F", |_| Ok(HostValue::string("double")))
                .static_method()
                .param("x", &core.double)
                .returns(&core.string),
        )
        .method(
            MethodDefinition::new("Sum", |inv| {
                let total = match inv.arg(0)? {
                    HostValue::Object(array) => array
                        .read()
                        .elements
                        .iter()
                        .filter_map(HostValue::as_i64)
                        .sum(),
                    _ => 0,
                };
                Ok(HostValue::Int64(total))
            })
            .static_method()
            .with_parameter(Parameter::new("values", &registry.array_of(&core.int32)).params())
            .returns(&core.int64),
        )
        .method(
            MethodDefinition::new("IsNull", |inv| Ok(HostValue::Boolean(inv.arg(0)?.is_null())))
                .static_method()
                .param("e", &entity)
                .returns(&core.boolean),
        )
        .build();

    let color = registry
        .enum_builder("Game", "Color", &[("Red", 0), ("Green", 1), ("Blue", 2)])
        .build();

    let inventory = registry
        .class_builder("Game.Items", "Inventory")
        .field(FieldDefinition::new("slot0", &core.string))
        .property(
            PropertyBuilder::indexer(&core.string, Parameter::new("index", &core.int32))
                .getter(|inv| {
                    if inv.arg(0)?.as_i64() == Some(0) {
                        inv.this_field("slot0")
                    } else {
                        Err(HostException::new("slot out of range"))
                    }
                })
                .setter(|mut inv| {
                    let value = inv.arg(1)?.clone();
                    inv.set_this_field("slot0", value)?;
                    Ok(HostValue::Null)
                }),
        )
        .property(
            PropertyBuilder::indexer(&core.string, Parameter::new("key", &core.string))
                .getter(|inv| Ok(HostValue::string(format!("named:{}", inv.arg(0)?.as_str().unwrap_or_default())))),
        )
        .constructor(MethodDefinition::new("ctor", |_| Ok(HostValue::Null)))
        .build();

    let extensions = registry
        .class_builder("Game", "PlayerExtensions")
        .abstract_type()
        .extension_container()
        .method(
            MethodDefinition::new("Shout", |inv| {
                let text = inv.arg(1)?.as_str().unwrap_or_default().to_uppercase();
                Ok(HostValue::string(text))
            })
            .extension()
            .param("self", &player)
            .param("text", &core.string)
            .returns(&core.string),
        )
        .build();

    let patched = registry
        .class_builder("Game", "Patched")
        .field(FieldDefinition::new("__Hotfix0_Update", &handler).static_field())
        .field(FieldDefinition::new("_c__Hotfix0_ctor", &handler).static_field())
        .field(FieldDefinition::new("__HotfixCount", &core.int32).static_field())
        .build();

    for ty in [
        &handler, &entity, &player, &vector, &math, &color, &inventory, &extensions, &patched,
    ] {
        registry.register(ty).expect("fixture types register once");
    }

    Universe {
        registry,
        entity,
        player,
        stats,
        journal,
        vector,
        color,
        handler,
        inventory,
        math,
        extensions,
        patched,
    }
}

impl Universe {
    pub fn context(&self) -> BridgeContext {
        BridgeContext::new(self.registry.clone())
    }

    pub fn lazy_context(&self) -> BridgeContext {
        BridgeContext::with_config(self.registry.clone(), BridgeConfig::default().lazy())
    }
}

/// Constructs a player through its class table.
pub fn new_player(ctx: &mut BridgeContext, u: &Universe, name: &str) -> ScriptValue {
    let class = ctx.load_class(&u.player).expect("player binds");
    ctx.construct(&class, vec![ScriptValue::string(name)])
        .expect("player constructs")
        .remove(0)
}

pub fn s(value: &str) -> ScriptValue {
    ScriptValue::string(value)
}
