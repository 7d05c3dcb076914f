//! Proxy identity across pushes, release through `__gc`, and the metrics
//! the identity cache reports.
mod common;

use common::{new_player, s, universe};
use hostlua_bind::ScriptError;
use hostlua_value::ScriptValue;

#[test]
fn test_same_instance_comes_back_as_the_same_proxy() {
    let u = universe();
    let mut ctx = u.context();
    let player = new_player(&mut ctx, &u, "ann");
    let class = ctx.load_class(&u.player).unwrap();
    let echoed = ctx
        .invoke_member(&class, "Pick", vec![player.clone()])
        .unwrap()
        .remove(0);
    assert_eq!(echoed, player);
}

#[test]
fn test_released_proxy_is_stale() {
    let u = universe();
    let mut ctx = u.context();
    let player = new_player(&mut ctx, &u, "ann");
    assert!(ctx.gc(&player));
    assert!(!ctx.gc(&player));
    assert!(ctx.translator().resolve(player.as_proxy().unwrap()).is_none());
    assert_eq!(
        ctx.index(&player, &s("score")).unwrap_err(),
        ScriptError::StaleProxy("Game.Player".into())
    );
}

#[test]
fn test_released_proxy_passes_as_null_argument() {
    let u = universe();
    let mut ctx = u.context();
    let player = new_player(&mut ctx, &u, "ann");
    let math = ctx.load_class(&u.math).unwrap();
    assert_eq!(
        ctx.invoke_member(&math, "IsNull", vec![player.clone()]).unwrap(),
        vec![ScriptValue::Boolean(false)]
    );
    ctx.gc(&player);
    assert_eq!(
        ctx.invoke_member(&math, "IsNull", vec![player]).unwrap(),
        vec![ScriptValue::Boolean(true)]
    );
}

#[test]
fn test_new_instance_after_release_gets_a_distinct_key() {
    let u = universe();
    let mut ctx = u.context();
    let first = new_player(&mut ctx, &u, "ann");
    ctx.gc(&first);
    let second = new_player(&mut ctx, &u, "bea");
    assert_ne!(first, second);
    assert_eq!(ctx.index(&second, &s("Name")).unwrap(), s("bea"));
}

#[test]
fn test_enum_values_share_one_proxy() {
    let u = universe();
    let mut ctx = u.context();
    let color = ctx.global("Game.Color").unwrap();
    let a = ctx.index(&color, &s("Red")).unwrap();
    let b = ctx
        .invoke_member(&color, "__CastFrom", vec![ScriptValue::Integer(0)])
        .unwrap()
        .remove(0);
    assert_eq!(a, b);
}

#[test]
fn test_value_types_never_share_a_proxy() {
    let u = universe();
    let mut ctx = u.context();
    let class = ctx.load_class(&u.vector).unwrap();
    let a = ctx.construct(&class, vec![]).unwrap().remove(0);
    let b = ctx.construct(&class, vec![]).unwrap().remove(0);
    assert_ne!(a, b);
}

#[test]
fn test_proxy_from_another_context_is_rejected() {
    let u = universe();
    let mut home = u.context();
    let mut away = u.context();
    let player = new_player(&mut home, &u, "ann");
    let class = away.load_class(&u.player).unwrap();
    assert!(matches!(
        away.invoke_member(&class, "Pick", vec![player]),
        Err(ScriptError::NoMatchingOverload { .. })
    ));
}

#[test]
fn test_metrics_snapshot_counts_bindings_and_cache_traffic() {
    let u = universe();
    let mut ctx = u.context();
    let player = new_player(&mut ctx, &u, "ann");
    let class = ctx.load_class(&u.player).unwrap();
    ctx.invoke_member(&class, "Pick", vec![player]).unwrap();

    let stats = ctx.metrics().snapshot();
    // Object, Entity, Player and its public nested Stats.
    assert!(stats.types_bound >= 4, "{stats}");
    assert!(stats.members_generated > 0);
    assert!(stats.cache_hits >= 1);
    assert!(stats.cache_misses >= 1);
    assert!(stats.overload_resolutions >= 2);
}
