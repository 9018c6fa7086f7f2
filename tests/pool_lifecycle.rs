use guest_vectors::bindings::{register_vector_api, shared_pools};
use guest_vectors::pool::PoolSet;
use guest_vectors::{Vec3, Vector};
use rhai::Engine;

#[test]
fn freed_guest_vectors_are_recycled() {
    let pools = shared_pools(PoolSet::default());
    let mut engine = Engine::new();
    register_vector_api(&mut engine, &pools);

    engine.run("let v = vec(1, 2, 3); v.free();").expect("free should succeed");
    let stats = pools.borrow().stats();
    let vec3 = stats.get("Vector3").expect("Vector3 pool");
    assert_eq!(vec3.constructed, 1);
    assert_eq!(vec3.retained, 1);

    let value = engine.eval::<Vec3>("vec(4, 5, 6)").expect("construct");
    assert_eq!(value.components(), &[4.0, 5.0, 6.0]);
    let stats = pools.borrow().stats();
    let vec3 = stats.get("Vector3").expect("Vector3 pool");
    assert_eq!(vec3.recycled, 1);
    assert_eq!(vec3.retained, 0);
}

#[test]
fn freed_value_leaves_zero_vector_behind() {
    let pools = shared_pools(PoolSet::default());
    let mut engine = Engine::new();
    register_vector_api(&mut engine, &pools);
    let out = engine.eval::<String>("let v = vec(1, 2); v.free(); v.to_string()").expect("eval");
    assert_eq!(out, "{0, 0}");
}

#[test]
fn capacity_bounds_retention_per_type() {
    let pools = shared_pools(PoolSet::new(1, 1));
    let mut engine = Engine::new();
    register_vector_api(&mut engine, &pools);
    engine
        .run("let a = vec(1, 2); let b = vec(3, 4); a.free(); b.free(); let m = mat3(); m.free();")
        .expect("script");

    let stats = pools.borrow().stats();
    let vec2 = stats.get("Vector2").expect("Vector2 pool");
    assert_eq!((vec2.retained, vec2.discarded), (1, 1));
    assert_eq!(stats.get("Matrix3").map(|m| m.retained), Some(1));
    assert_eq!(stats.get("Vector3").map(|v| v.retained), Some(0));
}

#[test]
fn recycled_matrices_come_back_as_identity() {
    let mut pools = PoolSet::default();
    let mut m = guest_vectors::Mat2::of(&mut pools, [[5.0, 6.0], [7.0, 8.0]]);
    m.scale(2.0);
    pools.release(m);
    let fresh: guest_vectors::Mat2 = pools.fresh();
    assert_eq!(fresh.rows(), &[[1.0, 0.0], [0.0, 1.0]]);
}

#[test]
fn intermediate_results_draw_from_pools() {
    let mut pools = PoolSet::default();
    let a = Vector::of(&mut pools, [1.0, 2.0, 3.0]);
    let b = a.plus(&a, &mut pools);
    pools.release(a);
    let c = b.scaled(0.5, &mut pools);
    assert_eq!(c.components(), &[1.0, 2.0, 3.0]);

    let stats = pools.stats();
    let vec3 = stats.get("Vector3").expect("Vector3 pool");
    assert_eq!(vec3.constructed, 2);
    assert_eq!(vec3.recycled, 1);
}

#[test]
fn stats_serialize_as_json() {
    let pools = PoolSet::default();
    let json = serde_json::to_value(pools.stats()).expect("serialize stats");
    assert_eq!(json["pools"]["Vector6"]["retained"], 0);
    assert_eq!(json["pools"].as_object().map(|pools| pools.len()), Some(8));
}
