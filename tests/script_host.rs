use guest_vectors::config::SandboxConfig;
use guest_vectors::scripts::ScriptHost;
use rhai::INT;
use std::fs::OpenOptions;
use std::io::Write;
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

fn write_script(contents: &str) -> NamedTempFile {
    let mut temp = NamedTempFile::new().expect("temp script");
    write!(temp, "{contents}").expect("write script");
    temp
}

fn rewrite_script(file: &NamedTempFile, contents: &str) {
    let mut handle = OpenOptions::new().write(true).truncate(true).open(file.path()).expect("reopen script");
    write!(handle, "{contents}").expect("rewrite script");
    handle.set_modified(SystemTime::now() + Duration::from_secs(5)).expect("bump mtime");
}

#[test]
fn bundled_orbit_script_runs_clean() {
    let mut host = ScriptHost::new("assets/scripts/orbit.rhai", &SandboxConfig::default());
    host.force_reload().expect("orbit.rhai should compile");
    for _ in 0..5 {
        host.update(0.05);
        assert_eq!(host.last_error(), None);
    }
    let stats = host.pool_stats();
    assert!(stats.get("Vector2").map_or(false, |pool| pool.recycled > 0), "freed vectors should be reused");
}

#[test]
fn init_runs_once_and_update_every_tick() {
    let script = write_script(
        r#"
        fn init() { let v = vec(1, 2, 3); v.free(); }
        fn update(dt) { let v = vec(dt, dt); v.free(); }
        "#,
    );
    let mut host = ScriptHost::new(script.path(), &SandboxConfig::default());
    for _ in 0..3 {
        host.update(0.1);
    }
    assert_eq!(host.last_error(), None);

    let stats = host.pool_stats();
    let vec3 = stats.get("Vector3").expect("Vector3 pool");
    assert_eq!((vec3.constructed, vec3.recycled, vec3.retained), (1, 0, 1));
    let vec2 = stats.get("Vector2").expect("Vector2 pool");
    assert_eq!((vec2.constructed, vec2.recycled, vec2.retained), (1, 2, 1));
}

#[test]
fn missing_entry_points_are_not_errors() {
    let script = write_script("let unused = 1;");
    let mut host = ScriptHost::new(script.path(), &SandboxConfig::default());
    host.update(0.1);
    assert_eq!(host.last_error(), None);
}

#[test]
fn missing_helpers_inside_entry_points_are_errors() {
    let script = write_script("fn update(dt) { update_positions(dt); }");
    let mut host = ScriptHost::new(script.path(), &SandboxConfig::default());
    host.update(0.1);
    let err = host.last_error().expect("missing helper should surface");
    assert!(err.contains("update_positions"), "unexpected error: {err}");

    let script = write_script("fn init() { initialize_world(); } fn update(dt) { }");
    let mut host = ScriptHost::new(script.path(), &SandboxConfig::default());
    host.update(0.1);
    assert!(host.last_error().is_some_and(|err| err.contains("initialize_world")));
}

#[test]
fn guest_errors_are_recorded_and_cleared() {
    let script = write_script("fn update(dt) { let v = vec(1, 2, 3) / 0; }");
    let mut host = ScriptHost::new(script.path(), &SandboxConfig::default());
    host.update(0.1);
    let err = host.last_error().expect("division by zero should surface");
    assert!(err.contains("attempt to divide vector by 0"), "unexpected error: {err}");

    rewrite_script(&script, "fn update(dt) { let v = vec(1, 2, 3) / 2; }");
    host.update(0.1);
    assert_eq!(host.last_error(), None, "reload should pick up the fixed script");
}

#[test]
fn compile_errors_surface_through_update() {
    let script = write_script("fn update(dt) { let v = ; }");
    let mut host = ScriptHost::new(script.path(), &SandboxConfig::default());
    host.update(0.1);
    assert!(host.last_error().is_some());
    assert!(host.force_reload().is_err());
}

#[test]
fn disabled_host_skips_calls() {
    let script = write_script("fn update(dt) { throw \"should not run\"; }");
    let mut host = ScriptHost::new(script.path(), &SandboxConfig::default());
    host.set_enabled(false);
    host.update(0.1);
    assert!(!host.enabled());
    assert_eq!(host.last_error(), None);
}

#[test]
fn operation_limit_stops_runaway_scripts() {
    let script = write_script("fn update(dt) { loop { let v = vec(1, 2); } }");
    let mut config = SandboxConfig::default();
    config.script.max_operations = 10_000;
    let mut host = ScriptHost::new(script.path(), &config);
    host.update(0.1);
    let err = host.last_error().expect("loop should be cut off");
    assert!(err.contains("operations"), "unexpected error: {err}");
}

#[test]
fn eval_shares_engine_and_pools() {
    let script = write_script("");
    let mut host = ScriptHost::new(script.path(), &SandboxConfig::default());
    assert_eq!(host.eval::<INT>("vec(1, 2, 3, 4).len()").expect("eval"), 4);
    assert_eq!(host.eval::<String>("vec(1, 2).yx.to_string()").expect("eval"), "{2, 1}");
    assert!(host.eval::<INT>("vec(1, 2) + 1").is_err());
    let stats = host.pool_stats();
    assert_eq!(stats.get("Vector2").map(|pool| pool.constructed), Some(3));
}

#[test]
fn host_positions_reach_the_guest() {
    use glam::DVec3;
    use guest_vectors::host::{vec3_from_position, vec3_to_block_pos};

    let script = write_script("");
    let mut host = ScriptHost::new(script.path(), &SandboxConfig::default());
    let position = vec3_from_position(&mut host.pools().borrow_mut(), DVec3::new(1.5, 64.0, -3.25));
    host.scope_mut().push("player", position);

    assert_eq!(host.eval::<String>("player.xz.to_string()").expect("eval"), "{1.5, -3.25}");
    let moved = host.eval::<guest_vectors::Vec3>("player + vec(0, -0.5, 0)").expect("eval");
    assert_eq!(vec3_to_block_pos(&moved), glam::IVec3::new(1, 63, -4));
}
