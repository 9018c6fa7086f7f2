use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{anyhow, Context, Result};
use rhai::{Engine, EvalAltResult, Scope, AST, FLOAT};

use crate::bindings::{register_vector_api, shared_pools, SharedPools};
use crate::config::SandboxConfig;
use crate::limits::{Limit, SandboxLimits};
use crate::pool::{PoolSet, PoolSetStats};

pub const SCRIPT_LOG_TARGET: &str = "guest_vectors::script";

/// One sandboxed script: its engine, its pools and its persistent scope.
///
/// The script may define `init()` and `update(dt)`. `init` runs once after
/// every (re)load, `update` on every tick. Either may be absent.
pub struct ScriptHost {
    engine: Engine,
    pools: SharedPools,
    ast: Option<AST>,
    scope: Scope<'static>,
    script_path: PathBuf,
    last_modified: Option<SystemTime>,
    error: Option<String>,
    enabled: bool,
    initialized: bool,
}

impl ScriptHost {
    pub fn new(path: impl AsRef<Path>, config: &SandboxConfig) -> Self {
        let pools = shared_pools(PoolSet::from_limits(config));
        let mut engine = Engine::new();
        engine.set_fast_operators(config.script.fast_operators);
        if let Some(max_operations) = config.limit(Limit::MaxOperations) {
            engine.set_max_operations(max_operations);
        }
        register_api(&mut engine, &pools);
        Self {
            engine,
            pools,
            ast: None,
            scope: Scope::new(),
            script_path: path.as_ref().to_path_buf(),
            last_modified: None,
            error: None,
            enabled: true,
            initialized: false,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enable: bool) {
        self.enabled = enable;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn script_path(&self) -> &Path {
        &self.script_path
    }

    pub fn pools(&self) -> &SharedPools {
        &self.pools
    }

    /// Variables pushed here are visible to [`ScriptHost::eval`] until the
    /// next reload.
    pub fn scope_mut(&mut self) -> &mut Scope<'static> {
        &mut self.scope
    }

    pub fn pool_stats(&self) -> PoolSetStats {
        self.pools.borrow().stats()
    }

    pub fn force_reload(&mut self) -> Result<()> {
        self.load_script().map(|_| ())
    }

    /// Evaluates an expression against the script's scope.
    pub fn eval<T: Clone + 'static>(&mut self, expr: &str) -> Result<T> {
        self.engine
            .eval_with_scope::<T>(&mut self.scope, expr)
            .map_err(|err| anyhow!("Evaluating `{expr}`: {err}"))
    }

    pub fn update(&mut self, dt: f64) {
        if let Err(err) = self.reload_if_needed() {
            tracing::warn!(script = %self.script_path.display(), "reload failed: {err:#}");
            self.error = Some(err.to_string());
            return;
        }

        if !self.enabled {
            return;
        }
        let ast = match &self.ast {
            Some(ast) => ast,
            None => return,
        };

        if !self.initialized {
            match self.engine.call_fn::<()>(&mut self.scope, ast, "init", ()) {
                Ok(_) => {
                    self.initialized = true;
                    self.error = None;
                }
                Err(err) => {
                    if is_missing_entry_point(&err, "init") {
                        self.initialized = true;
                    } else {
                        tracing::warn!(script = %self.script_path.display(), "init failed: {err}");
                        self.error = Some(err.to_string());
                        return;
                    }
                }
            }
        }

        match self.engine.call_fn::<()>(&mut self.scope, ast, "update", (dt as FLOAT,)) {
            Ok(_) => {
                self.error = None;
            }
            Err(err) => {
                if is_missing_entry_point(&err, "update") {
                    self.error = None;
                } else {
                    tracing::warn!(script = %self.script_path.display(), "update failed: {err}");
                    self.error = Some(err.to_string());
                }
            }
        }
    }

    fn reload_if_needed(&mut self) -> Result<()> {
        let metadata = match fs::metadata(&self.script_path) {
            Ok(meta) => meta,
            Err(err) => {
                return Err(anyhow!("Script file not accessible: {err}"));
            }
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if self.ast.is_none() || self.last_modified.map_or(true, |prev| modified > prev) {
            self.load_script()?;
        }
        Ok(())
    }

    fn load_script(&mut self) -> Result<&AST> {
        let source = fs::read_to_string(&self.script_path)
            .with_context(|| format!("Reading {}", self.script_path.display()))?;
        let ast = self.engine.compile(source).with_context(|| "Compiling Rhai script")?;
        self.scope = Scope::new();
        self.pools.borrow_mut().clear();
        self.last_modified = fs::metadata(&self.script_path).ok().and_then(|meta| meta.modified().ok());
        self.initialized = false;
        self.error = None;
        tracing::debug!(script = %self.script_path.display(), "script loaded");
        Ok(self.ast.insert(ast))
    }
}

/// Only a missing top-level entry point counts, not a missing function
/// called from inside it.
fn is_missing_entry_point(err: &EvalAltResult, name: &str) -> bool {
    match err {
        EvalAltResult::ErrorFunctionNotFound(signature, _) => called_name(signature) == name,
        _ => false,
    }
}

/// rhai reports a missing function as `name (arg types)`.
fn called_name(signature: &str) -> &str {
    signature.split(|ch: char| ch == ' ' || ch == '(').next().unwrap_or(signature)
}

fn register_api(engine: &mut Engine, pools: &SharedPools) {
    register_vector_api(engine, pools);
    engine.register_fn("log", |message: &str| {
        tracing::info!(target: SCRIPT_LOG_TARGET, "{message}");
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhai::Position;
    use std::io;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn not_found(signature: &str) -> EvalAltResult {
        EvalAltResult::ErrorFunctionNotFound(signature.into(), Position::NONE)
    }

    #[test]
    fn entry_point_match_is_exact() {
        assert!(is_missing_entry_point(&not_found("update (f64)"), "update"));
        assert!(is_missing_entry_point(&not_found("init ()"), "init"));
        assert!(!is_missing_entry_point(&not_found("update_positions (f64)"), "update"));
        assert!(!is_missing_entry_point(&not_found("initialize ()"), "init"));
        assert!(!is_missing_entry_point(&EvalAltResult::ErrorRuntime("update".into(), Position::NONE), "update"));
    }

    #[test]
    fn reload_failures_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = ScriptHost::new(dir.path().join("missing.rhai"), &SandboxConfig::default());
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt().with_writer(logs.clone()).finish();
        tracing::subscriber::with_default(subscriber, || host.update(0.1));

        assert!(host.last_error().is_some_and(|err| err.contains("not accessible")));
        let output = logs.contents();
        assert!(output.contains("reload failed"), "unexpected log output: {output}");
        assert!(output.contains("missing.rhai"));
    }
}
