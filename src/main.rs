use anyhow::{bail, Result};
use guest_vectors::cli::CliOptions;
use guest_vectors::config::SandboxConfig;
use guest_vectors::scripts::ScriptHost;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let options = match CliOptions::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(options) {
        eprintln!("[vector-script] error: {err:?}");
        std::process::exit(1);
    }
}

fn run(options: CliOptions) -> Result<()> {
    let mut config = match &options.config {
        Some(path) => SandboxConfig::load(path)?,
        None => SandboxConfig::default(),
    };
    let overrides = options.overrides();
    if !overrides.is_empty() {
        tracing::debug!(fields = ?overrides.applied_fields(), "applying command-line overrides");
        config.apply_overrides(&overrides);
    }

    let mut host = ScriptHost::new(&options.script, &config);
    for tick in 0..options.ticks {
        host.update(options.dt);
        if let Some(err) = host.last_error() {
            bail!("tick {tick}: {err}");
        }
    }

    serde_json::to_writer_pretty(std::io::stdout(), &host.pool_stats())?;
    println!();
    Ok(())
}
