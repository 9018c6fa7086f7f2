use crate::config::SandboxOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_TICKS: u32 = 1;
pub const DEFAULT_DT: f64 = 1.0 / 20.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CliOptions {
    pub script: PathBuf,
    pub config: Option<PathBuf>,
    pub ticks: u32,
    pub dt: f64,
    vector_capacity: Option<usize>,
    max_operations: Option<u64>,
    fast_operators: Option<bool>,
}

impl CliOptions {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut script = None;
        let mut options = CliOptions {
            script: PathBuf::new(),
            config: None,
            ticks: DEFAULT_TICKS,
            dt: DEFAULT_DT,
            vector_capacity: None,
            max_operations: None,
            fast_operators: None,
        };
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_arg) = iter.next() {
            let arg = raw_arg.as_ref();
            let Some(key) = arg.strip_prefix("--") else {
                if script.is_some() {
                    bail!("Unexpected argument '{arg}'. Only one script path is accepted.");
                }
                script = Some(PathBuf::from(arg));
                continue;
            };
            let value = iter.next().ok_or_else(|| anyhow!("Expected a value after '{arg}'"))?.as_ref().to_string();
            match key {
                "config" => options.config = Some(PathBuf::from(value)),
                "ticks" => {
                    options.ticks = value.parse::<u32>().with_context(|| format!("Invalid ticks '{value}'"))?;
                }
                "dt" => {
                    let dt = value.parse::<f64>().with_context(|| format!("Invalid dt '{value}'"))?;
                    if !dt.is_finite() || dt < 0.0 {
                        bail!("Invalid dt '{value}'. Use a non-negative number of seconds.");
                    }
                    options.dt = dt;
                }
                "vector-capacity" => {
                    options.vector_capacity = Some(
                        value.parse::<usize>().with_context(|| format!("Invalid vector-capacity '{value}'"))?,
                    );
                }
                "max-operations" => {
                    options.max_operations =
                        Some(value.parse::<u64>().with_context(|| format!("Invalid max-operations '{value}'"))?);
                }
                "fast-operators" => {
                    options.fast_operators = Some(parse_bool_flag("fast-operators", &value)?);
                }
                _ => bail!(
                    "Unknown flag '{arg}'. Supported flags: --config, --ticks, --dt, --vector-capacity, \
                     --max-operations, --fast-operators."
                ),
            }
        }
        options.script = script.ok_or_else(|| anyhow!("A script path is required"))?;
        Ok(options)
    }

    pub fn overrides(&self) -> SandboxOverrides {
        SandboxOverrides {
            vector_capacity: self.vector_capacity,
            max_operations: self.max_operations,
            fast_operators: self.fast_operators,
        }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}
