//! policy-autogen CLI library
//!
//! Reads a policy document, appends autogenerated controller rules and
//! prints the result.
//!
//! Controller resolution (highest priority first):
//! 1. `--controllers` flag / `AUTOGEN_CONTROLLERS`
//! 2. the policy's `pod-policies.kyverno.io/autogen-controllers` annotation
//! 3. `all`

pub mod error;
pub mod policy;

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use tracing::debug;

use policy_autogen::{ControllerSet, DEFAULT_AUTOGEN_CONTROLLERS};

pub use error::{Error, Result};
pub use policy::PolicyDocument;

const STDIN_PATH: &str = "-";

/// Output encoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Autogenerate pod-controller and CronJob rules for a policy
#[derive(Debug, Parser)]
#[command(name = "policy-autogen", version, about)]
pub struct Cli {
    /// Policy file (YAML or JSON), `-` reads stdin
    #[arg(short, long, env = "AUTOGEN_POLICY_FILE", default_value = STDIN_PATH)]
    pub file: PathBuf,

    /// Comma-separated controllers, overriding the policy annotation
    #[arg(long, env = "AUTOGEN_CONTROLLERS")]
    pub controllers: Option<ControllerSet>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

impl Cli {
    /// Run the command, printing the updated policy to stdout
    pub fn run(&self) -> Result<()> {
        let input = read_input(&self.file)?;
        let mut policy = PolicyDocument::parse(&input)?;

        let controllers = resolve_controllers(self.controllers.as_ref(), &policy);
        debug!(policy = %policy.metadata.name, %controllers, "resolved autogen controllers");

        policy.autogenerate(&controllers);
        print!("{}", render(&policy, self.output)?);
        Ok(())
    }
}

/// Flag, then annotation, then the default
pub fn resolve_controllers(flag: Option<&ControllerSet>, policy: &PolicyDocument) -> ControllerSet {
    flag.cloned()
        .or_else(|| policy.annotated_controllers())
        .unwrap_or_else(|| ControllerSet::parse(DEFAULT_AUTOGEN_CONTROLLERS))
}

/// Encode the policy in `format`
pub fn render(policy: &PolicyDocument, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Yaml => serde_yaml::to_string(policy)?,
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(policy)?;
            json.push('\n');
            json
        }
    })
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == STDIN_PATH {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input)?;
        return Ok(input);
    }
    std::fs::read_to_string(path).map_err(|source| Error::ReadPolicy {
        path: path.to_path_buf(),
        source,
    })
}
