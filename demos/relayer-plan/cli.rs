use balancer_relayer_orchestrator::errors::{ConfigError, Result};
use balancer_relayer_orchestrator::SimulationType;
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Order, batch and encode a Balancer relayer plan", long_about = None)]
pub struct Args {
    #[clap(long, env = "RELAYER_CHAIN", default_value = "ethereum", help = "Target blockchain (ethereum, polygon, arbitrum, gnosis)")]
    pub chain: String,

    #[clap(long, help = "Path to the JSON plan describing the operation's actions")]
    pub plan: PathBuf,

    #[clap(long, env = "RELAYER_USER", help = "Address that funds the operation and receives its outputs")]
    pub user: String,

    #[clap(long, value_delimiter = ',', help = "Comma-separated simulation strategies to run (tenderly, vault_model, static)")]
    pub simulation: Vec<String>,

    #[clap(long, value_delimiter = ',', help = "Multicall result indexes to read as outputs. Defaults to one peek per output delivered to the user.")]
    pub output_index: Vec<usize>,
}

impl Args {
    /// Parsed simulation strategies, in the order given
    pub fn simulation_types(&self) -> Result<Vec<SimulationType>> {
        self.simulation
            .iter()
            .map(|value| SimulationType::from_str(value.trim()).map_err(Into::into))
            .collect()
    }
}

pub fn parse_cli_args() -> Result<Args> {
    let args = Args::parse();

    if !args.plan.exists() {
        return Err(ConfigError::InvalidValue {
            name: "plan".to_string(),
            message: format!("{} does not exist", args.plan.display()),
        }
        .into());
    }

    tracing::debug!(chain = %args.chain, plan = %args.plan.display(), "Parsed CLI arguments");
    Ok(args)
}
