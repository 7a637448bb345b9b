pub mod cli;
pub mod plan;

use balancer_relayer_orchestrator::config::RelayerConfig;
use balancer_relayer_orchestrator::encoding::{EncodingContext, RelayerMulticall};
use balancer_relayer_orchestrator::errors::Result;
use balancer_relayer_orchestrator::utils::string_to_address;
use balancer_relayer_orchestrator::{
    number_of_output_actions, order_actions, output_peeks, SimulationRequest, SimulatorBuilder,
};
use futures::future::join_all;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("relayer_plan=info,balancer_relayer_orchestrator=info")),
        )
        .compact()
        .with_file(false)
        .with_line_number(false)
        .with_target(false)
        .init();

    let args = cli::parse_cli_args()?;
    let simulation_types = args.simulation_types()?;
    let config = RelayerConfig::from_env(&args.chain)?;
    let user = string_to_address(&args.user)?;

    let plan = plan::load(&args.plan)?;
    let actions = order_actions(plan.build()?);
    tracing::info!(
        chain = %config.chain,
        actions = actions.len(),
        outputs = number_of_output_actions(&actions),
        "Plan ordered"
    );

    let mut multicall = RelayerMulticall::with_actions(EncodingContext::new(user, config.relayer_address), &actions);
    let peeks: Vec<usize> = output_peeks(&actions).into_iter().map(|reference| multicall.peek(reference)).collect();
    let output_indexes = if args.output_index.is_empty() { peeks } else { args.output_index.clone() };

    let calldata = multicall.encode();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "to": config.relayer_address.to_string(),
            "value": multicall.value().to_string(),
            "calls": multicall.calls().len(),
            "outputIndexes": output_indexes,
            "data": calldata.to_string(),
        }))?
    );

    if simulation_types.is_empty() {
        return Ok(());
    }

    let simulator = SimulatorBuilder::from_config(&config)?.build();
    let request = SimulationRequest {
        to: config.relayer_address,
        data: calldata,
        output_indexes,
        user,
        tokens_in: plan.assets.get(plan.operation.token_in_index).copied().into_iter().collect(),
        value: multicall.value(),
        paths: vec![actions],
    };

    let outcomes = join_all(simulation_types.iter().map(|&kind| simulator.simulate(&request, kind))).await;
    for (kind, outcome) in simulation_types.iter().zip(outcomes) {
        match outcome {
            Ok(outcome) => println!("{}", serde_json::to_string_pretty(&json!({ "simulation": kind.to_string(), "result": outcome }))?),
            Err(e) => tracing::error!(simulation = %kind, error = %e, "Simulation failed"),
        }
    }

    Ok(())
}
