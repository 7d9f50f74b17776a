use anyhow::anyhow;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;
use tracing::debug;

use crate::api::{MAX_AGE, ServerConfig, run_http_server};
use crate::core::{
    ContributionKind, ContributionLimits, ContributionSpec, DEFAULT_ANNUAL_LIMIT, PlanParameters,
    ProjectionResult, ScenarioProjection, compare_scenarios, convert, project_scenarios, validate,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliContributionKind {
    Percentage,
    Fixed,
}

impl From<CliContributionKind> for ContributionKind {
    fn from(value: CliContributionKind) -> Self {
        match value {
            CliContributionKind::Percentage => ContributionKind::Percentage,
            CliContributionKind::Fixed => ContributionKind::FixedPerPaycheck,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "paycheck",
    about = "401(k) contribution planner: edit a contribution rate and project its effect at retirement"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Compare a current and a projected contribution and print the yearly breakdown as JSON
    Project(ProjectArgs),
    /// Re-express a contribution as a percentage or as a per-paycheck amount
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "CONTRIB_PORT", default_value_t = 3000)]
    port: u16,
    #[arg(
        long,
        env = "CONTRIB_DATA_FILE",
        default_value = "data.json",
        help = "JSON file holding the participant's saved settings"
    )]
    data_file: PathBuf,
    #[arg(long, help = "Keep settings in memory only; nothing is written to disk")]
    ephemeral: bool,
    #[arg(
        long,
        env = "CONTRIB_ANNUAL_LIMIT",
        default_value_t = DEFAULT_ANNUAL_LIMIT,
        help = "Annual contribution limit in dollars"
    )]
    annual_limit: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, help = "Annual salary in dollars")]
    salary: f64,
    #[arg(long, default_value_t = 0.0, help = "Current account balance")]
    balance: f64,
    #[arg(long)]
    age: u32,
    #[arg(long, default_value_t = 65)]
    retirement_age: u32,
    #[arg(
        long,
        default_value_t = 7.0,
        help = "Expected annual return in percent, e.g. 7"
    )]
    return_rate: f64,
    #[arg(
        long,
        default_value_t = 0.0,
        help = "Expected annual salary increase in percent (recorded, not yet projected)"
    )]
    salary_increase: f64,
    #[arg(long, value_enum, default_value_t = CliContributionKind::Percentage)]
    current_type: CliContributionKind,
    #[arg(
        long,
        help = "Current contribution: percent of salary, or dollars per paycheck"
    )]
    current_amount: f64,
    #[arg(long, value_enum, help = "Defaults to --current-type")]
    projected_type: Option<CliContributionKind>,
    #[arg(long)]
    projected_amount: f64,
    #[arg(long, env = "CONTRIB_ANNUAL_LIMIT", default_value_t = DEFAULT_ANNUAL_LIMIT)]
    annual_limit: f64,
}

#[derive(Args, Debug, Clone)]
pub struct ConvertArgs {
    #[arg(long)]
    salary: f64,
    #[arg(long = "type", value_enum)]
    kind: CliContributionKind,
    #[arg(long)]
    amount: f64,
    #[arg(long, env = "CONTRIB_ANNUAL_LIMIT", default_value_t = DEFAULT_ANNUAL_LIMIT)]
    annual_limit: f64,
}

#[derive(Debug)]
struct ProjectionInputs {
    plan: PlanParameters,
    current: ContributionSpec,
    projected: ContributionSpec,
    limits: ContributionLimits,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectionReport {
    comparison: ProjectionResult,
    projection: ScenarioProjection,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => {
            let config = build_server_config(args).map_err(|msg| anyhow!(msg))?;
            run_http_server(config).await?;
        }
        Command::Project(args) => {
            let inputs = build_projection_inputs(args).map_err(|msg| anyhow!(msg))?;
            let report = run_projection(&inputs)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Convert(args) => {
            let converted = run_convert(&args)?;
            println!("{}", serde_json::to_string_pretty(&converted)?);
        }
    }
    Ok(())
}

fn check_limit(annual_limit: f64) -> Result<ContributionLimits, String> {
    if !annual_limit.is_finite() || annual_limit <= 0.0 {
        return Err("--annual-limit must be > 0".to_string());
    }
    Ok(ContributionLimits::new(annual_limit))
}

fn build_server_config(args: ServeArgs) -> Result<ServerConfig, String> {
    let limits = check_limit(args.annual_limit)?;
    Ok(ServerConfig {
        port: args.port,
        data_file: (!args.ephemeral).then_some(args.data_file),
        limits,
    })
}

fn build_projection_inputs(args: ProjectArgs) -> Result<ProjectionInputs, String> {
    if !args.salary.is_finite() || args.salary < 0.0 {
        return Err("--salary must be >= 0".to_string());
    }

    if !args.balance.is_finite() || args.balance < 0.0 {
        return Err("--balance must be >= 0".to_string());
    }

    if args.retirement_age < args.age {
        return Err("--retirement-age must be >= --age".to_string());
    }

    if args.retirement_age > MAX_AGE {
        return Err(format!("--retirement-age must be <= {MAX_AGE}"));
    }

    if !args.return_rate.is_finite() || args.return_rate <= -100.0 {
        return Err("--return-rate must be > -100".to_string());
    }

    if !args.salary_increase.is_finite() {
        return Err("--salary-increase must be a number".to_string());
    }

    let limits = check_limit(args.annual_limit)?;
    let current_kind: ContributionKind = args.current_type.into();
    let projected_kind: ContributionKind =
        args.projected_type.unwrap_or(args.current_type).into();

    Ok(ProjectionInputs {
        plan: PlanParameters {
            annual_salary: args.salary,
            current_balance: args.balance,
            age: args.age,
            retirement_age: args.retirement_age,
            annual_return_rate: args.return_rate / 100.0,
            salary_increase_rate: args.salary_increase / 100.0,
        },
        current: ContributionSpec {
            kind: current_kind,
            amount: args.current_amount,
        },
        projected: ContributionSpec {
            kind: projected_kind,
            amount: args.projected_amount,
        },
        limits,
    })
}

fn run_projection(inputs: &ProjectionInputs) -> crate::core::Result<ProjectionReport> {
    validate(&inputs.current, inputs.plan.annual_salary, &inputs.limits)?;
    validate(&inputs.projected, inputs.plan.annual_salary, &inputs.limits)?;

    let comparison = compare_scenarios(&inputs.plan, &inputs.current, &inputs.projected);
    let projection = project_scenarios(&inputs.plan, &inputs.current, &inputs.projected);
    debug!(
        years = comparison.years_to_retirement,
        additional = comparison.additional_savings,
        "projection complete"
    );
    Ok(ProjectionReport {
        comparison,
        projection,
    })
}

fn run_convert(args: &ConvertArgs) -> anyhow::Result<ContributionSpec> {
    let limits = check_limit(args.annual_limit).map_err(|msg| anyhow!(msg))?;
    let spec = ContributionSpec {
        kind: args.kind.into(),
        amount: args.amount,
    };
    validate(&spec, args.salary, &limits)?;

    let target = match spec.kind {
        ContributionKind::Percentage => ContributionKind::FixedPerPaycheck,
        ContributionKind::FixedPerPaycheck => ContributionKind::Percentage,
    };
    Ok(convert(&spec, target, args.salary, &limits))
}
