mod error;
mod normalizer;
mod projection;
mod types;

pub use error::{EngineError, Result};
pub use normalizer::{
    convert, max_amount, per_paycheck_amount, round2, round_half_up, summarize,
    to_annual_dollar_amount, validate, ytd_contributions,
};
pub use projection::{chart_years, compare_scenarios, project, project_scenarios, terminal_value};
pub use types::{
    ContributionKind, ContributionLimits, ContributionSpec, ContributionSummary,
    DEFAULT_ANNUAL_LIMIT, PAYCHECKS_PER_YEAR, PlanParameters, ProjectionResult,
    ScenarioProjection, YearlyRow,
};
