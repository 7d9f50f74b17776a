use serde::{Deserialize, Serialize};

pub const PAYCHECKS_PER_YEAR: u32 = 26;
pub const DEFAULT_ANNUAL_LIMIT: f64 = 24_500.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionKind {
    Percentage,
    #[serde(rename = "fixed", alias = "fixedPerPaycheck", alias = "fixed-per-paycheck")]
    FixedPerPaycheck,
}

/// A contribution as the participant entered it.
///
/// `amount` is in percentage points for [`ContributionKind::Percentage`] (6 means 6%) and in
/// dollars per paycheck for [`ContributionKind::FixedPerPaycheck`].
#[derive(Copy, Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ContributionSpec {
    #[serde(rename = "contributionType")]
    pub kind: ContributionKind,
    #[serde(rename = "contributionAmount")]
    pub amount: f64,
}

impl ContributionSpec {
    pub fn percentage(amount: f64) -> Self {
        Self {
            kind: ContributionKind::Percentage,
            amount,
        }
    }

    pub fn fixed_per_paycheck(amount: f64) -> Self {
        Self {
            kind: ContributionKind::FixedPerPaycheck,
            amount,
        }
    }
}

/// Rates here are fractions (0.07 = 7%), unlike [`ContributionSpec::amount`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanParameters {
    pub annual_salary: f64,
    #[serde(default)]
    pub current_balance: f64,
    pub age: u32,
    pub retirement_age: u32,
    #[serde(rename = "annualReturn")]
    pub annual_return_rate: f64,
    // Accepted and persisted; no projection reads it yet.
    #[serde(default, rename = "salaryIncrease")]
    pub salary_increase_rate: f64,
}

impl Default for PlanParameters {
    fn default() -> Self {
        Self {
            annual_salary: 80_000.0,
            current_balance: 0.0,
            age: 30,
            retirement_age: 65,
            annual_return_rate: 0.07,
            salary_increase_rate: 0.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContributionLimits {
    pub annual_limit: f64,
}

impl ContributionLimits {
    pub fn new(annual_limit: f64) -> Self {
        Self { annual_limit }
    }

    pub fn per_paycheck_limit(&self) -> f64 {
        self.annual_limit / PAYCHECKS_PER_YEAR as f64
    }
}

impl Default for ContributionLimits {
    fn default() -> Self {
        Self::new(DEFAULT_ANNUAL_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyRow {
    pub year: u32,
    pub start_value: f64,
    pub contribution: f64,
    pub returns: f64,
    pub end_value: f64,
    pub cumulative_contribution: f64,
    pub cumulative_returns: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub current_retirement_value: f64,
    pub future_retirement_value: f64,
    pub additional_savings: f64,
    pub years_to_retirement: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioProjection {
    pub years: u32,
    pub current: Vec<YearlyRow>,
    pub projected: Vec<YearlyRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSummary {
    pub percentage: f64,
    pub per_paycheck: f64,
    pub annual: f64,
}
