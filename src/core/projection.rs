use super::error::{EngineError, Result};
use super::normalizer::{round_half_up, to_annual_dollar_amount};
use super::types::{
    ContributionSpec, PlanParameters, ProjectionResult, ScenarioProjection, YearlyRow,
};

impl PlanParameters {
    /// Negative once the retirement age has passed.
    pub fn years_to_retirement(&self) -> i64 {
        i64::from(self.retirement_age) - i64::from(self.age)
    }

    pub fn validate(&self) -> Result<()> {
        if self.retirement_age < self.age {
            return Err(EngineError::InvalidPlanParameters(format!(
                "retirement age {} must be >= current age {}",
                self.retirement_age, self.age
            )));
        }
        if !self.annual_salary.is_finite() || self.annual_salary < 0.0 {
            return Err(EngineError::InvalidPlanParameters(
                "annual salary must be >= 0".to_string(),
            ));
        }
        if !self.current_balance.is_finite() || self.current_balance < 0.0 {
            return Err(EngineError::InvalidPlanParameters(
                "current balance must be >= 0".to_string(),
            ));
        }
        if !self.annual_return_rate.is_finite() {
            return Err(EngineError::InvalidPlanParameters(
                "annual return rate must be finite".to_string(),
            ));
        }
        if !self.salary_increase_rate.is_finite() {
            return Err(EngineError::InvalidPlanParameters(
                "salary increase rate must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Year-by-year breakdown of a balance growing under a fixed annual contribution.
///
/// The contribution is derived from `annual_salary` once and held constant for every year;
/// salary growth is not reapplied. `years` below 1 is treated as 1.
pub fn project(
    initial_balance: f64,
    annual_salary: f64,
    spec: &ContributionSpec,
    annual_return_rate: f64,
    years: u32,
) -> Vec<YearlyRow> {
    let years = years.max(1);
    let annual_contribution = to_annual_dollar_amount(spec, annual_salary);

    let mut rows: Vec<YearlyRow> = Vec::with_capacity(years as usize);
    let mut balance = initial_balance;
    for year in 1..=years {
        let pre_return = balance + annual_contribution;
        let returns = pre_return * annual_return_rate;
        let end_value = pre_return + returns;
        let (prev_contribution, prev_returns) = rows
            .last()
            .map(|row| (row.cumulative_contribution, row.cumulative_returns))
            .unwrap_or((0.0, 0.0));

        rows.push(YearlyRow {
            year,
            start_value: balance,
            contribution: annual_contribution,
            returns,
            end_value,
            cumulative_contribution: prev_contribution + annual_contribution,
            cumulative_returns: prev_returns + returns,
        });
        balance = end_value;
    }
    rows
}

pub fn terminal_value(
    initial_balance: f64,
    annual_contribution: f64,
    annual_return_rate: f64,
    years: u32,
) -> f64 {
    let growth = 1.0 + annual_return_rate;
    (0..years).fold(initial_balance, |value, _| {
        (value + annual_contribution) * growth
    })
}

pub fn compare_scenarios(
    plan: &PlanParameters,
    current: &ContributionSpec,
    projected: &ContributionSpec,
) -> ProjectionResult {
    let years_to_retirement = plan.years_to_retirement();
    let years = u32::try_from(years_to_retirement.max(0)).unwrap_or(u32::MAX);

    let scenario_value = |spec: &ContributionSpec| {
        terminal_value(
            plan.current_balance,
            to_annual_dollar_amount(spec, plan.annual_salary),
            plan.annual_return_rate,
            years,
        )
    };
    let current_value = scenario_value(current);
    let future_value = scenario_value(projected);

    ProjectionResult {
        current_retirement_value: round_half_up(current_value),
        future_retirement_value: round_half_up(future_value),
        additional_savings: round_half_up(future_value - current_value),
        years_to_retirement,
    }
}

/// Number of rows drawn for a plan: years until retirement, never fewer than one.
pub fn chart_years(plan: &PlanParameters) -> u32 {
    u32::try_from(plan.years_to_retirement().max(1)).unwrap_or(u32::MAX)
}

pub fn project_scenarios(
    plan: &PlanParameters,
    current: &ContributionSpec,
    projected: &ContributionSpec,
) -> ScenarioProjection {
    let years = chart_years(plan);
    let series = |spec: &ContributionSpec| {
        project(
            plan.current_balance,
            plan.annual_salary,
            spec,
            plan.annual_return_rate,
            years,
        )
    };

    ScenarioProjection {
        years,
        current: series(current),
        projected: series(projected),
    }
}
