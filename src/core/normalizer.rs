use super::error::{EngineError, Result};
use super::types::{
    ContributionKind, ContributionLimits, ContributionSpec, ContributionSummary,
    PAYCHECKS_PER_YEAR,
};

const PAYCHECKS: f64 = PAYCHECKS_PER_YEAR as f64;

/// Rounds half-way cases toward positive infinity (`-2.5` becomes `-2`).
pub fn round_half_up(value: f64) -> f64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

/// Rounds to cents for dollar amounts, or to basis points for percentages.
pub fn round2(value: f64) -> f64 {
    round_half_up(value * 100.0) / 100.0
}

pub fn to_annual_dollar_amount(spec: &ContributionSpec, annual_salary: f64) -> f64 {
    match spec.kind {
        ContributionKind::Percentage => annual_salary * spec.amount / 100.0,
        ContributionKind::FixedPerPaycheck => spec.amount * PAYCHECKS,
    }
}

pub fn per_paycheck_amount(spec: &ContributionSpec, annual_salary: f64) -> f64 {
    match spec.kind {
        ContributionKind::Percentage => (annual_salary / PAYCHECKS) * spec.amount / 100.0,
        ContributionKind::FixedPerPaycheck => spec.amount,
    }
}

/// Largest amount the limit allows, in the representation given by `kind`.
pub fn max_amount(kind: ContributionKind, annual_salary: f64, limits: &ContributionLimits) -> f64 {
    match kind {
        ContributionKind::FixedPerPaycheck => limits.per_paycheck_limit(),
        ContributionKind::Percentage => {
            if annual_salary > 0.0 {
                (limits.annual_limit / annual_salary * 100.0).min(100.0)
            } else {
                100.0
            }
        }
    }
}

/// Re-expresses `spec` in the `target` representation, keeping the dollars withheld per
/// paycheck constant. The result is rounded to two decimals and clamped into the legal range.
pub fn convert(
    spec: &ContributionSpec,
    target: ContributionKind,
    annual_salary: f64,
    limits: &ContributionLimits,
) -> ContributionSpec {
    if spec.kind == target {
        return *spec;
    }

    let per_paycheck_salary = annual_salary / PAYCHECKS;
    let amount = match target {
        ContributionKind::FixedPerPaycheck => round2(per_paycheck_salary * spec.amount / 100.0),
        ContributionKind::Percentage => {
            if per_paycheck_salary > 0.0 {
                round2(spec.amount / per_paycheck_salary * 100.0)
            } else {
                0.0
            }
        }
    };
    let max = max_amount(target, annual_salary, limits);

    ContributionSpec {
        kind: target,
        // `f64::clamp` panics on a negative or NaN bound.
        amount: amount.min(max).max(0.0),
    }
}

pub fn validate(
    spec: &ContributionSpec,
    annual_salary: f64,
    limits: &ContributionLimits,
) -> Result<()> {
    if !spec.amount.is_finite() || spec.amount < 0.0 {
        return Err(EngineError::InvalidAmount {
            amount: spec.amount,
        });
    }

    let exceeded = match spec.kind {
        ContributionKind::FixedPerPaycheck => spec.amount > limits.per_paycheck_limit(),
        ContributionKind::Percentage => annual_salary * spec.amount / 100.0 > limits.annual_limit,
    };
    if exceeded {
        let max = match spec.kind {
            ContributionKind::FixedPerPaycheck => limits.per_paycheck_limit(),
            // Only reachable with a positive salary.
            ContributionKind::Percentage => limits.annual_limit / annual_salary * 100.0,
        };
        return Err(EngineError::LimitExceeded {
            kind: spec.kind,
            max,
        });
    }

    Ok(())
}

pub fn summarize(spec: &ContributionSpec, annual_salary: f64) -> ContributionSummary {
    let per_paycheck = per_paycheck_amount(spec, annual_salary);
    let percentage = match spec.kind {
        ContributionKind::Percentage => spec.amount,
        ContributionKind::FixedPerPaycheck => {
            let per_paycheck_salary = annual_salary / PAYCHECKS;
            if per_paycheck_salary > 0.0 {
                per_paycheck / per_paycheck_salary * 100.0
            } else {
                0.0
            }
        }
    };

    ContributionSummary {
        percentage,
        per_paycheck,
        annual: to_annual_dollar_amount(spec, annual_salary),
    }
}

pub fn ytd_contributions(
    spec: &ContributionSpec,
    annual_salary: f64,
    paychecks_processed: u32,
) -> f64 {
    per_paycheck_amount(spec, annual_salary) * paychecks_processed as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assume, proptest};

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn limits() -> ContributionLimits {
        ContributionLimits::default()
    }

    #[test]
    fn round_half_up_matches_reference_rounding() {
        assert_approx(round_half_up(2.5), 3.0);
        assert_approx(round_half_up(-2.5), -2.0);
        assert_approx(round_half_up(-2.6), -3.0);
        assert_approx(round_half_up(10_271.4999), 10_271.0);
        assert_approx(round2(184.615_384_6), 184.62);
    }

    #[test]
    fn annual_amount_uses_percentage_points_of_salary() {
        let spec = ContributionSpec::percentage(6.0);
        assert_approx(to_annual_dollar_amount(&spec, 80_000.0), 4_800.0);
    }

    #[test]
    fn annual_amount_for_fixed_multiplies_by_paychecks() {
        let spec = ContributionSpec::fixed_per_paycheck(300.0);
        assert_approx(to_annual_dollar_amount(&spec, 80_000.0), 7_800.0);
        assert_approx(to_annual_dollar_amount(&spec, 0.0), 7_800.0);
    }

    #[test]
    fn convert_percentage_to_fixed_keeps_per_paycheck_dollars() {
        let spec = ContributionSpec::percentage(6.0);
        let fixed = convert(
            &spec,
            ContributionKind::FixedPerPaycheck,
            80_000.0,
            &limits(),
        );
        assert_eq!(fixed.kind, ContributionKind::FixedPerPaycheck);
        assert_approx(fixed.amount, 184.62);
        // the input is untouched
        assert_approx(spec.amount, 6.0);
    }

    #[test]
    fn convert_fixed_to_percentage_rounds_to_basis_points() {
        let spec = ContributionSpec::fixed_per_paycheck(184.62);
        let pct = convert(&spec, ContributionKind::Percentage, 80_000.0, &limits());
        assert_eq!(pct.kind, ContributionKind::Percentage);
        assert_approx(pct.amount, 6.0);
    }

    #[test]
    fn convert_to_same_kind_is_identity() {
        let spec = ContributionSpec::percentage(12.345);
        let same = convert(&spec, ContributionKind::Percentage, 80_000.0, &limits());
        assert_eq!(same, spec);
    }

    #[test]
    fn convert_clamps_fixed_to_per_paycheck_limit() {
        let spec = ContributionSpec::percentage(50.0);
        let fixed = convert(
            &spec,
            ContributionKind::FixedPerPaycheck,
            200_000.0,
            &limits(),
        );
        assert_approx(fixed.amount, limits().per_paycheck_limit());
    }

    #[test]
    fn convert_clamps_percentage_to_limit_share_of_salary() {
        let spec = ContributionSpec::fixed_per_paycheck(900.0);
        let pct = convert(&spec, ContributionKind::Percentage, 20_000.0, &limits());
        // 24 500 exceeds the whole salary, so the cap is 100%
        assert_approx(pct.amount, 100.0);

        let over = ContributionSpec::fixed_per_paycheck(2_000.0);
        let pct = convert(&over, ContributionKind::Percentage, 30_000.0, &limits());
        assert_approx(pct.amount, 24_500.0 / 30_000.0 * 100.0);
    }

    #[test]
    fn convert_tolerates_negative_or_nan_limits() {
        let spec = ContributionSpec::percentage(6.0);
        let negative = ContributionLimits::new(-1_000.0);
        let fixed = convert(&spec, ContributionKind::FixedPerPaycheck, 80_000.0, &negative);
        assert_approx(fixed.amount, 0.0);

        let nan = ContributionLimits::new(f64::NAN);
        let fixed = convert(&spec, ContributionKind::FixedPerPaycheck, 80_000.0, &nan);
        assert_approx(fixed.amount, 184.62);
        let back = ContributionSpec::fixed_per_paycheck(184.62);
        let pct = convert(&back, ContributionKind::Percentage, 80_000.0, &nan);
        assert_approx(pct.amount, 6.0);
    }

    #[test]
    fn convert_with_zero_salary_yields_zero() {
        let fixed = ContributionSpec::fixed_per_paycheck(250.0);
        let pct = convert(&fixed, ContributionKind::Percentage, 0.0, &limits());
        assert_approx(pct.amount, 0.0);

        let pct = ContributionSpec::percentage(10.0);
        let fixed = convert(&pct, ContributionKind::FixedPerPaycheck, 0.0, &limits());
        assert_approx(fixed.amount, 0.0);
    }

    #[test]
    fn validate_rejects_fixed_above_per_paycheck_limit() {
        let spec = ContributionSpec::fixed_per_paycheck(1_000.0);
        let err = validate(&spec, 40_000.0, &limits()).expect_err("must exceed limit");
        match err {
            EngineError::LimitExceeded { kind, max } => {
                assert_eq!(kind, ContributionKind::FixedPerPaycheck);
                assert_approx(round2(max), 942.31);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(
            err_message(&spec, 40_000.0),
            "per-paycheck contribution cannot exceed $942.31"
        );
    }

    fn err_message(spec: &ContributionSpec, salary: f64) -> String {
        validate(spec, salary, &limits())
            .expect_err("must fail")
            .to_string()
    }

    #[test]
    fn validate_rejects_percentage_above_annual_limit() {
        let spec = ContributionSpec::percentage(25.0);
        let err = validate(&spec, 100_000.0, &limits()).expect_err("must exceed limit");
        let EngineError::LimitExceeded { kind, max } = err else {
            panic!("unexpected error {err:?}");
        };
        assert_eq!(kind, ContributionKind::Percentage);
        assert_approx(max, 24.5);
        assert_eq!(
            err_message(&spec, 100_000.0),
            "contribution percentage cannot exceed 24.50%"
        );
    }

    #[test]
    fn validate_accepts_amounts_at_the_limit() {
        let at_limit = ContributionSpec::fixed_per_paycheck(limits().per_paycheck_limit());
        assert!(validate(&at_limit, 40_000.0, &limits()).is_ok());
        assert!(validate(&ContributionSpec::percentage(24.5), 100_000.0, &limits()).is_ok());
        assert!(validate(&ContributionSpec::percentage(100.0), 0.0, &limits()).is_ok());
    }

    #[test]
    fn validate_rejects_negative_and_non_finite_amounts() {
        for amount in [-0.01, f64::NAN, f64::INFINITY] {
            let spec = ContributionSpec::percentage(amount);
            let err = validate(&spec, 80_000.0, &limits()).expect_err("must reject");
            assert!(matches!(err, EngineError::InvalidAmount { .. }));
        }
    }

    #[test]
    fn validate_uses_configured_limit() {
        let custom = ContributionLimits::new(23_000.0);
        let spec = ContributionSpec::percentage(25.0);
        assert!(validate(&spec, 94_000.0, &limits()).is_ok());
        assert!(validate(&spec, 94_000.0, &custom).is_err());
    }

    #[test]
    fn max_amount_per_representation() {
        assert_approx(
            max_amount(ContributionKind::FixedPerPaycheck, 80_000.0, &limits()),
            24_500.0 / 26.0,
        );
        assert_approx(
            max_amount(ContributionKind::Percentage, 49_000.0, &limits()),
            50.0,
        );
        assert_approx(max_amount(ContributionKind::Percentage, 0.0, &limits()), 100.0);
    }

    #[test]
    fn summarize_reports_both_representations() {
        let summary = summarize(&ContributionSpec::fixed_per_paycheck(300.0), 78_000.0);
        assert_approx(summary.per_paycheck, 300.0);
        assert_approx(summary.percentage, 10.0);
        assert_approx(summary.annual, 7_800.0);

        let summary = summarize(&ContributionSpec::fixed_per_paycheck(300.0), 0.0);
        assert_approx(summary.percentage, 0.0);
    }

    #[test]
    fn ytd_contributions_scale_with_paychecks_processed() {
        let spec = ContributionSpec::percentage(6.0);
        let ytd = ytd_contributions(&spec, 80_000.0, 20);
        assert!((ytd - 3_692.307_692).abs() < 1e-5);
        assert_approx(
            ytd_contributions(&ContributionSpec::fixed_per_paycheck(300.0), 0.0, 4),
            1_200.0,
        );
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config {
            max_global_rejects: 8192,
            ..proptest::test_runner::Config::with_cases(256)
        })]

        #[test]
        fn prop_percentage_round_trip_through_fixed(
            salary_cents in 1_000_000u64..50_000_000,
            pct_bp in 0u32..10_001
        ) {
            let salary = salary_cents as f64 / 100.0;
            let pct = pct_bp as f64 / 100.0;
            let limits = ContributionLimits::default();
            prop_assume!(pct <= max_amount(ContributionKind::Percentage, salary, &limits));

            let spec = ContributionSpec::percentage(pct);
            let fixed = convert(&spec, ContributionKind::FixedPerPaycheck, salary, &limits);
            let back = convert(&fixed, ContributionKind::Percentage, salary, &limits);
            prop_assert!(
                (back.amount - pct).abs() <= 0.01 + 1e-9,
                "{pct} -> {} -> {}", fixed.amount, back.amount
            );
        }

        #[test]
        fn prop_validate_enforces_annual_limit(
            salary_cents in 0u64..100_000_000,
            amount_cents in 0u64..1_000_000
        ) {
            let salary = salary_cents as f64 / 100.0;
            let amount = amount_cents as f64 / 100.0;
            let limits = ContributionLimits::default();

            let pct = ContributionSpec::percentage(amount / 100.0);
            let pct_over = salary * pct.amount / 100.0 > 24_500.0;
            prop_assert!(validate(&pct, salary, &limits).is_err() == pct_over);

            let fixed = ContributionSpec::fixed_per_paycheck(amount);
            let fixed_over = amount > 24_500.0 / 26.0;
            prop_assert!(validate(&fixed, salary, &limits).is_err() == fixed_over);
        }

        #[test]
        fn prop_convert_stays_within_legal_range(
            salary_cents in 0u64..100_000_000,
            amount_cents in 0u64..500_000
        ) {
            let salary = salary_cents as f64 / 100.0;
            let amount = amount_cents as f64 / 100.0;
            let limits = ContributionLimits::default();

            let fixed = convert(
                &ContributionSpec::percentage(amount / 50.0),
                ContributionKind::FixedPerPaycheck,
                salary,
                &limits,
            );
            prop_assert!(fixed.amount >= 0.0 && fixed.amount <= limits.per_paycheck_limit());

            let pct = convert(
                &ContributionSpec::fixed_per_paycheck(amount),
                ContributionKind::Percentage,
                salary,
                &limits,
            );
            prop_assert!(pct.amount >= 0.0 && pct.amount <= 100.0);
        }
    }
}
