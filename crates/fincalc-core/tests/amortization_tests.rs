use fincalc_core::amortization::{build_amortization, Amortization, AmortizationInput, Amortize};
use fincalc_core::decimal::{checked_powi, round_money};
use fincalc_core::rate::{Rate, RateKind};
use fincalc_core::FinCalcError;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn apr(value: Decimal, months: u32) -> Rate {
    Rate::new(value, RateKind::Apr).unwrap().with_duration(months)
}

fn thirty_year() -> Rate {
    apr(dec!(0.0375), 360)
}

/// Interest charged in `period` on a level-payment loan.
fn expected_interest(principal: Decimal, rate: Decimal, payment: Decimal, period: i64) -> Decimal {
    let growth = checked_powi(Decimal::ONE + rate, period - 1).unwrap();
    -round_money(-rate * principal * growth - payment * (growth - Decimal::ONE))
}

// ===========================================================================
// Fixed rate: 200,000 at 3.75% over 30 years
// ===========================================================================

#[test]
fn test_fixed_rate_schedule() {
    let principal = dec!(200000);
    let schedule = Amortization::new(principal, &[thirty_year()]).unwrap();

    assert_eq!(schedule.principal(), principal);
    assert_eq!(schedule.balance(), Decimal::ZERO);
    assert_eq!(schedule.duration(), 360);
    assert_eq!(schedule.payment(), Some(dec!(-926.23)));
    assert_eq!(schedule.payments().last().copied(), Some(dec!(-926.96)));
    assert_eq!(schedule.total_payments(), dec!(-333443.53));
    assert_eq!(schedule.total_interest(), dec!(133443.53));
}

#[test]
fn test_fixed_rate_interest_matches_closed_form() {
    let principal = dec!(200000);
    let rate = thirty_year();
    let schedule = Amortization::new(principal, &[rate]).unwrap();
    let payment = schedule.payment().unwrap();

    for (i, interest) in schedule.interest().iter().enumerate() {
        let expected = expected_interest(principal, rate.monthly(), payment, i as i64 + 1);
        assert!(
            (*interest - expected).abs() <= dec!(0.01),
            "period {}: {interest} vs {expected}",
            i + 1
        );
    }
}

#[test]
fn test_fixed_rate_has_no_additional_payments() {
    let schedule = Amortization::new(dec!(200000), &[thirty_year()]).unwrap();
    assert!(schedule.additional_payments().iter().all(|a| a.is_zero()));
}

// ===========================================================================
// Adjustable rate: 3.75% rising 1% every 3 years
// ===========================================================================

fn arm_rates() -> Vec<Rate> {
    (0..10)
        .map(|adj| apr(dec!(0.0375) + dec!(0.01) * Decimal::from(adj), 36))
        .collect()
}

#[test]
fn test_adjustable_rate_schedule() {
    let principal = dec!(200000);
    let schedule = Amortization::new(principal, &arm_rates()).unwrap();

    assert_eq!(schedule.principal(), principal);
    assert_eq!(schedule.balance(), Decimal::ZERO);
    assert_eq!(schedule.duration(), 360);
    assert_eq!(schedule.payment(), None);
    assert_eq!(schedule.payments().last().copied(), Some(dec!(-1601.78)));
    assert_eq!(schedule.total_payments(), dec!(-477505.92));
    assert_eq!(schedule.total_interest(), dec!(277505.92));
}

#[test]
fn test_adjustable_rate_payments_step_every_three_years() {
    let levels = [
        dec!(-926.23),
        dec!(-1033.73),
        dec!(-1137.32),
        dec!(-1235.39),
        dec!(-1326.30),
        dec!(-1408.27),
        dec!(-1479.28),
        dec!(-1537.03),
        dec!(-1578.84),
        dec!(-1601.66),
    ];
    let schedule = Amortization::new(dec!(200000), &arm_rates()).unwrap();
    let payments = schedule.payments();

    for (i, payment) in payments[..payments.len() - 1].iter().enumerate() {
        assert_eq!(*payment, levels[i / 36], "period {}", i + 1);
    }
}

// ===========================================================================
// Extra payments: 100 more every month
// ===========================================================================

#[test]
fn test_extra_payment_schedule() {
    let principal = dec!(200000);
    let schedule =
        Amortization::with_adjustment(principal, &[thirty_year()], |p| p.payment - dec!(100))
            .unwrap();

    assert_eq!(schedule.principal(), principal);
    assert_eq!(schedule.balance(), Decimal::ZERO);
    assert_eq!(schedule.duration(), 301);
    assert_eq!(schedule.payment(), Some(dec!(-1026.23)));
    assert_eq!(schedule.payments().last().copied(), Some(dec!(-1011.09)));
    assert_eq!(schedule.total_payments(), dec!(-308880.09));
    assert_eq!(schedule.total_additional(), dec!(-30084.86));
    assert_eq!(schedule.total_interest(), dec!(108880.09));
}

#[test]
fn test_components_sum_to_payment() {
    let schedule =
        Amortization::with_adjustment(dec!(200000), &arm_rates(), |p| p.payment - dec!(250))
            .unwrap();
    for p in schedule.periods() {
        assert_eq!(p.payment, p.principal + p.additional - p.interest);
    }
    let retired: Decimal = schedule
        .periods()
        .iter()
        .map(|p| p.principal + p.additional)
        .sum();
    assert_eq!(retired, dec!(-200000));
}

// ===========================================================================
// Edge cases
// ===========================================================================

#[test]
fn test_zero_rate() {
    let schedule = Amortization::new(dec!(10000), &[apr(Decimal::ZERO, 360)]).unwrap();
    assert_eq!(schedule.duration(), 360);
    assert_eq!(schedule.balance(), Decimal::ZERO);
    assert_eq!(schedule.payment(), Some(dec!(-27.78)));
    assert_eq!(schedule.payments().last().copied(), Some(dec!(-26.98)));
    assert_eq!(schedule.total_interest(), Decimal::ZERO);
}

#[test]
fn test_underpayment_is_settled_in_final_period() {
    // Paying less than the level payment leaves a balloon for the last period.
    let schedule =
        Amortization::with_adjustment(dec!(12000), &[apr(dec!(0.06), 12)], |p| {
            p.payment + dec!(50)
        })
        .unwrap();
    assert_eq!(schedule.duration(), 12);
    assert_eq!(schedule.balance(), Decimal::ZERO);
    let payments = schedule.payments();
    assert!(payments[11] < payments[0]);
}

#[test]
fn test_missing_duration_is_rejected() {
    let rate = Rate::new(dec!(0.0375), RateKind::Apr).unwrap();
    let err = Amortization::new(dec!(200000), &[thirty_year(), rate]).unwrap_err();
    match err {
        FinCalcError::InvalidInput { field, .. } => assert_eq!(field, "rates[1].duration"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_equality_and_extension_trait() {
    let rate = thirty_year();
    assert_eq!(
        dec!(300000).amortize(&[rate]).unwrap(),
        Amortization::new(dec!(300000), &[rate]).unwrap()
    );
    assert_eq!(
        dec!(300000)
            .amortize_with(&[rate], |p| p.payment - dec!(300))
            .unwrap(),
        Amortization::with_adjustment(dec!(300000), &[rate], |p| p.payment - dec!(300)).unwrap()
    );
    assert_ne!(
        dec!(300000).amortize(&[rate]).unwrap(),
        dec!(300001).amortize(&[rate]).unwrap()
    );
}

#[test]
fn test_unchanged_adjustment_matches_plain_schedule() {
    let rates = [apr(dec!(0.12), 12)];
    let plain = Amortization::new(dec!(1000), &rates).unwrap();
    let adjusted = Amortization::with_adjustment(dec!(1000), &rates, |p| p.payment).unwrap();

    assert_eq!(adjusted, plain);
    assert_eq!(adjusted.total_additional(), Decimal::ZERO);
    let last = adjusted.periods().last().unwrap();
    assert_eq!(last.principal, dec!(-87.96));
    assert_eq!(last.additional, Decimal::ZERO);
}

#[test]
fn test_final_extra_payment_is_reduced_by_payoff() {
    let schedule = Amortization::with_adjustment(dec!(200000), &[thirty_year()], |p| {
        p.payment - dec!(100)
    })
    .unwrap();
    let additional = schedule.additional_payments();
    let (last, regular) = additional.split_last().unwrap();

    assert!(regular.iter().all(|a| *a == dec!(-100)));
    assert!(*last <= Decimal::ZERO && *last > dec!(-100));
    assert_eq!(schedule.total_additional(), dec!(-30084.86));
}

#[test]
fn test_rate_too_high_for_closed_growth_still_amortizes() {
    // 1.25^360 is outside the decimal range.
    let schedule = Amortization::new(dec!(1000), &[apr(dec!(3.0), 360)]).unwrap();

    assert_eq!(schedule.duration(), 360);
    assert_eq!(schedule.payment(), Some(dec!(-250.00)));
    assert_eq!(schedule.balance(), Decimal::ZERO);
    assert_eq!(schedule.payments().last().copied(), Some(dec!(-1250.00)));
    assert_eq!(schedule.total_interest(), dec!(90000.00));
}

#[test]
fn test_spans_after_payoff_are_not_priced() {
    let rates = [apr(dec!(0.05), 12), apr(dec!(3.0), 348)];
    let schedule = Amortization::with_adjustment(dec!(1000), &rates, |_| dec!(-5000)).unwrap();

    assert_eq!(schedule.duration(), 1);
    assert_eq!(schedule.payments(), vec![dec!(-1004.17)]);
    assert_eq!(schedule.balance(), Decimal::ZERO);
    assert_eq!(schedule.scheduled_duration(), 360);
}

#[test]
fn test_multiple_spans_report_varying_payment() {
    let rates = [apr(dec!(0.05), 12), apr(dec!(0.05), 348)];
    let schedule = Amortization::new(dec!(100000), &rates).unwrap();
    assert_eq!(schedule.payment(), None);
    assert_eq!(schedule.balance(), Decimal::ZERO);
}

#[test]
fn test_display_includes_principal() {
    let schedule = Amortization::new(dec!(10000.00), &[thirty_year()]).unwrap();
    let label = schedule.to_string();
    assert!(label.contains("Amortization"));
    assert!(label.contains("10000.00"));
}

// ===========================================================================
// JSON entry point
// ===========================================================================

#[test]
fn test_build_amortization_from_json() {
    let json = r#"{
        "principal": "200000",
        "rates": [{ "value": "0.0375", "kind": "apr", "duration": 360 }]
    }"#;
    let input: AmortizationInput = serde_json::from_str(json).unwrap();
    let out = build_amortization(&input).unwrap();

    assert_eq!(out.result.duration, 360);
    assert_eq!(out.result.payment, Some(dec!(-926.23)));
    assert_eq!(out.result.final_payment, Some(dec!(-926.96)));
    assert_eq!(out.result.total_interest, dec!(133443.53));
    assert_eq!(out.result.total_principal, dec!(-200000));
    assert!(out.warnings.is_empty());
    assert_eq!(out.methodology, "Fixed-rate level-payment amortization");
}
