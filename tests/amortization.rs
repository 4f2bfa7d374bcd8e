use approx::assert_relative_eq;
use loancalc::loan::{generate_amortization_schedule_with, round};
use loancalc::{
    calculate_emi, convert_currency, format_currency, generate_amortization_schedule, Loan,
    LoanError, LoanParameters, RateTable, ScheduleMethod,
};
use test_log::test;

const PRINCIPALS: [f64; 4] = [1000., 10000., 250000., 1_500_000.];
const RATES: [f64; 5] = [0., 0.1, 3.75, 7., 29.9];
const TERMS: [u32; 4] = [1, 5, 15, 30];

#[test]
fn emi_is_finite_and_positive_for_valid_loans() {
    for p in PRINCIPALS {
        for r in RATES {
            for t in TERMS {
                let emi = calculate_emi(p, r, t);
                assert!(emi.is_finite() && emi > 0., "emi {emi} for {p}, {r}%, {t}y");
                // never less than straight-line repayment
                assert!(emi >= p / f64::from(t * 12) - 1e-9);
            }
        }
    }
}

#[test]
fn schedules_hold_their_invariants() {
    for method in [ScheduleMethod::Iterative, ScheduleMethod::ClosedForm] {
        for p in PRINCIPALS {
            for r in RATES {
                for t in TERMS {
                    let rows = generate_amortization_schedule_with(method, p, r, t);
                    let count = t as usize * 12;
                    assert_eq!(rows.len(), count);

                    let months: Vec<u32> = rows.iter().map(|row| row.month).collect();
                    assert_eq!(months, (1..=t * 12).collect::<Vec<_>>());

                    for row in &rows {
                        assert!((row.payment - (row.principal + row.interest)).abs() < 1e-6);
                    }
                    for pair in rows.windows(2) {
                        assert!(pair[1].balance <= pair[0].balance);
                    }
                    let last = rows[count - 1].balance;
                    assert!(last.abs() < 1e-6 * p, "final balance {last} for {p}, {r}%, {t}y");

                    let paid: f64 = rows.iter().map(|row| row.interest + row.principal).sum();
                    assert_relative_eq!(paid, rows[0].payment * count as f64, max_relative = 1e-9);
                }
            }
        }
    }
}

#[test]
fn mortgage_scenario() {
    let loan = Loan::new(LoanParameters::new(250000., 5.5, 15).unwrap());

    assert_eq!(round(loan.pmt_amount(), 2.), 2042.71);
    assert_eq!(loan.pmt_count(), 180);

    let first = loan.pmt_detail(1).unwrap();
    assert_eq!(round(first.interest, 2.), 1145.83);
    assert_eq!(round(first.principal, 2.), 896.88);

    let last = loan.pmt_detail(180).unwrap();
    assert!(last.balance < 1e-6);
    assert_eq!(loan.schedule(), generate_amortization_schedule(250000., 5.5, 15));
}

#[test]
fn interest_free_scenario() {
    let loan = Loan::try_new(10000., 0., 1).unwrap();

    assert_relative_eq!(loan.pmt_amount(), 833.333_333_333, epsilon = 1e-6);
    assert!(loan.schedule().iter().all(|row| row.interest == 0.));
    assert_eq!(loan.total_interest(), 0.);
}

#[test]
fn invalid_input_is_rejected_before_computing() {
    assert_eq!(
        Loan::try_new(0., 5., 10),
        Err(LoanError::InvalidPrincipal { value: 0. })
    );
    assert_eq!(
        Loan::try_new(1000., 5., 0),
        Err(LoanError::InvalidTerm { value: 0. })
    );
    assert_eq!(
        Loan::try_new(1000., -1., 10),
        Err(LoanError::InvalidRate { value: -1. })
    );
    assert_eq!(
        LoanParameters::term_from_years(2.5),
        Err(LoanError::InvalidTerm { value: 2.5 })
    );
}

#[test]
fn converted_and_formatted_payment() {
    let rates = RateTable::builtin();
    let emi = calculate_emi(250000., 5.5, 15);

    assert_eq!(format_currency(emi, "USD", "en-US"), "$2,042.71");
    assert_eq!(convert_currency(emi, 1.), emi);

    let eur = rates.convert(emi, "EUR").unwrap();
    assert_relative_eq!(eur, emi * 0.91);
    assert_eq!(format_currency(eur, "EUR", "de-DE"), "1.858,86\u{a0}€");

    assert!(rates.convert(emi, "ZZZ").is_err());
}
