use crate::error::{LoanError, LoanResult};
use chrono::{Months, NaiveDate};
use log::{debug, trace};
use std::{fmt, str::FromStr};

/// Longest accepted term. Anything longer is rejected rather than
/// allocating a schedule of that size.
pub const MAX_TERM_YEARS: u32 = 100;

/// How the remaining balance is carried from one month to the next.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "kebab-case")
)]
pub enum ScheduleMethod {
    /// Subtract each month's principal portion from the running balance.
    /// The running balance is never clamped, only the reported one is.
    #[default]
    Iterative,
    /// Re-derive the remaining balance each month from the annuity formula,
    /// so rounding error does not accumulate over long terms.
    ClosedForm,
}

impl fmt::Display for ScheduleMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleMethod::Iterative => write!(f, "iterative"),
            ScheduleMethod::ClosedForm => write!(f, "closed-form"),
        }
    }
}

impl FromStr for ScheduleMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "iterative" => Ok(ScheduleMethod::Iterative),
            "closed-form" | "closed_form" | "closedform" => Ok(ScheduleMethod::ClosedForm),
            other => Err(format!(
                "unknown schedule method '{other}' (expected 'iterative' or 'closed-form')"
            )),
        }
    }
}

/// One month of an amortization schedule.
#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AmortizationRow {
    /// 1-based month number.
    pub month: u32,
    /// The fixed installment, identical on every row of a schedule.
    pub payment: f64,
    /// Portion of the payment that reduces the balance.
    pub principal: f64,
    /// Portion of the payment that covers interest accrued this month.
    pub interest: f64,
    /// Balance left after this payment, never below zero.
    pub balance: f64,
}

impl AmortizationRow {
    pub fn new(month: u32, payment: f64, principal: f64, interest: f64, balance: f64) -> Self {
        Self {
            month,
            payment,
            principal,
            interest,
            balance,
        }
    }
}

impl fmt::Display for AmortizationRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "month {}, payment {:.4}, principal {:.4}, interest {:.4}, balance {:.4}",
            self.month, self.payment, self.principal, self.interest, self.balance
        )
    }
}

/// Validated inputs for a fixed-installment loan.
///
/// The only way to build one is [`LoanParameters::new`], so a value of this
/// type always has a positive principal, a non-negative rate and a term of at
/// least one year.
#[derive(Clone, Copy, PartialEq, Debug)]
pub struct LoanParameters {
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
}

impl LoanParameters {
    pub fn new(principal: f64, annual_rate_percent: f64, term_years: u32) -> LoanResult<Self> {
        if !principal.is_finite() || principal <= 0. {
            return Err(LoanError::InvalidPrincipal { value: principal });
        }
        if term_years == 0 || term_years > MAX_TERM_YEARS {
            return Err(LoanError::InvalidTerm {
                value: f64::from(term_years),
            });
        }
        if !annual_rate_percent.is_finite() || annual_rate_percent < 0. {
            return Err(LoanError::InvalidRate {
                value: annual_rate_percent,
            });
        }
        Ok(Self {
            principal,
            annual_rate_percent,
            term_years,
        })
    }

    /// Converts a term given as a real number of years, rejecting anything
    /// that is not a whole number of years in range.
    pub fn term_from_years(years: f64) -> LoanResult<u32> {
        if !years.is_finite()
            || years < 1.
            || years.fract() != 0.
            || years > f64::from(MAX_TERM_YEARS)
        {
            return Err(LoanError::InvalidTerm { value: years });
        }
        Ok(years as u32)
    }

    /// Term conversion for computing without validation: non-positive terms
    /// become 0 (an empty schedule, non-finite payment), but a fractional or
    /// oversized term is still an error since it cannot be represented as a
    /// whole number of monthly payments.
    pub fn unchecked_term(years: f64) -> LoanResult<u32> {
        if years.is_nan() || years.fract() != 0. || years > f64::from(MAX_TERM_YEARS) {
            return Err(LoanError::InvalidTerm { value: years });
        }
        Ok(years.max(0.) as u32)
    }

    pub fn principal(&self) -> f64 {
        self.principal
    }

    pub fn annual_rate_percent(&self) -> f64 {
        self.annual_rate_percent
    }

    pub fn term_years(&self) -> u32 {
        self.term_years
    }

    pub fn monthly_rate(&self) -> f64 {
        get_monthly_rate(self.annual_rate_percent)
    }

    pub fn total_payments(&self) -> u32 {
        get_total_pmts(self.term_years)
    }
}

/// A validated loan with its installment and full schedule computed up front.
#[derive(PartialEq, Debug, Clone)]
pub struct Loan {
    pub params: LoanParameters,
    pub method: ScheduleMethod,
    pmt_amount: f64,
    scheduled_pmts: Vec<AmortizationRow>,
}

impl Loan {
    pub fn new(params: LoanParameters) -> Self {
        Self::with_method(params, ScheduleMethod::default())
    }

    pub fn with_method(params: LoanParameters, method: ScheduleMethod) -> Self {
        let pmt_amount = calculate_emi(
            params.principal,
            params.annual_rate_percent,
            params.term_years,
        );
        debug!(
            "new loan: principal {}, rate {}%, term {} years, payment {:.4} ({})",
            params.principal, params.annual_rate_percent, params.term_years, pmt_amount, method
        );
        Self {
            params,
            method,
            pmt_amount,
            scheduled_pmts: add_scheduled_pmts(
                &params.principal,
                &params.annual_rate_percent,
                &params.term_years,
                pmt_amount,
                method,
            ),
        }
    }

    /// Validates the raw inputs and builds the loan in one step.
    pub fn try_new(principal: f64, annual_rate_percent: f64, term_years: u32) -> LoanResult<Self> {
        LoanParameters::new(principal, annual_rate_percent, term_years).map(Self::new)
    }

    pub fn pmt_amount(&self) -> f64 {
        self.pmt_amount
    }

    pub fn pmt_count(&self) -> usize {
        self.scheduled_pmts.len()
    }

    pub fn pmt_detail(&self, month: usize) -> Option<&AmortizationRow> {
        month
            .checked_sub(1)
            .and_then(|idx| self.scheduled_pmts.get(idx))
    }

    pub fn pmt_info(&self, month: usize) -> String {
        match self.pmt_detail(month) {
            Some(row) => row.to_string(),
            None => "No payment information.".to_string(),
        }
    }

    pub fn schedule(&self) -> &[AmortizationRow] {
        &self.scheduled_pmts
    }

    pub fn into_schedule(self) -> Vec<AmortizationRow> {
        self.scheduled_pmts
    }

    pub fn total_interest(&self) -> f64 {
        self.scheduled_pmts.iter().map(|row| row.interest).sum()
    }

    pub fn total_paid(&self) -> f64 {
        self.pmt_amount * self.scheduled_pmts.len() as f64
    }

    pub fn payment_dates(&self, first_payment: NaiveDate) -> Vec<NaiveDate> {
        payment_dates(first_payment, self.scheduled_pmts.len())
    }

    pub fn payoff_date(&self, first_payment: NaiveDate) -> Option<NaiveDate> {
        let last = self.scheduled_pmts.len().checked_sub(1)?;
        first_payment.checked_add_months(Months::new(u32::try_from(last).ok()?))
    }
}

/// Fixed monthly installment that repays `principal` over `term_years` at a
/// nominal `annual_rate_percent` (5.5 means 5.5%).
///
/// Inputs are not checked. A zero term divides by zero and yields a
/// non-finite payment, and negative values flow straight through the
/// arithmetic. The payment count saturates at `u32::MAX` for absurd terms.
/// Use [`LoanParameters::new`] to reject them first.
pub fn calculate_emi(principal: f64, annual_rate_percent: f64, term_years: u32) -> f64 {
    let monthly_rate = get_monthly_rate(annual_rate_percent);
    let total_pmts = f64::from(get_total_pmts(term_years));

    if monthly_rate == 0. {
        return principal / total_pmts;
    }

    let factor = (1. + monthly_rate).powf(total_pmts);
    (principal * monthly_rate * factor) / (factor - 1.)
}

/// Month-by-month schedule with the running balance carried iteratively.
///
/// Returns exactly `term_years * 12` rows. Like [`calculate_emi`] this does no
/// validation: bad inputs produce rows full of non-finite values.
pub fn generate_amortization_schedule(
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
) -> Vec<AmortizationRow> {
    generate_amortization_schedule_with(
        ScheduleMethod::Iterative,
        principal,
        annual_rate_percent,
        term_years,
    )
}

pub fn generate_amortization_schedule_with(
    method: ScheduleMethod,
    principal: f64,
    annual_rate_percent: f64,
    term_years: u32,
) -> Vec<AmortizationRow> {
    let pmt_amount = calculate_emi(principal, annual_rate_percent, term_years);
    add_scheduled_pmts(
        &principal,
        &annual_rate_percent,
        &term_years,
        pmt_amount,
        method,
    )
}

/// Calendar dates of `count` monthly payments starting at `first_payment`.
///
/// Each date is offset from the first one rather than from its predecessor,
/// so a loan paid on the 31st lands on the last day of shorter months and
/// returns to the 31st afterwards.
pub fn payment_dates(first_payment: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map_while(|offset| {
            let offset = u32::try_from(offset).ok()?;
            first_payment.checked_add_months(Months::new(offset))
        })
        .collect()
}

/// Rounds `amt` to `dec` decimal places, half away from zero.
pub fn round(amt: f64, dec: f64) -> f64 {
    if amt == 0. {
        0.
    } else {
        (amt * 10_f64.powf(dec)).round() / 10_f64.powf(dec)
    }
}

// NaN passes through; `f64::max` would turn it into 0
fn floor_balance(balance: f64) -> f64 {
    if balance.is_nan() {
        balance
    } else {
        balance.max(0.)
    }
}

fn get_monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100. / 12.
}

fn get_total_pmts(term_years: u32) -> u32 {
    term_years.saturating_mul(12)
}

// balance outstanding after `month` payments, straight from the annuity formula
fn closed_form_balance(principal: f64, monthly_rate: f64, pmt_amount: f64, month: u32) -> f64 {
    if monthly_rate == 0. {
        return principal - pmt_amount * f64::from(month);
    }
    let factor = (1. + monthly_rate).powf(f64::from(month));
    principal * factor - pmt_amount * (factor - 1.) / monthly_rate
}

fn add_scheduled_pmts(
    &principal: &f64,           // amount borrowed
    &annual_rate_percent: &f64, // nominal annual rate as a percentage (i.e., 5.5)
    &term_years: &u32,          // term of loan in whole years
    pmt_amount: f64,            // fixed monthly installment
    method: ScheduleMethod,
) -> Vec<AmortizationRow> {
    let monthly_rate = get_monthly_rate(annual_rate_percent);
    let total_pmts = get_total_pmts(term_years);

    let mut sched_pmt = Vec::with_capacity(total_pmts as usize);
    let mut balance = principal; // unclamped; only the emitted balance is floored

    for month in 1..=total_pmts {
        let interest = balance * monthly_rate;
        let principal_paid = pmt_amount - interest;

        balance = match method {
            ScheduleMethod::Iterative => balance - principal_paid,
            ScheduleMethod::ClosedForm => {
                closed_form_balance(principal, monthly_rate, pmt_amount, month)
            }
        };
        trace!(
            "month {}, interest {}, principal {}, end bal {}",
            month,
            interest,
            principal_paid,
            balance
        );

        sched_pmt.push(AmortizationRow::new(
            month,
            pmt_amount,
            principal_paid,
            interest,
            floor_balance(balance),
        ));
    }
    sched_pmt
}
