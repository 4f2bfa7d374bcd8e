//! Fixed-installment loan calculations: the monthly payment (EMI), the
//! month-by-month amortization schedule, and currency conversion and
//! formatting for displaying the results.

pub mod currency;
pub mod error;
pub mod loan;

pub use currency::{
    convert_currency, format_currency, Currency, RateTable, DEFAULT_CURRENCY, DEFAULT_LOCALE,
};
pub use error::{LoanError, LoanResult};
pub use loan::{
    calculate_emi, generate_amortization_schedule, AmortizationRow, Loan, LoanParameters,
    ScheduleMethod,
};

#[cfg(test)]
mod tests {
    use super::{AmortizationRow, Loan, LoanError, RateTable};

    // verifies that types can implement the gated traits below
    fn is_normal<T: Sized + Send + Sync + Unpin>() {}

    #[test]
    fn normal_types() {
        is_normal::<AmortizationRow>();
        is_normal::<Loan>();
        is_normal::<RateTable>();
        is_normal::<LoanError>();
    }
}
