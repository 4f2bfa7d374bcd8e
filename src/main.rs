use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser};
use loancalc::currency::{currency_name, format_currency, RateTable};
use loancalc::loan::{
    calculate_emi, generate_amortization_schedule_with, payment_dates, AmortizationRow, Loan,
    LoanParameters, ScheduleMethod,
};
use loancalc::{DEFAULT_CURRENCY, DEFAULT_LOCALE};
use log::{debug, info, warn};
use simple_logger::SimpleLogger;
use std::path::{Path, PathBuf};

/// Monthly installment and amortization schedule for a fixed-rate loan
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Amount borrowed, in USD
    #[arg(short, long)]
    principal: f64,

    /// Nominal annual interest rate in percent (5.5 means 5.5%)
    #[arg(short, long, allow_negative_numbers = true)]
    rate: f64,

    /// Loan term in whole years (1 to 100)
    #[arg(short, long, allow_negative_numbers = true)]
    years: f64,

    /// Currency to display amounts in
    #[arg(short, long, env = "LOANCALC_CURRENCY", default_value = DEFAULT_CURRENCY)]
    currency: String,

    /// Locale used to format amounts
    #[arg(short, long, env = "LOANCALC_LOCALE", default_value = DEFAULT_LOCALE)]
    locale: String,

    /// Exchange-rate service response (JSON) to use instead of the built-in rates
    #[arg(long, env = "LOANCALC_RATES")]
    rates: Option<PathBuf>,

    /// How the remaining balance is carried between months (iterative, closed-form)
    #[arg(long, default_value_t = ScheduleMethod::Iterative)]
    method: ScheduleMethod,

    /// Date of the first payment (YYYY-MM-DD); adds a date column
    #[arg(long)]
    first_payment: Option<NaiveDate>,

    /// Skip principal and rate validation and compute with whatever was given;
    /// the term must still be a whole number of years (at most 100), and terms
    /// of zero or less give an empty schedule
    #[arg(long)]
    unchecked: bool,

    /// Print only the payment summary, not the full schedule
    #[arg(long)]
    summary: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    SimpleLogger::new().with_level(level).init()?;
    debug!("{:?}", cli);

    let rates = load_rates(cli.rates.as_deref())?;
    let fx_rate = rates
        .rate(&cli.currency)
        .with_context(|| format!("cannot display amounts in {}", cli.currency))?;

    let (pmt_amount, schedule) = if cli.unchecked {
        warn!("input validation disabled");
        let term_years = LoanParameters::unchecked_term(cli.years)?;
        (
            calculate_emi(cli.principal, cli.rate, term_years),
            generate_amortization_schedule_with(cli.method, cli.principal, cli.rate, term_years),
        )
    } else {
        let term_years = LoanParameters::term_from_years(cli.years)?;
        let params = LoanParameters::new(cli.principal, cli.rate, term_years)?;
        let loan = Loan::with_method(params, cli.method);
        (loan.pmt_amount(), loan.into_schedule())
    };

    let dates = cli
        .first_payment
        .map(|first| payment_dates(first, schedule.len()))
        .unwrap_or_default();

    let display = Presenter {
        code: &cli.currency,
        locale: &cli.locale,
        fx_rate,
    };

    info!(
        "{} at {}% over {} years, shown in {} ({})",
        display.amount(cli.principal),
        cli.rate,
        cli.years,
        cli.currency.to_ascii_uppercase(),
        currency_name(&cli.currency)
    );
    print_summary(&display, pmt_amount, &schedule, dates.last());
    if !cli.summary {
        print_schedule(&display, &schedule, &dates);
    }
    Ok(())
}

fn load_rates(path: Option<&Path>) -> Result<RateTable> {
    let Some(path) = path else {
        return Ok(RateTable::builtin());
    };
    let payload = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read rates file: {}", path.display()))?;
    Ok(RateTable::from_json_or_builtin(&payload))
}

struct Presenter<'a> {
    code: &'a str,
    locale: &'a str,
    fx_rate: f64,
}

impl Presenter<'_> {
    fn amount(&self, usd: f64) -> String {
        format_currency(
            loancalc::convert_currency(usd, self.fx_rate),
            self.code,
            self.locale,
        )
    }
}

fn print_summary(
    display: &Presenter,
    pmt_amount: f64,
    schedule: &[AmortizationRow],
    payoff: Option<&NaiveDate>,
) {
    let total_interest: f64 = schedule.iter().map(|row| row.interest).sum();
    let total_paid = pmt_amount * schedule.len() as f64;

    println!("Monthly payment:  {}", display.amount(pmt_amount));
    println!("Payments:         {}", schedule.len());
    println!("Total interest:   {}", display.amount(total_interest));
    println!("Total paid:       {}", display.amount(total_paid));
    if let Some(payoff) = payoff {
        println!("Payoff date:      {}", payoff);
    }
}

fn print_schedule(display: &Presenter, schedule: &[AmortizationRow], dates: &[NaiveDate]) {
    println!();
    for (idx, row) in schedule.iter().enumerate() {
        let date = dates
            .get(idx)
            .map(|d| format!("{}  ", d))
            .unwrap_or_default();
        println!(
            "{:>5}  {}{:>16} {:>16} {:>16} {:>18}",
            row.month,
            date,
            display.amount(row.payment),
            display.amount(row.principal),
            display.amount(row.interest),
            display.amount(row.balance),
        );
    }
}
