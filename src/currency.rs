//! Currency conversion and display formatting.
//!
//! Amounts are computed in the base currency (USD) and converted for display
//! with a plain multiplier. Rates come from a [`RateTable`], which is either
//! the built-in fallback table or a payload returned by an exchange-rate
//! service.

use crate::error::{LoanError, LoanResult};
use log::debug;
use rust_decimal::{Decimal, RoundingStrategy};
use std::{collections::BTreeMap, str::FromStr};

pub const BASE_CURRENCY: &str = "USD";
pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_LOCALE: &str = "en-US";

const NBSP: char = '\u{a0}';
const NARROW_NBSP: char = '\u{202f}';

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Currency {
    pub code: String,
    pub name: String,
    /// Units of this currency per one unit of the base currency.
    pub rate: f64,
}

impl Currency {
    pub fn new(code: &str, name: &str, rate: f64) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            rate,
        }
    }
}

/// Rates used when no live table is available.
pub fn default_currencies() -> Vec<Currency> {
    vec![
        Currency::new("USD", "US Dollar", 1.),
        Currency::new("EUR", "Euro", 0.91),
        Currency::new("GBP", "British Pound", 0.78),
        Currency::new("JPY", "Japanese Yen", 151.72),
        Currency::new("CAD", "Canadian Dollar", 1.36),
        Currency::new("AUD", "Australian Dollar", 1.51),
    ]
}

const CURRENCY_NAMES: &[(&str, &str)] = &[
    ("AED", "UAE Dirham"),
    ("AUD", "Australian Dollar"),
    ("BRL", "Brazilian Real"),
    ("CAD", "Canadian Dollar"),
    ("CHF", "Swiss Franc"),
    ("CNY", "Chinese Yuan"),
    ("DKK", "Danish Krone"),
    ("EUR", "Euro"),
    ("GBP", "British Pound"),
    ("HKD", "Hong Kong Dollar"),
    ("ILS", "Israeli Shekel"),
    ("INR", "Indian Rupee"),
    ("JPY", "Japanese Yen"),
    ("KRW", "South Korean Won"),
    ("MXN", "Mexican Peso"),
    ("NOK", "Norwegian Krone"),
    ("NZD", "New Zealand Dollar"),
    ("PLN", "Polish Złoty"),
    ("RUB", "Russian Ruble"),
    ("SEK", "Swedish Krona"),
    ("SGD", "Singapore Dollar"),
    ("THB", "Thai Baht"),
    ("TRY", "Turkish Lira"),
    ("USD", "US Dollar"),
    ("ZAR", "South African Rand"),
];

/// Display name for a currency code, or the code itself when unknown.
pub fn currency_name(code: &str) -> String {
    let code = code.to_ascii_uppercase();
    CURRENCY_NAMES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or(code.clone(), |(_, name)| name.to_string())
}

/// Converts a base-currency amount with the target currency's rate.
///
/// The rate is not checked; zero or negative rates give zero or negative
/// amounts.
pub fn convert_currency(amount: f64, rate: f64) -> f64 {
    amount * rate
}

/// Formats `amount` as a currency string with exactly two fraction digits.
///
/// Grouping, decimal separator, symbol placement and the negative sign follow
/// `locale`. Unsupported locales are formatted as `en-US`. Currency codes with
/// no known symbol are shown as the upper-cased code. `NaN` is rendered as
/// `NaN` and infinities as `∞`, with the usual symbol and sign around them.
///
/// Amounts are rounded half away from zero on their shortest decimal form,
/// so `1.005` shows as `1.01`. Symbols come from a small table: the locale's
/// own currency and a few per-locale overrides, otherwise one shared
/// international symbol per code. Pairs outside that table may differ from
/// the full CLDR data.
pub fn format_currency(amount: f64, currency_code: &str, locale: &str) -> String {
    let fmt = locale_format(locale);
    let code = currency_code.to_ascii_uppercase();
    let symbol = currency_symbol(fmt, &code);

    let number = if amount.is_nan() {
        "NaN".to_string()
    } else if amount.is_infinite() {
        "∞".to_string()
    } else {
        format_number(amount.abs(), fmt)
    };
    let sign = if amount.is_sign_negative() && !amount.is_nan() {
        "-"
    } else {
        ""
    };

    if fmt.symbol_after {
        format!("{sign}{number}{NBSP}{symbol}")
    } else if symbol.ends_with(|c: char| c.is_alphabetic()) {
        // letters never touch the digits: "USD 1,234.50", "$1,234.50"
        format!("{sign}{symbol}{NBSP}{number}")
    } else {
        format!("{sign}{symbol}{number}")
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
enum Grouping {
    /// 1,234,567
    Thousands,
    /// 12,34,567
    Indian,
}

#[derive(Debug)]
struct LocaleFormat {
    tag: &'static str,
    group: char,
    decimal: char,
    grouping: Grouping,
    symbol_after: bool,
    home_currency: &'static str,
    home_symbol: &'static str,
    /// Symbols that differ from the shared table in this locale.
    overrides: &'static [(&'static str, &'static str)],
}

const LOCALES: &[LocaleFormat] = &[
    LocaleFormat {
        tag: "en-US",
        group: ',',
        decimal: '.',
        grouping: Grouping::Thousands,
        symbol_after: false,
        home_currency: "USD",
        home_symbol: "$",
        overrides: &[],
    },
    LocaleFormat {
        tag: "en-GB",
        group: ',',
        decimal: '.',
        grouping: Grouping::Thousands,
        symbol_after: false,
        home_currency: "GBP",
        home_symbol: "£",
        overrides: &[],
    },
    LocaleFormat {
        tag: "en-CA",
        group: ',',
        decimal: '.',
        grouping: Grouping::Thousands,
        symbol_after: false,
        home_currency: "CAD",
        home_symbol: "$",
        overrides: &[],
    },
    LocaleFormat {
        tag: "en-AU",
        group: ',',
        decimal: '.',
        grouping: Grouping::Thousands,
        symbol_after: false,
        home_currency: "AUD",
        home_symbol: "$",
        overrides: &[("USD", "USD")],
    },
    LocaleFormat {
        tag: "en-IN",
        group: ',',
        decimal: '.',
        grouping: Grouping::Indian,
        symbol_after: false,
        home_currency: "INR",
        home_symbol: "₹",
        overrides: &[("USD", "$")],
    },
    LocaleFormat {
        tag: "de-DE",
        group: '.',
        decimal: ',',
        grouping: Grouping::Thousands,
        symbol_after: true,
        home_currency: "EUR",
        home_symbol: "€",
        overrides: &[("USD", "$"), ("AUD", "AU$")],
    },
    LocaleFormat {
        tag: "fr-FR",
        group: NARROW_NBSP,
        decimal: ',',
        grouping: Grouping::Thousands,
        symbol_after: true,
        home_currency: "EUR",
        home_symbol: "€",
        overrides: &[
            ("USD", "$US"),
            ("CAD", "$CA"),
            ("AUD", "$AU"),
            ("GBP", "£GB"),
        ],
    },
    LocaleFormat {
        tag: "ja-JP",
        group: ',',
        decimal: '.',
        grouping: Grouping::Thousands,
        symbol_after: false,
        home_currency: "JPY",
        home_symbol: "￥",
        overrides: &[("USD", "$")],
    },
];

const SYMBOLS: &[(&str, &str)] = &[
    ("AUD", "A$"),
    ("BRL", "R$"),
    ("CAD", "CA$"),
    ("CNY", "CN¥"),
    ("EUR", "€"),
    ("GBP", "£"),
    ("HKD", "HK$"),
    ("ILS", "₪"),
    ("INR", "₹"),
    ("JPY", "¥"),
    ("KRW", "₩"),
    ("MXN", "MX$"),
    ("NZD", "NZ$"),
    ("USD", "US$"),
];

fn locale_format(locale: &str) -> &'static LocaleFormat {
    let tag = locale.replace('_', "-");
    let language = tag.split('-').next().unwrap_or_default();

    LOCALES
        .iter()
        .find(|l| l.tag.eq_ignore_ascii_case(&tag))
        .or_else(|| {
            LOCALES.iter().find(|l| {
                l.tag
                    .split('-')
                    .next()
                    .is_some_and(|lang| lang.eq_ignore_ascii_case(language))
            })
        })
        .unwrap_or_else(|| {
            debug!("unsupported locale '{}', formatting as {}", locale, DEFAULT_LOCALE);
            &LOCALES[0]
        })
}

fn currency_symbol<'a>(fmt: &'static LocaleFormat, code: &'a str) -> &'a str {
    if code == fmt.home_currency {
        return fmt.home_symbol;
    }
    fmt.overrides
        .iter()
        .chain(SYMBOLS)
        .find(|(c, _)| *c == code)
        .map_or(code, |(_, s)| *s)
}

// `amount` is finite and non-negative
fn format_number(amount: f64, fmt: &LocaleFormat) -> String {
    let digits = round_cents(amount);
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut out = group_digits(int_part, fmt.group, fmt.grouping);
    out.push(fmt.decimal);
    out.push_str(frac_part);
    out
}

// rounds the shortest decimal form of `amount`, not its binary value
fn round_cents(amount: f64) -> String {
    match Decimal::from_str(&amount.to_string()) {
        Ok(value) => {
            let mut cents =
                value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            cents.rescale(2);
            cents.to_string()
        }
        // beyond Decimal's range there are no cents left to round
        Err(_) => format!("{:.2}", amount),
    }
}

fn group_digits(int_part: &str, sep: char, grouping: Grouping) -> String {
    let len = int_part.len();
    let mut out = String::with_capacity(len + len / 2);
    for (idx, ch) in int_part.chars().enumerate() {
        let remaining = len - idx;
        if idx > 0 && needs_separator(remaining, grouping) {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

// whether a separator goes before a digit with `remaining` digits left (itself included)
fn needs_separator(remaining: usize, grouping: Grouping) -> bool {
    match grouping {
        Grouping::Thousands => remaining % 3 == 0,
        Grouping::Indian => remaining == 3 || (remaining > 3 && (remaining - 3) % 2 == 0),
    }
}

/// Exchange rates keyed by currency code, relative to [`BASE_CURRENCY`].
#[derive(Clone, PartialEq, Debug)]
pub struct RateTable {
    rates: BTreeMap<String, f64>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RateTable {
    pub fn builtin() -> Self {
        Self::from_rates(default_currencies().into_iter().map(|c| (c.code, c.rate)))
    }

    pub fn from_rates<I, S>(rates: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        Self {
            rates: rates
                .into_iter()
                .map(|(code, rate)| (code.as_ref().to_ascii_uppercase(), rate))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn rate(&self, code: &str) -> LoanResult<f64> {
        let code = code.to_ascii_uppercase();
        self.rates
            .get(&code)
            .copied()
            .ok_or(LoanError::UnknownCurrency { code })
    }

    pub fn convert(&self, amount: f64, code: &str) -> LoanResult<f64> {
        self.rate(code).map(|rate| convert_currency(amount, rate))
    }

    /// All known currencies, sorted by code.
    pub fn currencies(&self) -> Vec<Currency> {
        self.rates
            .iter()
            .map(|(code, rate)| Currency {
                code: code.clone(),
                name: currency_name(code),
                rate: *rate,
            })
            .collect()
    }

    /// Currencies whose code or name contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<Currency> {
        let query = query.to_lowercase();
        self.currencies()
            .into_iter()
            .filter(|c| {
                c.code.to_lowercase().contains(&query) || c.name.to_lowercase().contains(&query)
            })
            .collect()
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RatesPayload {
    result: String,
    #[serde(default, alias = "error-type")]
    error: Option<String>,
    #[serde(default)]
    conversion_rates: BTreeMap<String, f64>,
}

#[cfg(feature = "serde")]
impl RateTable {
    /// Parses an exchange-rate service response of the form
    /// `{"result": "success", "conversion_rates": {"EUR": 0.91, ...}}`.
    pub fn from_json(payload: &str) -> LoanResult<Self> {
        let payload: RatesPayload =
            serde_json::from_str(payload).map_err(|e| LoanError::RatesUnavailable {
                reason: format!("malformed payload: {e}"),
            })?;

        if payload.result != "success" {
            return Err(LoanError::RatesUnavailable {
                reason: format!(
                    "API returned error: {}",
                    payload.error.as_deref().unwrap_or("Unknown error")
                ),
            });
        }
        if payload.conversion_rates.is_empty() {
            return Err(LoanError::RatesUnavailable {
                reason: "no conversion rates in payload".to_string(),
            });
        }
        debug!("loaded {} exchange rates", payload.conversion_rates.len());
        Ok(Self::from_rates(payload.conversion_rates))
    }

    /// Like [`RateTable::from_json`], but falls back to the built-in table.
    pub fn from_json_or_builtin(payload: &str) -> Self {
        Self::from_json(payload).unwrap_or_else(|e| {
            log::warn!("{e}; using built-in exchange rates");
            Self::builtin()
        })
    }
}
