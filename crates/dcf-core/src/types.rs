use std::fmt;
use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{DcfError, OrOverflow};
use crate::DcfResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Multiples (e.g., 10x EV/EBITDA)
pub type Multiple = Decimal;

const ONE_HUNDRED: Decimal = dec!(100);

/// A percentage in percent units (`Percent(5)` is 5%).
///
/// Caller-facing records carry `Percent`; the engine computes with [`Rate`].
/// No arithmetic is defined on this type; [`Percent::to_rate`] is the only
/// conversion into the model.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Percent(Decimal);

impl Percent {
    pub const ZERO: Percent = Percent(Decimal::ZERO);

    pub const fn new(value: Decimal) -> Self {
        Percent(value)
    }

    /// Converts a float coming from an untyped source. `NaN`, infinities and
    /// values outside the decimal range are rejected.
    pub fn from_f64(field: &str, value: f64) -> DcfResult<Self> {
        Decimal::from_f64(value).map(Percent).ok_or_else(|| {
            DcfError::assumptions(field, format!("{value} is not a finite percentage"))
        })
    }

    /// Back-converts a fractional rate, e.g. for reporting a computed WACC.
    pub fn from_rate(rate: Rate) -> DcfResult<Self> {
        rate.checked_mul(ONE_HUNDRED)
            .or_overflow("percent from rate")
            .map(Percent)
    }

    /// The raw percent-unit value.
    pub fn value(self) -> Decimal {
        self.0
    }

    /// Fractional form used by the model (5% -> 0.05).
    pub fn to_rate(self) -> Rate {
        self.0 / ONE_HUNDRED
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0.normalize())
    }
}

impl FromStr for Percent {
    type Err = rust_decimal::Error;

    /// Accepts `5`, `5.5` or `5.5%`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
        Decimal::from_str(digits).map(Percent)
    }
}

/// Currency code. Opaque to the valuation math.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Currency {
    GBP,
    #[default]
    USD,
    EUR,
    SEK,
    NOK,
    DKK,
    CHF,
    JPY,
    CAD,
    AUD,
    Other(String),
}

impl Currency {
    pub fn code(&self) -> &str {
        match self {
            Currency::GBP => "GBP",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::SEK => "SEK",
            Currency::NOK => "NOK",
            Currency::DKK => "DKK",
            Currency::CHF => "CHF",
            Currency::JPY => "JPY",
            Currency::CAD => "CAD",
            Currency::AUD => "AUD",
            Currency::Other(code) => code,
        }
    }
}

impl From<&str> for Currency {
    fn from(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "GBP" => Currency::GBP,
            "USD" => Currency::USD,
            "EUR" => Currency::EUR,
            "SEK" => Currency::SEK,
            "NOK" => Currency::NOK,
            "DKK" => Currency::DKK,
            "CHF" => Currency::CHF,
            "JPY" => Currency::JPY,
            "CAD" => Currency::CAD,
            "AUD" => Currency::AUD,
            other => Currency::Other(other.to_string()),
        }
    }
}

impl From<String> for Currency {
    fn from(code: String) -> Self {
        Currency::from(code.as_str())
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_string()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_to_rate() {
        assert_eq!(Percent::new(dec!(5)).to_rate(), dec!(0.05));
        assert_eq!(Percent::new(dec!(-2.5)).to_rate(), dec!(-0.025));
        assert_eq!(Percent::ZERO.to_rate(), Decimal::ZERO);
    }

    #[test]
    fn test_percent_from_rate() {
        assert_eq!(Percent::from_rate(dec!(0.084785)).unwrap(), Percent::new(dec!(8.4785)));
    }

    #[test]
    fn test_percent_parse() {
        assert_eq!("5".parse::<Percent>().unwrap(), Percent::new(dec!(5)));
        assert_eq!("2.5%".parse::<Percent>().unwrap(), Percent::new(dec!(2.5)));
        assert_eq!(" -1.5 % ".parse::<Percent>().unwrap(), Percent::new(dec!(-1.5)));
        assert!("abc".parse::<Percent>().is_err());
    }

    #[test]
    fn test_percent_from_non_finite_float() {
        assert!(Percent::from_f64("wacc_pct", f64::NAN).is_err());
        assert!(Percent::from_f64("wacc_pct", f64::INFINITY).is_err());
        assert_eq!(
            Percent::from_f64("wacc_pct", 10.0).unwrap(),
            Percent::new(dec!(10))
        );
    }

    #[test]
    fn test_percent_serializes_as_plain_decimal() {
        let json = serde_json::to_value(Percent::new(dec!(2.5))).unwrap();
        assert_eq!(json, serde_json::json!("2.5"));
        let back: Percent = serde_json::from_value(serde_json::json!(2.5)).unwrap();
        assert_eq!(back, Percent::new(dec!(2.5)));
    }

    #[test]
    fn test_currency_is_opaque_code() {
        assert_eq!(Currency::from("sek"), Currency::SEK);
        assert_eq!(Currency::from("BRL"), Currency::Other("BRL".into()));
        let json = serde_json::to_value(Currency::Other("BRL".into())).unwrap();
        assert_eq!(json, serde_json::json!("BRL"));
        let back: Currency = serde_json::from_value(serde_json::json!("USD")).unwrap();
        assert_eq!(back, Currency::USD);
    }

    #[test]
    fn test_percent_display() {
        assert_eq!(Percent::new(dec!(10.50)).to_string(), "10.5%");
    }
}
