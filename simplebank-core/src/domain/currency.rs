//! Supported currencies

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::result::Error;

/// A currency an account can be denominated in
///
/// Balances and amounts are always integers in the currency's minor unit
/// (cents for all currently supported currencies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eur,
    Cad,
}

impl Currency {
    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Cad];

    /// ISO 4217 code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Cad => "CAD",
        }
    }

    /// Number of decimal places in the minor unit
    pub fn minor_unit_scale(&self) -> u32 {
        2
    }

    /// Convert an amount in minor units to a decimal for display
    pub fn to_decimal(&self, minor_units: i64) -> Decimal {
        Decimal::new(minor_units, self.minor_unit_scale())
    }

    /// True if the code names a supported currency
    pub fn is_supported(code: &str) -> bool {
        code.parse::<Currency>().is_ok()
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "CAD" => Ok(Currency::Cad),
            other => Err(Error::invalid_argument(format!(
                "unsupported currency: {}",
                other
            ))),
        }
    }
}
