//! Payment symbols accepted for task fees

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Token a data price is denominated in
///
/// Records store the symbol as a plain string so that a record priced in an
/// unknown token can still be read; conversion happens when a task is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentSymbol {
    /// AO testnet credits
    #[serde(rename = "AOCRED")]
    Aocred,
    /// Wrapped AR, minimum unit 1e-12 wAR
    #[default]
    #[serde(rename = "wAR")]
    War,
}

impl PaymentSymbol {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentSymbol::Aocred => "AOCRED",
            PaymentSymbol::War => "wAR",
        }
    }
}

impl FromStr for PaymentSymbol {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AOCRED" => Ok(PaymentSymbol::Aocred),
            "wAR" => Ok(PaymentSymbol::War),
            other => Err(Error::UnsupportedPaymentSymbol(other.to_string())),
        }
    }
}

impl fmt::Display for PaymentSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
