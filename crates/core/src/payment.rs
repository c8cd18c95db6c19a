use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub i64);

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PaymentId(pub i64);

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Option<TenantId>,
    pub name: String,
    pub email: Option<String>,
    pub unit: Option<String>,
}

impl Tenant {
    pub fn new(name: &str) -> Self {
        Tenant {
            id: None,
            name: name.to_string(),
            email: None,
            unit: None,
        }
    }
}

/// A rent payment expected (or recorded) on the ledger side. Imported bank
/// transactions are matched against these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalPayment {
    pub id: Option<PaymentId>,
    pub tenant_id: TenantId,
    pub tenant_name: String,
    pub amount: Money,
    pub paid_on: NaiveDate,
    pub memo: Option<String>,
}

/// How a bank transaction got linked to a payment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrigin {
    Auto,
    Manual,
}

impl fmt::Display for MatchOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchOrigin::Auto => write!(f, "auto"),
            MatchOrigin::Manual => write!(f, "manual"),
        }
    }
}

impl std::str::FromStr for MatchOrigin {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(MatchOrigin::Auto),
            "manual" => Ok(MatchOrigin::Manual),
            other => Err(format!("Unknown match origin: '{other}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn match_origin_round_trip() {
        assert_eq!(
            MatchOrigin::from_str(&MatchOrigin::Auto.to_string()).unwrap(),
            MatchOrigin::Auto
        );
        assert_eq!(
            MatchOrigin::from_str(&MatchOrigin::Manual.to_string()).unwrap(),
            MatchOrigin::Manual
        );
    }

    #[test]
    fn match_origin_rejects_unknown() {
        assert!(MatchOrigin::from_str("guessed").is_err());
    }

    #[test]
    fn ids_display_as_plain_numbers() {
        assert_eq!(PaymentId(42).to_string(), "42");
        assert_eq!(TenantId(7).to_string(), "7");
    }
}
