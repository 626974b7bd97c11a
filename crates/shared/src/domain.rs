use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifiers arrive either as JSON integers or as numeric strings.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum WireId {
    Int(i64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("identifier {0:?} is not an integer")]
pub struct InvalidId(pub String);

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "WireId")]
        pub struct $name(pub i64);

        impl TryFrom<WireId> for $name {
            type Error = InvalidId;

            fn try_from(value: WireId) -> Result<Self, Self::Error> {
                match value {
                    WireId::Int(id) => Ok(Self(id)),
                    WireId::Text(raw) => raw
                        .trim()
                        .parse::<i64>()
                        .map(Self)
                        .map_err(|_| InvalidId(raw)),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_newtype!(LoanId);
id_newtype!(PaymentId);

/// Repayment status as computed by the loan service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LoanStatus {
    OnTime,
    Late,
    Defaulted,
    Unpaid,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized loan status {0:?}")]
pub struct UnknownStatus(pub String);

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::OnTime,
        LoanStatus::Late,
        LoanStatus::Defaulted,
        LoanStatus::Unpaid,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LoanStatus::OnTime => "On Time",
            LoanStatus::Late => "Late",
            LoanStatus::Defaulted => "Defaulted",
            LoanStatus::Unpaid => "Unpaid",
        }
    }

    /// Lower-cased label, the key used for per-status counts.
    pub fn key(self) -> String {
        self.label().to_ascii_lowercase()
    }

    /// Case-insensitive match against the display label.
    pub fn matches_label(self, label: &str) -> bool {
        self.label().eq_ignore_ascii_case(label.trim())
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LoanStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoanStatus::ALL
            .into_iter()
            .find(|status| status.matches_label(s))
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

impl TryFrom<String> for LoanStatus {
    type Error = UnknownStatus;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LoanStatus> for String {
    fn from(value: LoanStatus) -> Self {
        value.label().to_string()
    }
}
