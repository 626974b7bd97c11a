use std::{collections::BTreeMap, fmt, str::FromStr};

use shared::{domain::LoanStatus, protocol::Loan};

pub const ALL_FILTER: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Status(LoanStatus),
}

impl StatusFilter {
    pub fn matches(self, loan: &Loan) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Status(status) => loan.status == status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = shared::domain::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL_FILTER) {
            return Ok(StatusFilter::All);
        }
        s.parse().map(StatusFilter::Status)
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str(ALL_FILTER),
            StatusFilter::Status(status) => write!(f, "{status}"),
        }
    }
}

/// Loans whose status label equals `filter` ignoring case, or every loan when
/// `filter` is `"all"`. Order is preserved.
pub fn filter_by_status<'a>(loans: &'a [Loan], filter: &str) -> Vec<&'a Loan> {
    if filter.trim().eq_ignore_ascii_case(ALL_FILTER) {
        return loans.iter().collect();
    }
    loans
        .iter()
        .filter(|loan| loan.status.matches_label(filter))
        .collect()
}

/// Count of loans per lower-cased status label plus `"all"`. Every label is
/// present, zero or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusCounts {
    all: usize,
    per_status: [usize; 4],
}

impl StatusCounts {
    pub fn all(&self) -> usize {
        self.all
    }

    pub fn status(&self, status: LoanStatus) -> usize {
        self.per_status[status_index(status)]
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        match key.parse::<StatusFilter>().ok()? {
            StatusFilter::All => Some(self.all),
            StatusFilter::Status(status) => Some(self.status(status)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (String, usize)> + '_ {
        std::iter::once((ALL_FILTER.to_string(), self.all)).chain(
            LoanStatus::ALL
                .into_iter()
                .map(|status| (status.key(), self.status(status))),
        )
    }

    pub fn to_map(&self) -> BTreeMap<String, usize> {
        self.iter().collect()
    }
}

fn status_index(status: LoanStatus) -> usize {
    match status {
        LoanStatus::OnTime => 0,
        LoanStatus::Late => 1,
        LoanStatus::Defaulted => 2,
        LoanStatus::Unpaid => 3,
    }
}

pub fn counts_by_status(loans: &[Loan]) -> StatusCounts {
    loans.iter().fold(StatusCounts::default(), |mut counts, loan| {
        counts.all += 1;
        counts.per_status[status_index(loan.status)] += 1;
        counts
    })
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
