pub mod collection;
pub mod config;
pub mod forms;
pub mod request;
pub mod service;
pub mod validation;
pub mod view;

pub use collection::{LoanCollection, LoanView};
pub use config::{load_settings, ClientSettings, ConfigError};
pub use forms::{FormRejection, LoanForm, PaymentForm};
pub use request::{FailureKind, RequestFailure, RequestState};
pub use service::{GraphQlLoanService, LoanService, MissingLoanService};
pub use validation::{Clock, FixedClock, LoanField, PaymentField, SystemClock};
pub use view::{counts_by_status, filter_by_status, StatusCounts, StatusFilter};

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
