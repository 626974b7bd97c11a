use std::{fmt, sync::Arc};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, validation::ValidationErrorSet, Clock, FormRejection, GraphQlLoanService,
    LoanCollection, LoanField, LoanForm, LoanService, LoanView, PaymentField, PaymentForm,
    RequestState, SystemClock,
};
use shared::protocol::Loan;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "loans")]
struct Cli {
    /// Overrides the configured GraphQL endpoint.
    #[arg(long)]
    endpoint: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lists loans with per-status counts.
    List {
        #[arg(long, default_value = "all")]
        status: String,
    },
    AddLoan {
        #[arg(long)]
        name: String,
        #[arg(long)]
        interest_rate: String,
        #[arg(long)]
        principal: String,
        #[arg(long)]
        due_date: String,
        #[arg(long)]
        payment_date: Option<String>,
    },
    AddPayment {
        #[arg(long)]
        loan_id: String,
        /// Defaults to today.
        #[arg(long)]
        payment_date: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(endpoint) = cli.endpoint {
        settings.endpoint = endpoint;
    }
    settings.validate().context("invalid client settings")?;
    info!(endpoint = %settings.endpoint, "using loan service");

    let service: Arc<dyn LoanService> = Arc::new(GraphQlLoanService::from_settings(&settings)?);
    let collection = LoanCollection::new(Arc::clone(&service));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    match cli.command {
        Command::List { status } => {
            settled(collection.read().await)?;
            print_view(&collection.view(&status));
        }
        Command::AddLoan {
            name,
            interest_rate,
            principal,
            due_date,
            payment_date,
        } => {
            let form = LoanForm::new(service, Arc::clone(&collection), clock);
            for (field, value) in [
                (LoanField::Name, name),
                (LoanField::InterestRate, interest_rate),
                (LoanField::Principal, principal),
                (LoanField::DueDate, due_date),
                (LoanField::PaymentDate, payment_date.unwrap_or_default()),
            ] {
                form.set_field(field, value)?;
            }
            let state = form
                .submit()
                .await
                .map_err(|rejection| rejected(rejection, &form.errors()))?;
            let loan = settled(state)?;
            println!("created loan id={} status={}", loan.id, loan.status);
        }
        Command::AddPayment {
            loan_id,
            payment_date,
        } => {
            let form = PaymentForm::new(service, Arc::clone(&collection), clock);
            form.set_field(PaymentField::LoanId, loan_id)?;
            form.set_field(PaymentField::PaymentDate, payment_date.unwrap_or_default())?;
            let state = form
                .submit()
                .await
                .map_err(|rejection| rejected(rejection, &form.errors()))?;
            let payment = settled(state)?;
            match payment.payment_date {
                Some(date) => println!(
                    "recorded payment id={} for loan id={} on {date}",
                    payment.id, payment.loan_id
                ),
                None => println!(
                    "recorded payment id={} for loan id={}",
                    payment.id, payment.loan_id
                ),
            }
        }
    }

    Ok(())
}

fn settled<T>(state: RequestState<T>) -> Result<T> {
    match state {
        RequestState::Success(data) => Ok(data),
        RequestState::Error(failure) => {
            bail!("{}", failure.message())
        }
        RequestState::Idle | RequestState::Loading => bail!("request did not complete"),
    }
}

fn rejected<F>(rejection: FormRejection, errors: &ValidationErrorSet<F>) -> anyhow::Error
where
    F: Ord + Copy + fmt::Display,
{
    if rejection != FormRejection::Invalid {
        return anyhow!(rejection);
    }
    for (field, message) in errors.iter() {
        eprintln!("{field}: {message}");
    }
    anyhow!("{} field(s) failed validation", errors.len())
}

fn print_view(view: &LoanView) {
    let counts: Vec<String> = view
        .counts
        .iter()
        .map(|(key, count)| format!("{key}={count}"))
        .collect();
    println!("{}", counts.join(" "));

    if view.loans.is_empty() {
        println!("no loans");
        return;
    }
    println!(
        "{:>4}  {:<24} {:>7} {:>12}  {:<10} {:<10} {}",
        "id", "name", "rate", "principal", "due", "paid", "status"
    );
    for loan in &view.loans {
        print_loan(loan);
    }
}

fn print_loan(loan: &Loan) {
    let paid = loan
        .payment_date
        .map(|date| date.to_string())
        .unwrap_or_else(|| "-".into());
    println!(
        "{:>4}  {:<24} {:>6.2}% {:>12}  {:<10} {:<10} {}",
        loan.id.0,
        loan.name,
        loan.interest_rate,
        loan.principal,
        loan.due_date.to_string(),
        paid,
        loan.status.label()
    );
}
