use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use loan_schedule::{
    export::schedule_csv_string, Amortization, Locale, LoanError, LoanParameters, LoanResult,
    PaymentInfo, PmtSchedule, RepaymentMethod,
};
use log::{error, info, warn};
use simple_logger::SimpleLogger;
use std::{fs::File, io::BufWriter, path::PathBuf, process};

/// Loan amortization schedule calculator
#[derive(Parser)]
#[command(name = "loan-schedule", version, about)]
struct Cli {
    /// Loan amount
    #[arg(long)]
    principal: f64,

    /// Nominal annual interest rate in percent (e.g. 5 for 5%)
    #[arg(long)]
    rate: f64,

    /// Loan term in years
    #[arg(long)]
    years: f64,

    #[arg(long, value_enum, default_value = "monthly")]
    frequency: Frequency,

    /// Extra principal paid every period
    #[arg(long, default_value_t = 0.)]
    extra: f64,

    #[arg(long, value_enum, default_value = "amortized")]
    method: Method,

    /// Date of the first payment (YYYY-MM-DD)
    #[arg(long)]
    first_payment: Option<NaiveDate>,

    #[arg(long, value_enum, default_value = "zh")]
    locale: CliLocale,

    /// Write the schedule as CSV to this path ("-" for stdout)
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Print the summary only
    #[arg(long)]
    quiet: bool,

    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

#[derive(Clone, Copy, ValueEnum)]
enum Frequency {
    Monthly,
    Biweekly,
    Weekly,
}

impl Frequency {
    fn payments_per_year(&self) -> u32 {
        match self {
            Frequency::Monthly => 12,
            Frequency::Biweekly => 26,
            Frequency::Weekly => 52,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    Amortized,
    EqualPrincipal,
    InterestOnly,
}

#[derive(Clone, Copy, ValueEnum)]
enum CliLocale {
    Zh,
    En,
}

impl Cli {
    fn params(&self) -> LoanResult<LoanParameters> {
        let pmt_schedule =
            PmtSchedule::from_payments_per_year(self.frequency.payments_per_year())?;
        let method = match self.method {
            Method::Amortized => RepaymentMethod::Amortized,
            Method::EqualPrincipal => RepaymentMethod::EqualPrincipal,
            Method::InterestOnly => RepaymentMethod::InterestOnly,
        };
        let locale = match self.locale {
            CliLocale::Zh => Locale::Zh,
            CliLocale::En => Locale::En,
        };

        let params =
            LoanParameters::new(self.principal, self.years, self.rate, pmt_schedule, method)
                .with_extra_payment(self.extra)
                .with_locale(locale);
        Ok(match self.first_payment {
            Some(date) => params.with_first_pmt_date(date),
            None => params,
        })
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = SimpleLogger::new().with_level(cli.log_level).init() {
        eprintln!("unable to initialise logging: {}", e);
    }

    let loan = match cli.params().and_then(Amortization::new) {
        Ok(loan) => loan,
        Err(LoanError::InvalidInput { field, reason }) => {
            eprintln!("{}: {}", field, reason);
            process::exit(1);
        }
        Err(e @ LoanError::NonConvergence { .. }) => {
            warn!("{}", e);
            eprintln!("warning: the loan is not paid off by this schedule ({})", e);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    if !cli.quiet {
        loan.show_amortization();
        println!();
    }
    print_summary(&loan);

    if let Some(path) = &cli.csv {
        let result = if path.as_os_str() == "-" {
            schedule_csv_string(loan.schedule(), loan.params.locale).map(|csv| print!("{}", csv))
        } else {
            File::create(path)
                .map_err(LoanError::from)
                .and_then(|file| loan.write_csv(BufWriter::new(file)))
        };
        match result {
            Ok(()) => info!(
                "schedule written to {} with {} headers",
                path.display(),
                loan.params.locale
            ),
            Err(e) => {
                error!("unable to write {}: {}", path.display(), e);
                process::exit(1);
            }
        }
    }
}

fn print_summary(loan: &Amortization) {
    let summary = loan.summary();
    match &summary.payment_info {
        PaymentInfo::Amortized {
            base_payment,
            extra_payment,
        } => {
            println!("Payment:         ${:.2}", base_payment + extra_payment);
            println!("  incl. extra:   ${:.2}", extra_payment);
        }
        PaymentInfo::EqualPrincipal {
            first_payment,
            last_payment,
            extra_payment,
        }
        | PaymentInfo::InterestOnly {
            first_payment,
            last_payment,
            extra_payment,
        } => {
            println!("First payment:   ${:.2}", first_payment);
            println!("Last payment:    ${:.2}", last_payment);
            println!("  incl. extra:   ${:.2}", extra_payment);
        }
    }
    println!("Total paid:      ${:.2}", summary.total_paid);
    println!("Total interest:  ${:.2}", summary.total_interest);
    println!("Paid off in:     {}", summary.payoff_label);
}

#[test]
fn cli_maps_to_parameters() {
    let cli = Cli::parse_from([
        "loan-schedule",
        "--principal",
        "100000",
        "--rate",
        "5",
        "--years",
        "1.5",
        "--frequency",
        "biweekly",
        "--method",
        "interest-only",
        "--extra",
        "50",
        "--first-payment",
        "2024-04-01",
        "--locale",
        "en",
    ]);
    let params = cli.params().unwrap();
    assert_eq!(params.pmt_schedule, PmtSchedule::Biweekly);
    assert_eq!(params.method, RepaymentMethod::InterestOnly);
    assert_eq!(params.extra_payment, 50.);
    assert_eq!(params.locale, Locale::En);
    assert_eq!(params.first_pmt_date, NaiveDate::from_ymd_opt(2024, 4, 1));
    assert_eq!(params.total_periods(), 39);
}

#[test]
fn cli_frequencies_resolve() {
    for (flag, expected) in [
        ("monthly", PmtSchedule::Monthly),
        ("biweekly", PmtSchedule::Biweekly),
        ("weekly", PmtSchedule::Weekly),
    ] {
        let cli = Cli::parse_from([
            "loan-schedule",
            "--principal",
            "1000",
            "--rate",
            "3",
            "--years",
            "2",
            "--frequency",
            flag,
            "--csv",
            "-",
        ]);
        let params = cli.params().unwrap();
        assert_eq!(params.pmt_schedule, expected);
        assert_eq!(params.locale, Locale::Zh);
        assert_eq!(cli.csv, Some(PathBuf::from("-")));
    }
}

// verifies that results can be moved across threads
#[cfg(test)]
fn is_normal<T: Sized + Send + Sync + Unpin>() {}

#[test]
fn normal_types() {
    is_normal::<Amortization>();
    is_normal::<LoanParameters>();
    is_normal::<LoanError>();
}
