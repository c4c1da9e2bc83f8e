use crate::error::{LoanError, LoanResult};
use crate::export::write_schedule_csv;
use crate::payoff::{format_payoff, Locale};
use chrono::NaiveDate;
use log::{debug, info, trace, warn};
use std::{fmt, io::Write};

/// Remaining balance at or below this amount counts as paid off.
pub const PAYOFF_EPSILON: f64 = 0.01;

/// Longest schedule accepted: 100 years of weekly payments.
pub const MAX_TOTAL_PERIODS: usize = 100 * 52;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PmtSchedule {
    Weekly,
    Biweekly,
    Monthly,
}

impl PmtSchedule {
    pub fn payments_per_year(&self) -> u32 {
        match self {
            PmtSchedule::Weekly => 52,
            PmtSchedule::Biweekly => 26,
            PmtSchedule::Monthly => 12,
        }
    }

    pub fn from_payments_per_year(count: u32) -> LoanResult<Self> {
        match count {
            52 => Ok(PmtSchedule::Weekly),
            26 => Ok(PmtSchedule::Biweekly),
            12 => Ok(PmtSchedule::Monthly),
            other => Err(LoanError::invalid(
                "payments_per_year",
                format!("{} is not one of 12, 26 or 52", other),
            )),
        }
    }
}

impl fmt::Display for PmtSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PmtSchedule::Weekly => write!(f, "weekly"),
            PmtSchedule::Biweekly => write!(f, "biweekly"),
            PmtSchedule::Monthly => write!(f, "monthly"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepaymentMethod {
    /// Level payment, interest share shrinking over time.
    Amortized,
    /// Level principal, payment shrinking over time.
    EqualPrincipal,
    /// Interest each period, principal reduced at every year end and at maturity.
    InterestOnly,
}

impl fmt::Display for RepaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepaymentMethod::Amortized => write!(f, "amortized"),
            RepaymentMethod::EqualPrincipal => write!(f, "equal principal"),
            RepaymentMethod::InterestOnly => write!(f, "interest only"),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoanParameters {
    pub principal: f64,
    /// nominal annual rate as a percentage (i.e., 5.0 for 5%)
    pub annual_rate: f64,
    pub years: f64,
    pub pmt_schedule: PmtSchedule,
    pub extra_payment: f64,
    pub method: RepaymentMethod,
    pub first_pmt_date: Option<NaiveDate>,
    pub locale: Locale,
}

impl LoanParameters {
    pub fn new(
        principal: f64,
        years: f64,
        annual_rate: f64,
        pmt_schedule: PmtSchedule,
        method: RepaymentMethod,
    ) -> Self {
        Self {
            principal,
            annual_rate,
            years,
            pmt_schedule,
            extra_payment: 0.,
            method,
            first_pmt_date: None,
            locale: Locale::default(),
        }
    }

    pub fn with_extra_payment(mut self, extra_payment: f64) -> Self {
        self.extra_payment = extra_payment;
        self
    }

    pub fn with_first_pmt_date(mut self, first_pmt_date: NaiveDate) -> Self {
        self.first_pmt_date = Some(first_pmt_date);
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn payments_per_year(&self) -> u32 {
        self.pmt_schedule.payments_per_year()
    }

    pub fn periodic_rate(&self) -> f64 {
        if self.annual_rate > 0. {
            self.annual_rate / 100. / self.payments_per_year() as f64
        } else {
            0.
        }
    }

    pub fn total_periods(&self) -> usize {
        let periods = (self.years * self.payments_per_year() as f64).round();
        (periods as usize).max(1)
    }

    /// Upper bound on schedule length before a calculation is declared non-convergent.
    pub fn max_iterations(&self) -> usize {
        self.total_periods().saturating_mul(2).saturating_add(10)
    }

    pub fn validate(&self) -> LoanResult<()> {
        if !self.principal.is_finite() || self.principal <= 0. {
            return Err(LoanError::invalid(
                "principal",
                format!("must be a positive number, got {}", self.principal),
            ));
        }
        if !self.annual_rate.is_finite() || !(0. ..=100.).contains(&self.annual_rate) {
            return Err(LoanError::invalid(
                "annual_rate",
                format!("must be between 0 and 100, got {}", self.annual_rate),
            ));
        }
        if !self.years.is_finite() || self.years <= 0. {
            return Err(LoanError::invalid(
                "years",
                format!("must be a positive number, got {}", self.years),
            ));
        }
        if self.total_periods() > MAX_TOTAL_PERIODS {
            return Err(LoanError::invalid(
                "years",
                format!(
                    "{} years of {} payments exceeds {} periods",
                    self.years, self.pmt_schedule, MAX_TOTAL_PERIODS
                ),
            ));
        }
        if !self.extra_payment.is_finite() || self.extra_payment < 0. {
            return Err(LoanError::invalid(
                "extra_payment",
                format!("must be zero or more, got {}", self.extra_payment),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoanPayment {
    pub pmt_number: usize,
    pub pmt_date: Option<NaiveDate>,
    pub payment: f64,
    pub principal_paid: f64,
    pub interest_paid: f64,
    pub end_balance: f64,
}

impl LoanPayment {
    pub fn new(
        pmt_number: usize,
        pmt_date: Option<NaiveDate>,
        payment: f64,
        principal_paid: f64,
        interest_paid: f64,
        end_balance: f64,
    ) -> Self {
        Self {
            pmt_number,
            pmt_date,
            payment,
            principal_paid,
            interest_paid,
            end_balance,
        }
    }
}

impl fmt::Display for LoanPayment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pmt number {}, ", self.pmt_number)?;
        if let Some(date) = self.pmt_date {
            write!(f, "date {}, ", date)?;
        }
        write!(
            f,
            "payment ${:.2}, principal paid ${:.2}, interest paid ${:.2}, ending balance ${:.2}",
            self.payment, self.principal_paid, self.interest_paid, self.end_balance
        )
    }
}

/// Headline payment figures, shaped by repayment method.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PaymentInfo {
    Amortized {
        base_payment: f64,
        extra_payment: f64,
    },
    EqualPrincipal {
        first_payment: f64,
        last_payment: f64,
        extra_payment: f64,
    },
    InterestOnly {
        first_payment: f64,
        last_payment: f64,
        extra_payment: f64,
    },
}

impl PaymentInfo {
    pub fn extra_payment(&self) -> f64 {
        match self {
            PaymentInfo::Amortized { extra_payment, .. }
            | PaymentInfo::EqualPrincipal { extra_payment, .. }
            | PaymentInfo::InterestOnly { extra_payment, .. } => *extra_payment,
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoanSummary {
    pub payment_info: PaymentInfo,
    pub total_paid: f64,
    pub total_interest: f64,
    pub payoff_periods: usize,
    pub payoff_label: String,
}

impl fmt::Display for LoanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payment_info {
            PaymentInfo::Amortized {
                base_payment,
                extra_payment,
            } => write!(
                f,
                "payment ${:.2} (extra ${:.2})",
                base_payment + extra_payment,
                extra_payment
            )?,
            PaymentInfo::EqualPrincipal {
                first_payment,
                last_payment,
                extra_payment,
            }
            | PaymentInfo::InterestOnly {
                first_payment,
                last_payment,
                extra_payment,
            } => write!(
                f,
                "first payment ${:.2}, last payment ${:.2} (extra ${:.2})",
                first_payment, last_payment, extra_payment
            )?,
        }
        write!(
            f,
            ", total paid ${:.2}, total interest ${:.2}, paid off in {}",
            self.total_paid, self.total_interest, self.payoff_label
        )
    }
}

/// A complete calculation: the inputs, the period-by-period schedule and its summary.
#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Amortization {
    pub params: LoanParameters,
    schedule: Vec<LoanPayment>,
    summary: LoanSummary,
}

impl Amortization {
    pub fn new(params: LoanParameters) -> LoanResult<Self> {
        let schedule = calculate_schedule(&params)?;
        let summary = summarize(&params, &schedule);
        info!(
            "{} loan of {:.2} over {} {} periods: {}",
            params.method,
            params.principal,
            schedule.len(),
            params.pmt_schedule,
            summary
        );
        Ok(Self {
            params,
            schedule,
            summary,
        })
    }

    pub fn schedule(&self) -> &[LoanPayment] {
        &self.schedule
    }

    pub fn summary(&self) -> &LoanSummary {
        &self.summary
    }

    pub fn get_pmt_count(&self) -> usize {
        self.schedule.len()
    }

    /// 1-based lookup of a single payment.
    pub fn get_pmt_detail(&self, &pmt_number: &usize) -> Option<&LoanPayment> {
        pmt_number
            .checked_sub(1)
            .and_then(|index| self.schedule.get(index))
    }

    pub fn get_pmt_info(&self, pmt_number: &usize) -> String {
        match self.get_pmt_detail(pmt_number) {
            Some(pmt) => pmt.to_string(),
            None => "No payment information.".to_string(),
        }
    }

    pub fn show_amortization(&self) {
        for pmt in &self.schedule {
            println!("{}", pmt);
        }
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> LoanResult<()> {
        write_schedule_csv(writer, &self.schedule, self.params.locale)
    }
}

/// Level payment that retires `principal` in `periods` equal installments.
pub fn annuity_payment(principal: f64, rate: f64, periods: usize) -> f64 {
    if rate == 0. {
        principal / periods as f64
    } else {
        principal * rate / (1. - (1. + rate).powf(-(periods as f64)))
    }
}

/// Validates `params` and builds the schedule for its repayment method.
pub fn calculate_schedule(params: &LoanParameters) -> LoanResult<Vec<LoanPayment>> {
    params.validate()?;
    debug!(
        "periodic rate {}, total periods {}, iteration cap {}",
        params.periodic_rate(),
        params.total_periods(),
        params.max_iterations()
    );

    let mut schedule = match params.method {
        RepaymentMethod::Amortized => amortized_schedule(params),
        RepaymentMethod::EqualPrincipal => equal_principal_schedule(params),
        RepaymentMethod::InterestOnly => interest_only_schedule(params),
    }?;

    if let Some(first_pmt_date) = params.first_pmt_date {
        for (index, pmt) in schedule.iter_mut().enumerate() {
            pmt.pmt_date = Some(get_pmt_date(&first_pmt_date, &params.pmt_schedule, index)?);
        }
    }
    Ok(schedule)
}

fn amortized_schedule(params: &LoanParameters) -> LoanResult<Vec<LoanPayment>> {
    let rate = params.periodic_rate();
    let base_payment = annuity_payment(params.principal, rate, params.total_periods());
    level_payment_schedule(
        params.principal,
        rate,
        base_payment + params.extra_payment,
        params.max_iterations(),
    )
}

/// Schedule for a fixed `payment` each period. Fails with `NonConvergence` if the
/// balance is still outstanding after `max_iterations` periods.
pub fn level_payment_schedule(
    principal: f64,
    rate: f64,
    payment: f64,
    max_iterations: usize,
) -> LoanResult<Vec<LoanPayment>> {
    if !principal.is_finite() || principal <= 0. {
        return Err(LoanError::invalid("principal", "must be a positive number"));
    }
    if !rate.is_finite() || rate < 0. {
        return Err(LoanError::invalid("rate", "must be zero or more"));
    }
    run_periods(principal, rate, max_iterations, |_, _, interest| {
        payment - interest
    })
}

fn equal_principal_schedule(params: &LoanParameters) -> LoanResult<Vec<LoanPayment>> {
    let principal_due = params.principal / params.total_periods() as f64 + params.extra_payment;
    run_periods(
        params.principal,
        params.periodic_rate(),
        params.max_iterations(),
        |_, _, _| principal_due,
    )
}

fn interest_only_schedule(params: &LoanParameters) -> LoanResult<Vec<LoanPayment>> {
    let total_periods = params.total_periods();
    let pmts_per_year = params.payments_per_year() as usize;
    let full_years = total_periods / pmts_per_year;
    let remainder = total_periods % pmts_per_year;
    let repayment_count = (full_years + usize::from(remainder > 0)).max(1);
    let scheduled_principal = params.principal / repayment_count as f64;
    let extra_payment = params.extra_payment;
    debug!(
        "interest only: {} principal reductions of {:.2}",
        repayment_count, scheduled_principal
    );

    // year ends count from period 1, not from a calendar boundary
    run_periods(
        params.principal,
        params.periodic_rate(),
        params.max_iterations(),
        |pmt_number, _, _| {
            if pmt_number % pmts_per_year == 0 || pmt_number == total_periods {
                scheduled_principal + extra_payment
            } else {
                extra_payment
            }
        },
    )
}

// Shared period loop. `principal_due(pmt_number, begin_balance, interest)` returns
// the principal the method wants repaid this period; the loop caps it to
// [0, balance], absorbs residue below PAYOFF_EPSILON and enforces the iteration cap.
fn run_periods<F>(
    principal: f64,
    rate: f64,
    max_iterations: usize,
    mut principal_due: F,
) -> LoanResult<Vec<LoanPayment>>
where
    F: FnMut(usize, f64, f64) -> f64,
{
    let mut sched_pmt: Vec<LoanPayment> = Vec::new();
    let mut begin_balance = principal;
    let mut pmt_number = 0;

    while begin_balance > 0. && pmt_number < max_iterations {
        pmt_number += 1;

        let interest = begin_balance * rate;
        let mut principal_paid = principal_due(pmt_number, begin_balance, interest)
            .max(0.)
            .min(begin_balance);
        let mut end_balance = begin_balance - principal_paid;

        if end_balance <= PAYOFF_EPSILON {
            principal_paid = begin_balance;
            end_balance = 0.;
        }
        trace!(
            "Pmt # {}, principal {}, interest {}, end bal {}",
            pmt_number,
            principal_paid,
            interest,
            end_balance
        );

        sched_pmt.push(LoanPayment::new(
            pmt_number,
            None,
            principal_paid + interest,
            principal_paid,
            interest,
            end_balance,
        ));
        begin_balance = end_balance;
    }

    if begin_balance > 0. {
        warn!(
            "balance {:.2} still outstanding after {} periods",
            begin_balance, pmt_number
        );
        return Err(LoanError::NonConvergence {
            iterations: pmt_number,
            remaining_balance: begin_balance,
        });
    }
    Ok(sched_pmt)
}

fn summarize(params: &LoanParameters, schedule: &[LoanPayment]) -> LoanSummary {
    let first_payment = schedule.first().map_or(0., |pmt| pmt.payment);
    let last_payment = schedule.last().map_or(0., |pmt| pmt.payment);
    let extra_payment = params.extra_payment;

    let payment_info = match params.method {
        RepaymentMethod::Amortized => PaymentInfo::Amortized {
            base_payment: annuity_payment(
                params.principal,
                params.periodic_rate(),
                params.total_periods(),
            ),
            extra_payment,
        },
        RepaymentMethod::EqualPrincipal => PaymentInfo::EqualPrincipal {
            first_payment,
            last_payment,
            extra_payment,
        },
        RepaymentMethod::InterestOnly => PaymentInfo::InterestOnly {
            first_payment,
            last_payment,
            extra_payment,
        },
    };

    LoanSummary {
        payment_info,
        total_paid: schedule.iter().map(|pmt| pmt.payment).sum(),
        total_interest: schedule.iter().map(|pmt| pmt.interest_paid).sum(),
        payoff_periods: schedule.len(),
        payoff_label: format_payoff(schedule.len(), params.payments_per_year(), params.locale),
    }
}

// Date of the payment `index` periods after the first one. Months are added to the
// first date rather than chained, so a loan starting on the 31st returns to the 31st.
fn get_pmt_date(
    &first_pmt_date: &NaiveDate,
    &pmt_schedule: &PmtSchedule,
    index: usize,
) -> LoanResult<NaiveDate> {
    let steps = index as u64;
    let pmt_date = match pmt_schedule {
        PmtSchedule::Weekly => first_pmt_date.checked_add_days(chrono::Days::new(7 * steps)),
        PmtSchedule::Biweekly => first_pmt_date.checked_add_days(chrono::Days::new(14 * steps)),
        PmtSchedule::Monthly => u32::try_from(index)
            .ok()
            .and_then(|months| first_pmt_date.checked_add_months(chrono::Months::new(months))),
    };
    pmt_date.ok_or(LoanError::DateOverflow(first_pmt_date))
}
