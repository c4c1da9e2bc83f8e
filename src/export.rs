//! CSV export of a payment schedule.
//!
//! Layout: UTF-8 byte-order mark, a localized header row, then one row per
//! payment with `period, payment, principal, interest, remaining balance`.
//! Amounts are fixed at two decimals with no thousands separators.

use crate::error::LoanResult;
use crate::loan::LoanPayment;
use crate::payoff::Locale;
use log::debug;
use std::io::Write;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub fn csv_headers(locale: Locale) -> [&'static str; 5] {
    match locale {
        Locale::Zh => ["期数", "还款额", "本金", "利息", "剩余本金"],
        Locale::En => [
            "Period",
            "Payment",
            "Principal",
            "Interest",
            "Remaining Balance",
        ],
    }
}

pub fn write_schedule_csv<W: Write>(
    mut writer: W,
    schedule: &[LoanPayment],
    locale: Locale,
) -> LoanResult<()> {
    writer.write_all(UTF8_BOM)?;

    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);
    wtr.write_record(csv_headers(locale))?;
    for pmt in schedule {
        wtr.write_record([
            pmt.pmt_number.to_string(),
            money(pmt.payment),
            money(pmt.principal_paid),
            money(pmt.interest_paid),
            money(pmt.end_balance),
        ])?;
    }
    wtr.flush()?;
    debug!("wrote {} schedule rows as CSV", schedule.len());
    Ok(())
}

pub fn schedule_csv_string(schedule: &[LoanPayment], locale: Locale) -> LoanResult<String> {
    let mut buf = Vec::new();
    write_schedule_csv(&mut buf, schedule, locale)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

// -0.0 would otherwise print as "-0.00"
fn money(amount: f64) -> String {
    let amount = if amount == 0. { 0. } else { amount };
    format!("{:.2}", amount)
}
