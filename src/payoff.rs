use std::fmt;

/// Language used for payoff labels and CSV column headers.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Locale {
    #[default]
    Zh,
    En,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::Zh => write!(f, "zh"),
            Locale::En => write!(f, "en"),
        }
    }
}

/// Renders the time a loan took to pay off, e.g. `2年3个月` or `2 years 3 months`.
///
/// Whole years come from integer division by `payments_per_year`; what is left
/// over is labelled by payment frequency (12 → months, 26 → two-week periods,
/// 52 → weeks, anything else → periods).
pub fn format_payoff(periods: usize, payments_per_year: u32, locale: Locale) -> String {
    if periods == 0 {
        return match locale {
            Locale::Zh => "不足一期".to_string(),
            Locale::En => "less than one period".to_string(),
        };
    }

    let ppy = payments_per_year as usize;
    let (years, remainder) = if ppy == 0 {
        (0, periods)
    } else {
        (periods / ppy, periods % ppy)
    };

    match locale {
        Locale::Zh => {
            let unit = match payments_per_year {
                12 => "个月",
                26 => "个双周",
                52 => "周",
                _ => "期",
            };
            match (years, remainder) {
                (0, r) => format!("{}{}", r, unit),
                (y, 0) => format!("{}年", y),
                (y, r) => format!("{}年{}{}", y, r, unit),
            }
        }
        Locale::En => {
            let (one, many) = match payments_per_year {
                12 => ("month", "months"),
                26 => ("two-week period", "two-week periods"),
                52 => ("week", "weeks"),
                _ => ("period", "periods"),
            };
            let year_part = plural(years, "year", "years");
            let rem_part = plural(remainder, one, many);
            match (years, remainder) {
                (0, _) => rem_part,
                (_, 0) => year_part,
                _ => format!("{} {}", year_part, rem_part),
            }
        }
    }
}

fn plural(count: usize, one: &str, many: &str) -> String {
    if count == 1 {
        format!("1 {}", one)
    } else {
        format!("{} {}", count, many)
    }
}
