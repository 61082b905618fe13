//! Time bucketing for period series.

use crate::model::date::{format_iso_date, shift_days, DateRange};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl Granularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }

    /// Average calendar length of one period, in days.
    pub fn nominal_days(self) -> f64 {
        match self {
            Self::Daily => 1.0,
            Self::Weekly => 7.0,
            Self::Monthly => 30.4375,
            Self::Quarterly => 91.3125,
            Self::Yearly => 365.25,
        }
    }

    /// First day of the period containing `date`. Weeks start on Monday.
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        let start = match self {
            Self::Daily => Some(date),
            Self::Weekly => shift_days(date, -i64::from(date.weekday().num_days_from_monday())),
            Self::Monthly => date.with_day(1),
            Self::Quarterly => {
                let first_month = (date.month0() / 3) * 3 + 1;
                NaiveDate::from_ymd_opt(date.year(), first_month, 1)
            }
            Self::Yearly => NaiveDate::from_ymd_opt(date.year(), 1, 1),
        };
        start.unwrap_or(date)
    }

    /// First day of the period after the one starting at `start`.
    fn next_start(self, start: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Daily => start.succ_opt(),
            Self::Weekly => shift_days(start, 7),
            Self::Monthly => start.checked_add_months(Months::new(1)),
            Self::Quarterly => start.checked_add_months(Months::new(3)),
            Self::Yearly => start.checked_add_months(Months::new(12)),
        }
    }

    /// Stable label of the period starting at `start`.
    pub fn label(self, start: NaiveDate) -> String {
        match self {
            Self::Daily => format_iso_date(start),
            Self::Weekly => {
                let week = start.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Self::Monthly => format!("{}-{:02}", start.year(), start.month()),
            Self::Quarterly => format!("{}-Q{}", start.year(), start.month0() / 3 + 1),
            Self::Yearly => start.year().to_string(),
        }
    }

    /// Splits `range` into consecutive periods, clipping the first and last
    /// to the range bounds.
    pub fn buckets(self, range: DateRange) -> Vec<Period> {
        let mut periods = Vec::new();
        let mut cursor = Some(self.period_start(range.start));

        while let Some(start) = cursor {
            if start > range.end {
                break;
            }
            let next = self.next_start(start);
            let natural_end = next.and_then(|value| value.pred_opt()).unwrap_or(range.end);
            let clipped = DateRange::new(start.max(range.start), natural_end.min(range.end));
            if let Some(bounds) = clipped {
                periods.push(Period {
                    label: self.label(start),
                    range: bounds,
                });
            }
            cursor = next;
        }

        periods
    }
}

impl Display for Granularity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            "yearly" | "year" | "annual" => Ok(Self::Yearly),
            other => Err(format!("unknown granularity `{other}`")),
        }
    }
}

/// One labelled bucket of a period series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub label: String,
    pub range: DateRange,
}
