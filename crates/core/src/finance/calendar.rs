//! Period calendar: key construction and the date range each key covers.
//!
//! Weekly periods are fixed seven-day buckets inside a month, so week `w`
//! covers days `7(w-1)+1 ..= min(7w, last day)` and week 5 holds day 29
//! through month end.

use chrono::{Datelike, NaiveDate};

use super::error::FinanceError;
use super::types::{PeriodKey, PeriodType};

/// Days per weekly bucket.
const DAYS_PER_WEEK: u32 = 7;

/// Highest week number in a month.
const MAX_WEEK: u32 = 5;

impl PeriodKey {
    /// Key of a weekly period.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodKey` if `month` or `week` is out of range.
    pub fn weekly(year: i32, month: u32, week: u32) -> Result<Self, FinanceError> {
        let key = Self {
            period_type: PeriodType::Weekly,
            year,
            month: Some(month),
            week: Some(week),
        };
        key.validate()?;
        Ok(key)
    }

    /// Key of a monthly period.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodKey` if `month` is out of range.
    pub fn monthly(year: i32, month: u32) -> Result<Self, FinanceError> {
        let key = Self {
            period_type: PeriodType::Monthly,
            year,
            month: Some(month),
            week: None,
        };
        key.validate()?;
        Ok(key)
    }

    /// Key of a yearly period.
    #[must_use]
    pub const fn yearly(year: i32) -> Self {
        Self {
            period_type: PeriodType::Yearly,
            year,
            month: None,
            week: None,
        }
    }

    /// Weekly key whose bucket contains `date`.
    #[must_use]
    pub fn weekly_containing(date: NaiveDate) -> Self {
        Self {
            period_type: PeriodType::Weekly,
            year: date.year(),
            month: Some(date.month()),
            week: Some((date.day() - 1) / DAYS_PER_WEEK + 1),
        }
    }

    /// Monthly key whose month contains `date`.
    #[must_use]
    pub fn monthly_containing(date: NaiveDate) -> Self {
        Self {
            period_type: PeriodType::Monthly,
            year: date.year(),
            month: Some(date.month()),
            week: None,
        }
    }

    /// Checks that `month`/`week` are present exactly when the period type
    /// needs them, and within range.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodKey` describing the first problem found.
    pub fn validate(&self) -> Result<(), FinanceError> {
        let invalid = |msg: String| Err(FinanceError::InvalidPeriodKey(msg));

        match (self.period_type, self.month, self.week) {
            (PeriodType::Yearly, None, None) => Ok(()),
            (PeriodType::Yearly, _, _) => invalid("yearly periods take no month or week".into()),
            (PeriodType::Monthly, Some(month), None) => check_month(month),
            (PeriodType::Monthly, None, _) => invalid("monthly periods need a month".into()),
            (PeriodType::Monthly, Some(_), Some(_)) => {
                invalid("monthly periods take no week".into())
            }
            (PeriodType::Weekly, Some(month), Some(week)) => {
                check_month(month)?;
                if (1..=MAX_WEEK).contains(&week) {
                    Ok(())
                } else {
                    invalid(format!("week must be 1-{MAX_WEEK}, got {week}"))
                }
            }
            (PeriodType::Weekly, _, _) => invalid("weekly periods need a month and a week".into()),
        }
    }

    /// Inclusive date range covered by this key.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPeriodKey` if the key is invalid or names a week that
    /// does not exist in its month (week 5 of a 28-day February).
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), FinanceError> {
        self.validate()?;
        let out_of_calendar =
            || FinanceError::InvalidPeriodKey(format!("{self:?} is outside the calendar"));

        match (self.period_type, self.month, self.week) {
            (PeriodType::Yearly, _, _) => {
                let start = NaiveDate::from_ymd_opt(self.year, 1, 1).ok_or_else(out_of_calendar)?;
                let end = NaiveDate::from_ymd_opt(self.year, 12, 31).ok_or_else(out_of_calendar)?;
                Ok((start, end))
            }
            (PeriodType::Monthly, Some(month), _) => {
                let start =
                    NaiveDate::from_ymd_opt(self.year, month, 1).ok_or_else(out_of_calendar)?;
                let end = last_day_of_month(self.year, month).ok_or_else(out_of_calendar)?;
                Ok((start, end))
            }
            (PeriodType::Weekly, Some(month), Some(week)) => {
                let month_end = last_day_of_month(self.year, month).ok_or_else(out_of_calendar)?;
                let first_day = DAYS_PER_WEEK * (week - 1) + 1;
                if first_day > month_end.day() {
                    return Err(FinanceError::InvalidPeriodKey(format!(
                        "{}-{month:02} has no week {week}",
                        self.year
                    )));
                }
                let start = NaiveDate::from_ymd_opt(self.year, month, first_day)
                    .ok_or_else(out_of_calendar)?;
                let last_day = (DAYS_PER_WEEK * week).min(month_end.day());
                let end = NaiveDate::from_ymd_opt(self.year, month, last_day)
                    .ok_or_else(out_of_calendar)?;
                Ok((start, end))
            }
            _ => Err(out_of_calendar()),
        }
    }
}

fn check_month(month: u32) -> Result<(), FinanceError> {
    if (1..=12).contains(&month) {
        Ok(())
    } else {
        Err(FinanceError::InvalidPeriodKey(format!(
            "month must be 1-12, got {month}"
        )))
    }
}

/// Last calendar day of `month` in `year`.
#[must_use]
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}
