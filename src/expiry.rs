//! Expiry date sanitising and validation.
//!
//! The sanitiser turns whatever the user typed into `MM/YY` as early as it
//! can, inserting the separator for them:
//!
//! | Typed | Becomes |
//! |-------|---------|
//! | `1` | `1` (may still become 10-12) |
//! | `2` | `02/` |
//! | `13` | `01/3` |
//! | `1225` | `12/25` |
//!
//! The validator accepts a date until the last instant of its month, in the
//! time zone of the clock it reads.
//!
//! # Example
//!
//! ```
//! use cardfield::expiry::{ExpiryDateSanitiser, ExpiryDateValidator, FixedClock};
//! use chrono::{TimeZone, Utc};
//!
//! assert_eq!(ExpiryDateSanitiser::sanitise("2"), "02/");
//!
//! let validator = ExpiryDateValidator::new(FixedClock::new(
//!     Utc.with_ymd_and_hms(2040, 5, 30, 23, 0, 0).unwrap(),
//! ));
//! assert!(validator.validate("06/40"));
//! assert!(validator.validate("05/40"));
//! assert!(!validator.validate("04/40"));
//! assert!(!validator.validate("13/25"));
//! ```

use crate::rule::{CardDefaults, ValidationRule};
use crate::validate::GenericValidator;
use chrono::{DateTime, Datelike, FixedOffset, Local, NaiveDate, Offset, TimeZone};
use std::fmt;

/// Separator between month and year.
pub const SEPARATOR: char = '/';

/// Length of a complete `MM/YY` date.
pub const MAX_LENGTH: usize = 5;

/// Years are two digits from this century.
const CENTURY: i32 = 2000;

/// Rewrites expiry date input into `MM/YY` form.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryDateSanitiser;

impl ExpiryDateSanitiser {
    /// Sanitises raw expiry date input.
    ///
    /// Blank input is returned unchanged. A lone first digit of 2 or more can
    /// only be a single-digit month, so it is padded and the separator added.
    /// With two or more digits, a leading pair of 13 or more means the first
    /// digit alone is the month.
    ///
    /// # Example
    ///
    /// ```
    /// use cardfield::expiry::ExpiryDateSanitiser;
    ///
    /// assert_eq!(ExpiryDateSanitiser::sanitise("1"), "1");
    /// assert_eq!(ExpiryDateSanitiser::sanitise("01"), "01/");
    /// assert_eq!(ExpiryDateSanitiser::sanitise("13"), "01/3");
    /// assert_eq!(ExpiryDateSanitiser::sanitise("12/25"), "12/25");
    /// assert_eq!(ExpiryDateSanitiser::sanitise("122599"), "12/25");
    /// ```
    pub fn sanitise(raw: &str) -> String {
        if raw.trim().is_empty() {
            return raw.to_string();
        }

        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();

        match digits.len() {
            0 => String::new(),
            1 => {
                if digits.as_bytes()[0] >= b'2' {
                    format!("0{}{}", digits, SEPARATOR)
                } else {
                    digits
                }
            }
            _ => {
                let month: u32 = digits[..2].parse().unwrap_or(0);
                let (month, year) = if month >= 13 {
                    (format!("0{}", &digits[..1]), &digits[1..])
                } else {
                    (digits[..2].to_string(), &digits[2..])
                };
                let mut date = format!("{}{}{}", month, SEPARATOR, year);
                date.truncate(MAX_LENGTH);
                date
            }
        }
    }

    /// Returns true if `current` is `previous` with its trailing separator
    /// deleted.
    ///
    /// Sanitising would put the separator straight back, so the edit must be
    /// committed as is.
    ///
    /// # Example
    ///
    /// ```
    /// use cardfield::expiry::ExpiryDateSanitiser;
    ///
    /// assert!(ExpiryDateSanitiser::is_separator_deletion("02/", "02"));
    /// assert!(!ExpiryDateSanitiser::is_separator_deletion("02/2", "02/"));
    /// ```
    pub fn is_separator_deletion(previous: &str, current: &str) -> bool {
        previous
            .strip_suffix(SEPARATOR)
            .is_some_and(|rest| rest == current)
    }
}

/// Source of the current time.
pub trait Clock {
    /// Returns the current time in the time zone expiry is judged in.
    fn now(&self) -> DateTime<FixedOffset>;
}

/// Reads the system clock in the local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        to_fixed(Local::now())
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<FixedOffset>);

impl FixedClock {
    /// Creates a clock stopped at `now`.
    pub fn new<Tz: TimeZone>(now: DateTime<Tz>) -> Self {
        Self(to_fixed(now))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}

/// Adapts a closure returning the current time.
///
/// ```
/// use cardfield::expiry::{Clock, FnClock};
/// use chrono::Utc;
///
/// let clock = FnClock(Utc::now);
/// assert_eq!(clock.now().offset().local_minus_utc(), 0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FnClock<F>(pub F);

impl<Tz, F> Clock for FnClock<F>
where
    Tz: TimeZone,
    F: Fn() -> DateTime<Tz>,
{
    fn now(&self) -> DateTime<FixedOffset> {
        to_fixed((self.0)())
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> DateTime<FixedOffset> {
        (**self).now()
    }
}

fn to_fixed<Tz: TimeZone>(time: DateTime<Tz>) -> DateTime<FixedOffset> {
    let offset = time.offset().fix();
    time.with_timezone(&offset)
}

/// Validates complete `MM/YY` expiry dates against a clock.
pub struct ExpiryDateValidator<C = SystemClock> {
    rule: ValidationRule,
    clock: C,
}

impl Default for ExpiryDateValidator<SystemClock> {
    fn default() -> Self {
        Self::new(SystemClock)
    }
}

impl<C: Clock> ExpiryDateValidator<C> {
    /// Creates a validator reading the time from `clock`.
    pub fn new(clock: C) -> Self {
        Self {
            rule: CardDefaults::expiry_date(),
            clock,
        }
    }

    /// Returns true if `text` is a well-formed date that has not passed.
    pub fn validate(&self, text: &str) -> bool {
        self.validate_at(text, &self.clock.now())
    }

    /// Returns true if `text` is a well-formed date that has not passed at
    /// `now`.
    pub fn validate_at<Tz: TimeZone>(&self, text: &str, now: &DateTime<Tz>) -> bool {
        if !GenericValidator::validate(text, &self.rule) {
            return false;
        }

        let Some((month, year)) = parse_month_year(text) else {
            return false;
        };

        match first_day_after(month, year) {
            Some(end) => now.naive_local() < end,
            None => false,
        }
    }
}

impl<C> fmt::Debug for ExpiryDateValidator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExpiryDateValidator")
            .field("rule", &self.rule)
            .finish_non_exhaustive()
    }
}

fn parse_month_year(text: &str) -> Option<(u32, i32)> {
    let (month, year) = text.split_once(SEPARATOR)?;
    Some((month.parse().ok()?, CENTURY + year.parse::<i32>().ok()?))
}

/// Midnight at the start of the month after `month`/`year`.
fn first_day_after(month: u32, year: i32) -> Option<chrono::NaiveDateTime> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if first.month() == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next.and_hms_opt(0, 0, 0)
}
