use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Error)]
#[error("bad input: {0}")]
pub struct BadInput(pub String);

/// Source of the current UTC instant. Injectable so tests can pin time.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// All civil date/time computations for the attendance domain happen in one
/// configured IANA zone. Instants are stored in UTC and projected on demand.
#[derive(Debug, Clone, Copy)]
pub struct BusinessZone {
    tz: Tz,
}

impl BusinessZone {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn zone_id(&self) -> &'static str {
        self.tz.name()
    }

    /// Calendar date of an instant in the business zone.
    pub fn business_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.tz).date_naive()
    }

    /// Time-of-day of an instant in the business zone.
    pub fn business_time(&self, utc: DateTime<Utc>) -> NaiveTime {
        utc.with_timezone(&self.tz).time()
    }

    /// UTC instant of local midnight for a business date.
    pub fn business_day_start(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_instant(date, NaiveTime::MIN)
    }

    /// UTC instant of the last representable moment of a business date.
    pub fn business_day_end(&self, date: NaiveDate) -> DateTime<Utc> {
        let end = NaiveTime::from_hms_milli_opt(23, 59, 59, 999).unwrap();
        self.local_instant(date, end)
    }

    /// UTC instant for a local (date, time) pair. Around zone transitions an
    /// ambiguous or skipped local time resolves to the earliest valid instant.
    pub fn local_instant(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let local = NaiveDateTime::new(date, time);
        match self.tz.from_local_datetime(&local) {
            chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
            chrono::LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
            chrono::LocalResult::None => {
                // Skipped by a forward transition; land just after the gap.
                let shifted = local + Duration::hours(1);
                self.tz
                    .from_local_datetime(&shifted)
                    .earliest()
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|| Utc.from_utc_datetime(&local))
            }
        }
    }

    pub fn same_business_date(&self, a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
        self.business_date(a) == self.business_date(b)
    }

    pub fn format_business_datetime(&self, utc: DateTime<Utc>) -> String {
        utc.with_timezone(&self.tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
    }
}

/// Signed minutes from `a` to `b`.
pub fn duration_minutes(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    (b - a).num_minutes()
}

/// Signed minutes between two times-of-day on the same logical shift.
///
/// For an overnight shift a `to` earlier than `from` belongs to the next
/// civil day and gains a full day.
pub fn duration_minutes_of_day(from: NaiveTime, to: NaiveTime, is_overnight: bool) -> i64 {
    let mut minutes = (to - from).num_minutes();
    if is_overnight && to < from {
        minutes += MINUTES_PER_DAY;
    }
    minutes
}

/// Closed-interval containment. An overnight range `[start, end]` means
/// `[start, 24:00) ∪ [00:00, end]`.
pub fn in_time_range(t: NaiveTime, start: NaiveTime, end: NaiveTime, is_overnight: bool) -> bool {
    if is_overnight {
        t >= start || t <= end
    } else {
        t >= start && t <= end
    }
}

/// Add signed minutes to a time-of-day, wrapping around midnight.
pub fn wrapping_add_minutes(t: NaiveTime, minutes: i64) -> NaiveTime {
    t.overflowing_add_signed(Duration::minutes(minutes)).0
}

pub fn parse_business_date(s: &str) -> Result<NaiveDate, BadInput> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|_| BadInput(format!("invalid date '{s}', expected yyyy-mm-dd")))
}

pub fn parse_time_of_day(s: &str) -> Result<NaiveTime, BadInput> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|_| BadInput(format!("invalid time '{s}', expected HH:MM:SS")))
}

pub fn format_time_of_day(t: NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}
