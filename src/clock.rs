use crate::config::parse_date;
use crate::error::Result;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn on(date: NaiveDate) -> Self {
        Self(Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN)))
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The clock for a run: pinned to `date` when given, otherwise the system clock.
pub fn clock_for(date: Option<&str>) -> Result<Box<dyn Clock>> {
    match date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(raw) => Ok(Box::new(FixedClock::on(parse_date(raw)?))),
        None => Ok(Box::new(SystemClock)),
    }
}
