use anyhow::{bail, Result};
use chrono::{Duration, NaiveDate};

/// Inclusive date range processed by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl RunWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("Run window start {} is after end {}", start, end);
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |day| *day <= end)
    }

    pub fn len(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    /// Always false: a window holds at least its start day.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today - Duration::days(1)
}
