use crate::domain::{Bar, BarInterval};
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashSet;

// Weekly bars may land on any weekday once holidays shift the session.
const WEEKLY_GAP_DAYS: i64 = 10;

/// Trading calendar used for gap detection: weekends plus configured holidays.
#[derive(Debug, Clone, Default)]
pub struct MarketCalendar {
    holidays: HashSet<NaiveDate>,
}

impl MarketCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.holidays.contains(&date)
    }

    /// Business days strictly between `from` and `to`.
    pub fn business_days_between(&self, from: NaiveDate, to: NaiveDate) -> usize {
        let mut count = 0;
        let mut date = from + Duration::days(1);
        while date < to {
            if self.is_business_day(date) {
                count += 1;
            }
            date = date + Duration::days(1);
        }
        count
    }

    /// Whether `cur` follows `prev` with at least one missing bar in between.
    pub fn is_gap(&self, interval: BarInterval, prev: &Bar, cur: &Bar) -> bool {
        let delta = cur.timestamp - prev.timestamp;
        match interval {
            BarInterval::Daily => {
                self.business_days_between(prev.timestamp.date_naive(), cur.timestamp.date_naive())
                    > 0
            }
            BarInterval::Weekly => delta > Duration::days(WEEKLY_GAP_DAYS),
            BarInterval::Minute | BarInterval::Hour => {
                // Session boundaries (overnight, weekends) are not gaps.
                prev.timestamp.date_naive() == cur.timestamp.date_naive()
                    && delta > interval.nominal()
            }
        }
    }

    /// Indices `i` such that a gap precedes bar `i`.
    pub fn find_gaps(&self, interval: BarInterval, bars: &[Bar]) -> Vec<usize> {
        bars.windows(2)
            .enumerate()
            .filter(|(_, w)| self.is_gap(interval, &w[0], &w[1]))
            .map(|(i, _)| i + 1)
            .collect()
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar_on(y: i32, m: u32, d: u32, h: u32) -> Bar {
        Bar {
            timestamp: Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap(),
            open: 10.0,
            high: 10.0,
            low: 10.0,
            close: 10.0,
            volume: 0,
        }
    }

    #[test]
    fn weekend_is_not_a_daily_gap() {
        let cal = MarketCalendar::default();
        // 2026-01-02 is Friday, 2026-01-05 is Monday.
        assert!(!cal.is_gap(
            BarInterval::Daily,
            &bar_on(2026, 1, 2, 0),
            &bar_on(2026, 1, 5, 0)
        ));
    }

    #[test]
    fn missing_weekday_is_a_daily_gap() {
        let cal = MarketCalendar::default();
        let bars = [
            bar_on(2026, 1, 5, 0),
            bar_on(2026, 1, 6, 0),
            bar_on(2026, 1, 8, 0),
        ];
        assert_eq!(cal.find_gaps(BarInterval::Daily, &bars), vec![2]);
    }

    #[test]
    fn configured_holiday_is_skipped() {
        let holiday = NaiveDate::from_ymd_opt(2026, 1, 7).unwrap();
        let cal = MarketCalendar::new([holiday]);
        let bars = [bar_on(2026, 1, 6, 0), bar_on(2026, 1, 8, 0)];
        assert!(cal.find_gaps(BarInterval::Daily, &bars).is_empty());
    }

    #[test]
    fn intraday_gap_only_within_session() {
        let cal = MarketCalendar::default();
        assert!(cal.is_gap(
            BarInterval::Hour,
            &bar_on(2026, 1, 5, 10),
            &bar_on(2026, 1, 5, 12)
        ));
        assert!(!cal.is_gap(
            BarInterval::Hour,
            &bar_on(2026, 1, 5, 20),
            &bar_on(2026, 1, 6, 9)
        ));
    }
}
