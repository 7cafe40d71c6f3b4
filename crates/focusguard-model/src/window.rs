//! Temporal predicates: when a block rule is in force
//!
//! Three window shapes are supported. Each answers two questions about an
//! instant (epoch milliseconds): is the window active now, and when is the
//! earliest later instant at which that answer changes.

use bitflags::bitflags;
use chrono::Weekday;
use focusguard_util::{DAY_MILLIS, WallClock, epoch_weekday_index, local_midnight, local_time_of_day};

use crate::{ValidationError, ValidationResult};

bitflags! {
    /// Days of the week, numbered from the epoch: bit 0 is the weekday of
    /// 1970-01-01 (a Thursday), bit 6 is Wednesday.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WeekdayMask: u8 {
        const THURSDAY = 1 << 0;
        const FRIDAY = 1 << 1;
        const SATURDAY = 1 << 2;
        const SUNDAY = 1 << 3;
        const MONDAY = 1 << 4;
        const TUESDAY = 1 << 5;
        const WEDNESDAY = 1 << 6;
    }
}

impl WeekdayMask {
    pub const WEEKDAYS: WeekdayMask = WeekdayMask::MONDAY
        .union(WeekdayMask::TUESDAY)
        .union(WeekdayMask::WEDNESDAY)
        .union(WeekdayMask::THURSDAY)
        .union(WeekdayMask::FRIDAY);
    pub const WEEKENDS: WeekdayMask = WeekdayMask::SATURDAY.union(WeekdayMask::SUNDAY);

    /// Validate a raw mask as stored on disk
    pub fn from_raw(mask: i64) -> ValidationResult<Self> {
        if !(1..=127).contains(&mask) {
            return Err(ValidationError::InvalidWeekdayMask(mask));
        }
        Ok(Self::from_bits_truncate(mask as u8))
    }

    /// Bit for a calendar weekday
    pub fn for_weekday(day: Weekday) -> Self {
        let index = (day.num_days_from_monday() + 4) % 7;
        Self::from_bits_truncate(1 << index)
    }

    /// Whether the epoch-anchored weekday index (see [`epoch_weekday_index`]) is set
    pub fn contains_index(self, index: u32) -> bool {
        index < 7 && self.bits() & (1u8 << index) != 0
    }
}

/// Absolute `[start, end)` range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OneTimeWindow {
    start_millis: i64,
    end_millis: i64,
}

impl OneTimeWindow {
    pub fn new(start_millis: i64, end_millis: i64) -> ValidationResult<Self> {
        if start_millis >= end_millis {
            return Err(ValidationError::InvertedWindow {
                start: start_millis,
                end: end_millis,
            });
        }
        Ok(Self {
            start_millis,
            end_millis,
        })
    }

    pub fn start_millis(&self) -> i64 {
        self.start_millis
    }

    pub fn end_millis(&self) -> i64 {
        self.end_millis
    }

    pub fn evaluate(&self, now_millis: i64) -> bool {
        (self.start_millis..self.end_millis).contains(&now_millis)
    }

    /// Start if not begun, end if inside, nothing once past
    pub fn next_transition(&self, now_millis: i64) -> Option<i64> {
        if now_millis < self.start_millis {
            Some(self.start_millis)
        } else if now_millis < self.end_millis {
            Some(self.end_millis)
        } else {
            None
        }
    }
}

/// Wall-clock window repeating every day in a fixed-offset local time.
///
/// `start > end` wraps past midnight. `start == end` is a zero-width window
/// that is never active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DailyWindow {
    start: WallClock,
    end: WallClock,
    tz_offset_millis: i64,
}

impl DailyWindow {
    pub fn new(
        start_hour: i64,
        start_minute: i64,
        end_hour: i64,
        end_minute: i64,
        tz_offset_millis: i64,
    ) -> ValidationResult<Self> {
        let start = wall_clock(start_hour, start_minute, "Start hour", "Start minute")?;
        let end = wall_clock(end_hour, end_minute, "End hour", "End minute")?;
        if !(-DAY_MILLIS..=DAY_MILLIS).contains(&tz_offset_millis) {
            return Err(ValidationError::InvalidTimezoneOffset(tz_offset_millis));
        }
        Ok(Self {
            start,
            end,
            tz_offset_millis,
        })
    }

    pub fn start(&self) -> WallClock {
        self.start
    }

    pub fn end(&self) -> WallClock {
        self.end
    }

    pub fn tz_offset_millis(&self) -> i64 {
        self.tz_offset_millis
    }

    pub fn wraps_midnight(&self) -> bool {
        self.start > self.end
    }

    /// Whether a local time of day (ms since local midnight) falls in the window
    pub fn contains_time_of_day(&self, time_of_day: i64) -> bool {
        let start = self.start.as_millis_from_midnight();
        let end = self.end.as_millis_from_midnight();
        if start <= end {
            time_of_day >= start && time_of_day < end
        } else {
            time_of_day >= start || time_of_day < end
        }
    }

    pub fn evaluate(&self, now_millis: i64) -> bool {
        self.contains_time_of_day(local_time_of_day(now_millis, self.tz_offset_millis))
    }

    pub fn next_transition(&self, now_millis: i64) -> Option<i64> {
        first_change(now_millis, self.boundaries(now_millis, 2), |t| self.evaluate(t))
    }

    /// Window open/close instants for the local days starting at or before
    /// `now_millis` and the following `days` days
    fn boundaries(&self, now_millis: i64, days: i64) -> impl Iterator<Item = i64> {
        let midnight = local_midnight(now_millis, self.tz_offset_millis);
        let start = self.start.as_millis_from_midnight();
        let end = self.end.as_millis_from_midnight();
        (0..=days)
            .filter_map(move |k| midnight.checked_add(k * DAY_MILLIS))
            .flat_map(move |day| [day.checked_add(start), day.checked_add(end)])
            .flatten()
    }
}

/// A daily window further gated by a weekday mask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayWindow {
    days: WeekdayMask,
    span: DailyWindow,
}

impl WeekdayWindow {
    pub fn new(
        weekday_mask: i64,
        start_hour: i64,
        start_minute: i64,
        end_hour: i64,
        end_minute: i64,
        tz_offset_millis: i64,
    ) -> ValidationResult<Self> {
        let days = WeekdayMask::from_raw(weekday_mask)?;
        let span = DailyWindow::new(start_hour, start_minute, end_hour, end_minute, tz_offset_millis)?;
        Ok(Self { days, span })
    }

    pub fn from_parts(days: WeekdayMask, span: DailyWindow) -> Self {
        Self { days, span }
    }

    pub fn days(&self) -> WeekdayMask {
        self.days
    }

    pub fn span(&self) -> &DailyWindow {
        &self.span
    }

    pub fn evaluate(&self, now_millis: i64) -> bool {
        self.days.contains_index(epoch_weekday_index(now_millis)) && self.span.evaluate(now_millis)
    }

    /// The weekday gate flips at epoch day boundaries, the span at local
    /// boundaries; both are scanned for a full week plus one day.
    pub fn next_transition(&self, now_millis: i64) -> Option<i64> {
        let today = now_millis.saturating_sub(now_millis.rem_euclid(DAY_MILLIS));
        let day_flips = (1..=8).filter_map(move |k| today.checked_add(k * DAY_MILLIS));
        first_change(
            now_millis,
            self.span.boundaries(now_millis, 8).chain(day_flips),
            |t| self.evaluate(t),
        )
    }
}

/// The temporal predicate of a block rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleWindow {
    OneTime(OneTimeWindow),
    Daily(DailyWindow),
    Weekday(WeekdayWindow),
}

impl RuleWindow {
    pub fn evaluate(&self, now_millis: i64) -> bool {
        match self {
            RuleWindow::OneTime(w) => w.evaluate(now_millis),
            RuleWindow::Daily(w) => w.evaluate(now_millis),
            RuleWindow::Weekday(w) => w.evaluate(now_millis),
        }
    }

    /// Earliest instant strictly after `now_millis` where [`Self::evaluate`]
    /// changes value, if any
    pub fn next_transition(&self, now_millis: i64) -> Option<i64> {
        match self {
            RuleWindow::OneTime(w) => w.next_transition(now_millis),
            RuleWindow::Daily(w) => w.next_transition(now_millis),
            RuleWindow::Weekday(w) => w.next_transition(now_millis),
        }
    }

    /// Tag used in the persisted snapshot
    pub fn type_tag(&self) -> &'static str {
        match self {
            RuleWindow::OneTime(_) => ONE_TIME_TAG,
            RuleWindow::Daily(_) => DAILY_TAG,
            RuleWindow::Weekday(_) => WEEKDAY_TAG,
        }
    }
}

pub const ONE_TIME_TAG: &str = "ONE_TIME";
pub const DAILY_TAG: &str = "DAILY";
pub const WEEKDAY_TAG: &str = "WEEKDAY";

impl From<OneTimeWindow> for RuleWindow {
    fn from(w: OneTimeWindow) -> Self {
        RuleWindow::OneTime(w)
    }
}

impl From<DailyWindow> for RuleWindow {
    fn from(w: DailyWindow) -> Self {
        RuleWindow::Daily(w)
    }
}

impl From<WeekdayWindow> for RuleWindow {
    fn from(w: WeekdayWindow) -> Self {
        RuleWindow::Weekday(w)
    }
}

fn wall_clock(
    hour: i64,
    minute: i64,
    hour_field: &'static str,
    minute_field: &'static str,
) -> ValidationResult<WallClock> {
    if !(0..=23).contains(&hour) {
        return Err(ValidationError::InvalidHour {
            field: hour_field,
            value: hour,
        });
    }
    if !(0..=59).contains(&minute) {
        return Err(ValidationError::InvalidMinute {
            field: minute_field,
            value: minute,
        });
    }
    WallClock::new(hour as u8, minute as u8).ok_or(ValidationError::InvalidHour {
        field: hour_field,
        value: hour,
    })
}

/// The predicate is constant between consecutive candidates, so the first
/// candidate after `now` with a different value is the next transition.
fn first_change(
    now_millis: i64,
    candidates: impl Iterator<Item = i64>,
    evaluate: impl Fn(i64) -> bool,
) -> Option<i64> {
    let mut points: Vec<i64> = candidates.filter(|&t| t > now_millis).collect();
    points.sort_unstable();
    points.dedup();

    let current = evaluate(now_millis);
    points.into_iter().find(|&t| evaluate(t) != current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusguard_util::{HOUR_MILLIS, MINUTE_MILLIS};
    use proptest::prelude::*;

    /// 2024-01-01 00:00:00 UTC, a Monday
    const MONDAY_MIDNIGHT: i64 = 1_704_067_200_000;

    fn at(hour: i64, minute: i64) -> i64 {
        MONDAY_MIDNIGHT + hour * HOUR_MILLIS + minute * MINUTE_MILLIS
    }

    #[test]
    fn one_time_is_half_open() {
        let w = OneTimeWindow::new(1_000, 2_000).unwrap();
        assert!(!w.evaluate(999));
        assert!(w.evaluate(1_000));
        assert!(w.evaluate(1_999));
        assert!(!w.evaluate(2_000));
    }

    #[test]
    fn one_time_rejects_inverted_and_empty() {
        assert!(matches!(
            OneTimeWindow::new(2_000, 1_000),
            Err(ValidationError::InvertedWindow { .. })
        ));
        assert!(OneTimeWindow::new(1_000, 1_000).is_err());
    }

    #[test]
    fn one_time_next_transition() {
        let w = OneTimeWindow::new(1_000, 2_000).unwrap();
        assert_eq!(w.next_transition(0), Some(1_000));
        assert_eq!(w.next_transition(1_500), Some(2_000));
        assert_eq!(w.next_transition(2_000), None);
    }

    #[test]
    fn daily_rejects_out_of_range_fields() {
        assert!(matches!(
            DailyWindow::new(24, 0, 17, 0, 0),
            Err(ValidationError::InvalidHour { .. })
        ));
        assert!(matches!(
            DailyWindow::new(9, 60, 17, 0, 0),
            Err(ValidationError::InvalidMinute { .. })
        ));
        assert!(DailyWindow::new(9, 0, -1, 0, 0).is_err());
        assert!(DailyWindow::new(9, 0, 17, -5, 0).is_err());
    }

    #[test]
    fn daily_rejects_offsets_beyond_a_day() {
        assert!(matches!(
            DailyWindow::new(9, 0, 17, 0, i64::MIN),
            Err(ValidationError::InvalidTimezoneOffset(i64::MIN))
        ));
        assert!(DailyWindow::new(9, 0, 17, 0, DAY_MILLIS + 1).is_err());
        assert!(WeekdayWindow::new(127, 9, 0, 17, 0, -DAY_MILLIS - 1).is_err());
        assert!(DailyWindow::new(9, 0, 17, 0, DAY_MILLIS).is_ok());
        assert!(DailyWindow::new(9, 0, 17, 0, -DAY_MILLIS).is_ok());
    }

    #[test]
    fn windows_survive_extreme_instants() {
        let daily = DailyWindow::new(22, 0, 6, 0, -DAY_MILLIS).unwrap();
        let weekday = WeekdayWindow::new(0b101_0101, 9, 0, 17, 0, DAY_MILLIS).unwrap();
        for now in [i64::MIN, i64::MIN + 1, i64::MAX - 1, i64::MAX] {
            daily.evaluate(now);
            weekday.evaluate(now);
            if let Some(next) = daily.next_transition(now) {
                assert!(next > now);
            }
            if let Some(next) = weekday.next_transition(now) {
                assert!(next > now);
            }
        }
    }

    #[test]
    fn daily_business_hours() {
        let w = DailyWindow::new(9, 0, 17, 0, 0).unwrap();
        assert!(!w.evaluate(at(8, 59)));
        assert!(w.evaluate(at(9, 0)));
        assert!(w.evaluate(at(16, 59)));
        assert!(!w.evaluate(at(17, 0)));
        assert_eq!(w.next_transition(at(10, 0)), Some(at(17, 0)));
        assert_eq!(w.next_transition(at(18, 0)), Some(at(33, 0)));
        assert_eq!(w.next_transition(at(3, 0)), Some(at(9, 0)));
    }

    #[test]
    fn daily_wraps_past_midnight() {
        let w = DailyWindow::new(22, 0, 6, 0, 0).unwrap();
        assert!(w.wraps_midnight());
        assert!(w.evaluate(at(23, 0)));
        assert!(w.evaluate(at(2, 0)));
        assert!(!w.evaluate(at(6, 0)));
        assert!(!w.evaluate(at(12, 0)));

        // Inside the morning part the window closes before it next opens
        assert_eq!(w.next_transition(at(2, 0)), Some(at(6, 0)));
        assert_eq!(w.next_transition(at(12, 0)), Some(at(22, 0)));
        assert_eq!(w.next_transition(at(23, 0)), Some(at(30, 0)));
    }

    #[test]
    fn daily_zero_width_is_never_active() {
        let w = DailyWindow::new(9, 0, 9, 0, 0).unwrap();
        for hour in 0..24 {
            assert!(!w.evaluate(at(hour, 0)));
            assert!(!w.evaluate(at(hour, 30)));
        }
        assert_eq!(w.next_transition(at(8, 0)), None);
    }

    #[test]
    fn daily_respects_timezone_offset() {
        // Local time = UTC - offset: an offset of -2h moves local two hours ahead
        let w = DailyWindow::new(9, 0, 17, 0, -2 * HOUR_MILLIS).unwrap();
        assert!(w.evaluate(at(7, 0)));
        assert!(!w.evaluate(at(15, 0)));
        assert_eq!(w.next_transition(at(8, 0)), Some(at(15, 0)));
    }

    #[test]
    fn weekday_mask_validation() {
        assert!(WeekdayMask::from_raw(0).is_err());
        assert!(WeekdayMask::from_raw(128).is_err());
        assert!(WeekdayMask::from_raw(-1).is_err());
        assert_eq!(WeekdayMask::from_raw(127).unwrap(), WeekdayMask::all());
    }

    #[test]
    fn weekday_mask_matches_epoch_numbering() {
        assert_eq!(WeekdayMask::for_weekday(Weekday::Thu), WeekdayMask::THURSDAY);
        assert_eq!(WeekdayMask::for_weekday(Weekday::Mon), WeekdayMask::MONDAY);
        assert!(WeekdayMask::MONDAY.contains_index(epoch_weekday_index(MONDAY_MIDNIGHT)));
        assert!(WeekdayMask::THURSDAY.contains_index(epoch_weekday_index(0)));
        assert!(!WeekdayMask::all().contains_index(7));
    }

    #[test]
    fn weekday_window_gates_by_day() {
        let mask = WeekdayMask::WEEKDAYS.bits() as i64;
        let w = WeekdayWindow::new(mask, 9, 0, 17, 0, 0).unwrap();

        assert!(w.evaluate(at(10, 0))); // Monday
        assert!(!w.evaluate(at(5 * 24 + 10, 0))); // Saturday
        assert!(!w.evaluate(at(6 * 24 + 10, 0))); // Sunday
        assert!(w.evaluate(at(7 * 24 + 10, 0))); // next Monday
    }

    #[test]
    fn weekday_next_transition_skips_disallowed_days() {
        let mask = WeekdayMask::MONDAY.bits() as i64;
        let w = WeekdayWindow::new(mask, 9, 0, 17, 0, 0).unwrap();

        assert_eq!(w.next_transition(at(10, 0)), Some(at(17, 0)));
        // After Monday's window closes the next change is the following Monday
        assert_eq!(w.next_transition(at(18, 0)), Some(at(7 * 24 + 9, 0)));
    }

    #[test]
    fn weekday_zero_width_has_no_transition() {
        let w = WeekdayWindow::new(127, 12, 0, 12, 0, 0).unwrap();
        assert!(!w.evaluate(at(12, 0)));
        assert_eq!(w.next_transition(at(11, 0)), None);
    }

    #[test]
    fn rule_window_dispatch() {
        let window: RuleWindow = DailyWindow::new(9, 0, 17, 0, 0).unwrap().into();
        assert_eq!(window.type_tag(), DAILY_TAG);
        assert!(window.evaluate(at(12, 0)));
        assert_eq!(window.next_transition(at(12, 0)), Some(at(17, 0)));
    }

    fn daily_strategy() -> impl Strategy<Value = DailyWindow> {
        (0i64..24, 0i64..60, 0i64..24, 0i64..60, -14i64 * 60..=14 * 60).prop_map(
            |(sh, sm, eh, em, tz_minutes)| {
                DailyWindow::new(sh, sm, eh, em, tz_minutes * MINUTE_MILLIS).unwrap()
            },
        )
    }

    fn weekday_strategy() -> impl Strategy<Value = WeekdayWindow> {
        (1i64..=127, daily_strategy()).prop_map(|(mask, span)| {
            WeekdayWindow::from_parts(WeekdayMask::from_raw(mask).unwrap(), span)
        })
    }

    proptest! {
        #[test]
        fn one_time_contains_iff_in_range(start in -1_000_000i64..1_000_000, len in 1i64..1_000_000, now in -3_000_000i64..3_000_000) {
            let w = OneTimeWindow::new(start, start + len).unwrap();
            prop_assert_eq!(w.evaluate(now), start <= now && now < start + len);
            prop_assert!(!w.evaluate(start - 1));
            prop_assert!(!w.evaluate(start + len));
        }

        #[test]
        fn daily_active_span_is_one_contiguous_interval(w in daily_strategy(), day in 0i64..20_000) {
            let midnight = local_midnight(day * DAY_MILLIS, w.tz_offset_millis());
            let samples: Vec<bool> = (0..1440)
                .map(|i| w.evaluate(midnight + i * MINUTE_MILLIS))
                .collect();

            let start = w.start().as_millis_from_midnight() / MINUTE_MILLIS;
            let end = w.end().as_millis_from_midnight() / MINUTE_MILLIS;
            let expected = if start <= end { end - start } else { 1440 - (start - end) };
            prop_assert_eq!(samples.iter().filter(|a| **a).count() as i64, expected);

            let flips = (0..1440).filter(|&i| samples[i] != samples[(i + 1) % 1440]).count();
            if expected == 0 || expected == 1440 {
                prop_assert_eq!(flips, 0);
            } else {
                prop_assert_eq!(flips, 2);
            }
        }

        #[test]
        fn weekday_is_false_when_day_bit_unset(now in 0i64..4_000_000_000_000, hour in 0i64..24) {
            let index = epoch_weekday_index(now);
            let mask = 127 & !(1i64 << index);
            let w = WeekdayWindow::new(mask, hour, 0, (hour + 1) % 24, 0, 0).unwrap();
            prop_assert!(!w.evaluate(now));
        }

        #[test]
        fn daily_next_transition_is_the_first_change(w in daily_strategy(), now in 0i64..4_000_000_000_000) {
            match w.next_transition(now) {
                Some(next) => {
                    prop_assert!(next > now);
                    prop_assert_ne!(w.evaluate(next), w.evaluate(now));
                    let mut t = now;
                    while t < next {
                        prop_assert_eq!(w.evaluate(t), w.evaluate(now));
                        t += MINUTE_MILLIS;
                    }
                    prop_assert_eq!(w.evaluate(next - 1), w.evaluate(now));
                }
                None => prop_assert_eq!(w.start(), w.end()),
            }
        }

        #[test]
        fn weekday_next_transition_is_the_first_change(w in weekday_strategy(), now in 0i64..4_000_000_000_000) {
            let current = w.evaluate(now);
            match w.next_transition(now) {
                Some(next) => {
                    prop_assert!(next > now);
                    prop_assert_ne!(w.evaluate(next), current);
                    prop_assert_eq!(w.evaluate(next - 1), current);
                    // Every boundary is minute aligned, so checking each minute is exhaustive
                    let mut t = (now.div_euclid(MINUTE_MILLIS) + 1) * MINUTE_MILLIS;
                    while t < next {
                        prop_assert_eq!(w.evaluate(t), current);
                        t += MINUTE_MILLIS;
                    }
                }
                None => {
                    prop_assert_eq!(w.span().start(), w.span().end());
                    prop_assert!(!current);
                }
            }
        }
    }
}
