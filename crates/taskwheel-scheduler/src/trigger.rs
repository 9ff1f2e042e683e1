use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};

use taskwheel_core::Frequency;

use crate::types::TriggerRule;

/// Upper bound on the Monthly month walk. A day-of-month up to 31 exists at
/// most two months apart, so the walk always terminates well before this.
const MONTH_SCAN_HORIZON: u32 = 60;

/// Reduce an anchor datetime to the recurring rule for `frequency`.
///
/// Pure field extraction: `Daily` keeps hour+minute, `Weekly` adds the
/// anchor's weekday, `Monthly` adds its day-of-month. The anchor's calendar
/// date is otherwise discarded.
pub fn compile(frequency: Frequency, anchor: NaiveDateTime) -> TriggerRule {
    match frequency {
        Frequency::Daily => TriggerRule::Daily {
            hour: anchor.hour(),
            minute: anchor.minute(),
        },
        Frequency::Weekly => TriggerRule::Weekly {
            weekday: anchor.weekday().num_days_from_monday() as u8,
            hour: anchor.hour(),
            minute: anchor.minute(),
        },
        Frequency::Monthly => TriggerRule::Monthly {
            day: anchor.day(),
            hour: anchor.hour(),
            minute: anchor.minute(),
        },
    }
}

/// Compute the next occurrence of `rule` strictly after `from`.
///
/// `Monthly` rules anchored on day 29-31 never fire in months lacking that
/// day; the month is skipped, not clamped.
pub fn next_fire(rule: &TriggerRule, from: NaiveDateTime) -> Option<NaiveDateTime> {
    match *rule {
        TriggerRule::Daily { hour, minute } => {
            // Today's candidate at HH:MM:00.
            let candidate = from.date().and_hms_opt(hour, minute, 0)?;
            if candidate > from {
                Some(candidate)
            } else {
                // Today's window has passed — advance to tomorrow.
                Some(candidate + Duration::days(1))
            }
        }

        TriggerRule::Weekly {
            weekday,
            hour,
            minute,
        } => {
            // 0 = Monday … 6 = Sunday, matching chrono's num_days_from_monday.
            let today = from.weekday().num_days_from_monday() as i64;
            let days_ahead = (i64::from(weekday) - today).rem_euclid(7);
            let candidate = (from.date() + Duration::days(days_ahead)).and_hms_opt(hour, minute, 0)?;
            if candidate > from {
                Some(candidate)
            } else {
                // The time on the target weekday has already passed — push 7 days.
                Some(candidate + Duration::days(7))
            }
        }

        TriggerRule::Monthly { day, hour, minute } => {
            // Walk forward month by month; months lacking `day` never fire.
            let (mut year, mut month) = (from.year(), from.month());
            for _ in 0..MONTH_SCAN_HORIZON {
                if let Some(candidate) = NaiveDate::from_ymd_opt(year, month, day)
                    .and_then(|d| d.and_hms_opt(hour, minute, 0))
                {
                    if candidate > from {
                        return Some(candidate);
                    }
                }
                month += 1;
                if month > 12 {
                    month = 1;
                    year += 1;
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskwheel_core::parse_anchor;

    fn anchor(text: &str) -> NaiveDateTime {
        parse_anchor(text).unwrap()
    }

    // --- compile: clock-of-day fields always survive ---

    #[test]
    fn daily_keeps_clock_of_day() {
        let rule = compile(Frequency::Daily, anchor("2024-06-01 09:30"));
        assert_eq!(rule, TriggerRule::Daily { hour: 9, minute: 30 });
    }

    #[test]
    fn weekly_keeps_weekday_and_clock() {
        // 2024-06-03 is a Monday.
        let rule = compile(Frequency::Weekly, anchor("2024-06-03 09:30"));
        assert_eq!(
            rule,
            TriggerRule::Weekly {
                weekday: 0,
                hour: 9,
                minute: 30
            }
        );
    }

    #[test]
    fn monthly_keeps_day_and_clock() {
        let rule = compile(Frequency::Monthly, anchor("2024-01-31 09:30"));
        assert_eq!(
            rule,
            TriggerRule::Monthly {
                day: 31,
                hour: 9,
                minute: 30
            }
        );
    }

    #[test]
    fn anchor_date_is_discarded_for_daily() {
        // Two anchors a year apart compile to the same rule.
        let a = compile(Frequency::Daily, anchor("2023-01-15 07:45"));
        let b = compile(Frequency::Daily, anchor("2024-06-01 07:45"));
        assert_eq!(a, b);
    }

    // --- next_fire: Daily ---

    #[test]
    fn daily_fires_later_today_when_time_ahead() {
        let rule = TriggerRule::Daily { hour: 9, minute: 30 };
        let next = next_fire(&rule, anchor("2024-06-01 08:00")).unwrap();
        assert_eq!(next, anchor("2024-06-01 09:30"));
    }

    #[test]
    fn daily_fires_tomorrow_when_time_passed() {
        let rule = TriggerRule::Daily { hour: 9, minute: 30 };
        let next = next_fire(&rule, anchor("2024-06-01 10:00")).unwrap();
        assert_eq!(next, anchor("2024-06-02 09:30"));
    }

    #[test]
    fn daily_fire_is_strictly_future() {
        // Exactly at the fire instant the next occurrence is tomorrow's.
        let rule = TriggerRule::Daily { hour: 9, minute: 30 };
        let next = next_fire(&rule, anchor("2024-06-01 09:30")).unwrap();
        assert_eq!(next, anchor("2024-06-02 09:30"));
    }

    // --- next_fire: Weekly ---

    #[test]
    fn weekly_fires_on_next_monday() {
        let rule = TriggerRule::Weekly {
            weekday: 0,
            hour: 9,
            minute: 30,
        };
        // From a Tuesday the next Monday is six days out.
        let next = next_fire(&rule, anchor("2024-06-04 10:00")).unwrap();
        assert_eq!(next, anchor("2024-06-10 09:30"));
    }

    #[test]
    fn weekly_fires_same_day_when_time_ahead() {
        let rule = TriggerRule::Weekly {
            weekday: 0,
            hour: 9,
            minute: 30,
        };
        // Monday morning, before 09:30.
        let next = next_fire(&rule, anchor("2024-06-03 08:00")).unwrap();
        assert_eq!(next, anchor("2024-06-03 09:30"));
    }

    #[test]
    fn weekly_pushes_a_week_when_time_passed() {
        let rule = TriggerRule::Weekly {
            weekday: 0,
            hour: 9,
            minute: 30,
        };
        // Monday afternoon; this week's slot is gone.
        let next = next_fire(&rule, anchor("2024-06-03 12:00")).unwrap();
        assert_eq!(next, anchor("2024-06-10 09:30"));
    }

    // --- next_fire: Monthly ---

    #[test]
    fn monthly_fires_later_this_month() {
        let rule = TriggerRule::Monthly {
            day: 31,
            hour: 9,
            minute: 30,
        };
        let next = next_fire(&rule, anchor("2024-01-10 00:00")).unwrap();
        assert_eq!(next, anchor("2024-01-31 09:30"));
    }

    #[test]
    fn monthly_day_31_skips_april() {
        let rule = TriggerRule::Monthly {
            day: 31,
            hour: 9,
            minute: 30,
        };
        // After March 31 the next month with a 31st is May; April never fires.
        let next = next_fire(&rule, anchor("2024-03-31 10:00")).unwrap();
        assert_eq!(next, anchor("2024-05-31 09:30"));
    }

    #[test]
    fn monthly_day_29_fires_in_leap_february() {
        let rule = TriggerRule::Monthly {
            day: 29,
            hour: 9,
            minute: 30,
        };
        let next = next_fire(&rule, anchor("2024-02-01 00:00")).unwrap();
        assert_eq!(next, anchor("2024-02-29 09:30"));
    }

    #[test]
    fn monthly_day_29_skips_common_february() {
        let rule = TriggerRule::Monthly {
            day: 29,
            hour: 9,
            minute: 30,
        };
        let next = next_fire(&rule, anchor("2025-02-01 00:00")).unwrap();
        assert_eq!(next, anchor("2025-03-29 09:30"));
    }
}
