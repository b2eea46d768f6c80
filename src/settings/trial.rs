use chrono::{DateTime, Duration, Utc};

use super::entities::Preferences;

pub const TRIAL_PERIOD_DAYS: i64 = 14;

/// Records `now` as the first run date unless one is already stored. Returns whether the
/// preferences changed.
pub fn stamp_first_run(preferences: &mut Preferences, now: DateTime<Utc>) -> bool {
    if preferences.first_run_date.is_some() {
        return false;
    }
    preferences.first_run_date = Some(now);
    true
}

/// A trial without a first run date has not started yet.
pub fn trial_expired(preferences: &Preferences, now: DateTime<Utc>) -> bool {
    preferences
        .first_run_date
        .is_some_and(|start| now - start >= Duration::days(TRIAL_PERIOD_DAYS))
}

pub fn trial_days_left(preferences: &Preferences, now: DateTime<Utc>) -> i64 {
    match preferences.first_run_date {
        Some(start) => (TRIAL_PERIOD_DAYS - (now - start).num_days()).max(0),
        None => TRIAL_PERIOD_DAYS,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{stamp_first_run, trial_days_left, trial_expired, TRIAL_PERIOD_DAYS};
    use crate::settings::entities::Preferences;

    #[test]
    fn first_run_is_stamped_once() {
        let start = Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap();
        let mut preferences = Preferences::default();

        assert!(stamp_first_run(&mut preferences, start));
        assert!(!stamp_first_run(&mut preferences, start + Duration::days(1)));
        assert_eq!(preferences.first_run_date, Some(start));
    }

    #[test]
    fn trial_expires_after_period() {
        let start = Utc.with_ymd_and_hms(2018, 7, 4, 12, 0, 0).unwrap();
        let mut preferences = Preferences::default();
        assert!(!trial_expired(&preferences, start));
        assert_eq!(trial_days_left(&preferences, start), TRIAL_PERIOD_DAYS);

        stamp_first_run(&mut preferences, start);
        let almost = start + Duration::days(TRIAL_PERIOD_DAYS) - Duration::seconds(1);
        assert!(!trial_expired(&preferences, almost));
        assert_eq!(trial_days_left(&preferences, start + Duration::days(3)), 11);

        let over = start + Duration::days(TRIAL_PERIOD_DAYS);
        assert!(trial_expired(&preferences, over));
        assert_eq!(trial_days_left(&preferences, over + Duration::days(30)), 0);
    }
}
