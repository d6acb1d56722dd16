//! Pure trigger decision for a single alert.
//!
//! Given the alert, the cycle's price snapshot and the cycle time, decide
//! whether this occurrence should produce a notification. No I/O happens
//! here; the monitor owns every side effect.

use crate::models::{Alert, Condition, Frequency};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub fire: bool,
}

/// Strict threshold test. A price equal to the target never matches.
pub fn condition_met(condition: Condition, current_price: f64, target_price: f64) -> bool {
    match condition {
        Condition::Above => current_price > target_price,
        Condition::Below => current_price < target_price,
    }
}

/// Frequency gating once the condition holds. `now` is unix seconds.
pub fn should_notify(alert: &Alert, now: i64) -> bool {
    // a fired one-shot alert is terminal, whatever its timestamp says
    if alert.frequency == Frequency::Once && alert.is_triggered {
        return false;
    }

    let Some(last) = alert.last_triggered_at else {
        return true;
    };

    // an untriggered one-shot alert has no cooldown
    let Some(cooldown) = alert.frequency.cooldown_minutes() else {
        return true;
    };

    let elapsed_minutes = (now - last) as f64 / 60.0;
    elapsed_minutes >= cooldown
}

pub fn evaluate(alert: &Alert, current_price: f64, now: i64) -> Decision {
    if !alert.is_active || !current_price.is_finite() {
        return Decision { fire: false };
    }

    let fire = condition_met(alert.condition, current_price, alert.target_price)
        && should_notify(alert, now);

    Decision { fire }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::oid::ObjectId;

    const NOW: i64 = 1_700_000_000;

    fn alert(condition: Condition, target: f64, frequency: Frequency) -> Alert {
        Alert {
            id: ObjectId::new(),
            user_id: ObjectId::new(),
            symbol: "AAPL".into(),
            company_name: Some("Apple Inc".into()),
            condition,
            target_price: target,
            frequency,
            is_active: true,
            is_triggered: false,
            last_triggered_at: None,
            created_at: NOW - 86_400,
        }
    }

    fn fired_at(mut a: Alert, at: i64) -> Alert {
        a.is_triggered = true;
        a.last_triggered_at = Some(at);
        a
    }

    #[test]
    fn above_is_strict() {
        let a = alert(Condition::Above, 150.0, Frequency::PerMinute);
        assert!(evaluate(&a, 150.01, NOW).fire);
        assert!(!evaluate(&a, 150.0, NOW).fire);
        assert!(!evaluate(&a, 149.99, NOW).fire);
    }

    #[test]
    fn below_is_strict() {
        let a = alert(Condition::Below, 20.0, Frequency::PerMinute);
        assert!(evaluate(&a, 19.5, NOW).fire);
        assert!(!evaluate(&a, 20.0, NOW).fire);
        assert!(!evaluate(&a, 25.0, NOW).fire);
    }

    #[test]
    fn once_fires_first_time_only() {
        let a = alert(Condition::Above, 150.0, Frequency::Once);
        assert!(evaluate(&a, 151.0, NOW).fire);

        let fired = fired_at(a, NOW);
        assert!(!evaluate(&fired, 151.0, NOW + 10 * 86_400).fire);
    }

    #[test]
    fn rearmed_once_fires_despite_old_timestamp() {
        let mut a = alert(Condition::Above, 150.0, Frequency::Once);
        a.last_triggered_at = Some(NOW - 10);
        assert!(evaluate(&a, 151.0, NOW).fire);
    }

    #[test]
    fn once_with_flag_but_no_timestamp_stays_silent() {
        let mut a = alert(Condition::Above, 150.0, Frequency::Once);
        a.is_triggered = true;
        assert!(!evaluate(&a, 151.0, NOW).fire);
    }

    #[test]
    fn per_minute_waits_a_full_minute() {
        let a = fired_at(alert(Condition::Above, 10.0, Frequency::PerMinute), NOW - 30);
        assert!(!evaluate(&a, 11.0, NOW).fire);

        let a = fired_at(alert(Condition::Above, 10.0, Frequency::PerMinute), NOW - 60);
        assert!(evaluate(&a, 11.0, NOW).fire);
    }

    #[test]
    fn per_hour_boundary() {
        let t = NOW - 3_600;
        let a = fired_at(alert(Condition::Below, 10.0, Frequency::PerHour), t);
        assert!(!evaluate(&a, 9.0, t + 3_599).fire);
        assert!(evaluate(&a, 9.0, t + 3_600).fire);
        assert!(evaluate(&a, 9.0, t + 7_200).fire);
    }

    #[test]
    fn per_day_after_25_hours() {
        let a = fired_at(alert(Condition::Above, 10.0, Frequency::PerDay), NOW - 25 * 3_600);
        assert!(evaluate(&a, 12.0, NOW).fire);

        let a = fired_at(alert(Condition::Above, 10.0, Frequency::PerDay), NOW - 23 * 3_600);
        assert!(!evaluate(&a, 12.0, NOW).fire);
    }

    #[test]
    fn clock_going_backwards_does_not_fire() {
        let a = fired_at(alert(Condition::Above, 10.0, Frequency::PerMinute), NOW + 120);
        assert!(!evaluate(&a, 12.0, NOW).fire);
    }

    #[test]
    fn inactive_or_nan_never_fires() {
        let mut a = alert(Condition::Above, 10.0, Frequency::PerMinute);
        assert!(!evaluate(&a, f64::NAN, NOW).fire);
        a.is_active = false;
        assert!(!evaluate(&a, 12.0, NOW).fire);
    }

    #[test]
    fn condition_false_skips_gating() {
        let a = alert(Condition::Above, 150.0, Frequency::Once);
        assert_eq!(evaluate(&a, 149.0, NOW), Decision { fire: false });
    }
}
