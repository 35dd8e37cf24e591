//! Weekly phase clock
//!
//! Pure mapping from an instant (plus an optional administrative override)
//! to the current cycle phase. The table is fixed:
//!
//! | When                    | Phase      |
//! |-------------------------|------------|
//! | Mon before 09:00        | discussion |
//! | Mon 09:00 through Tue   | voting     |
//! | Wed                     | results    |
//! | Thu                     | blackout   |
//! | Fri through Sun         | discussion |
//!
//! The clock holds no state and performs no I/O. The override is read from
//! the runtime config document by callers and passed in per call; when set
//! it wins unconditionally.
//!
//! All times are evaluated in UTC. Callers wanting a local-time cycle shift
//! `now` before calling.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Hour (UTC) at which Monday flips from discussion to voting, and the
/// weekly proposal rotation becomes due.
pub const CYCLE_OPENS_HOUR: u32 = 9;

/// One of the four cycle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Voting,
    Results,
    Blackout,
    Discussion,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Voting => "voting",
            Self::Results => "results",
            Self::Blackout => "blackout",
            Self::Discussion => "discussion",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voting" => Ok(Self::Voting),
            "results" => Ok(Self::Results),
            "blackout" => Ok(Self::Blackout),
            "discussion" => Ok(Self::Discussion),
            other => Err(format!("unknown phase: {}", other)),
        }
    }
}

/// Current phase for `now`, with the override taking precedence over the
/// weekly table when present. Total: every instant maps to a phase.
pub fn phase_at(now: DateTime<Utc>, override_phase: Option<Phase>) -> Phase {
    if let Some(phase) = override_phase {
        return phase;
    }

    match now.weekday() {
        Weekday::Mon => {
            if now.hour() < CYCLE_OPENS_HOUR {
                // Tail of the previous cycle's discussion window.
                Phase::Discussion
            } else {
                Phase::Voting
            }
        }
        Weekday::Tue => Phase::Voting,
        Weekday::Wed => Phase::Results,
        Weekday::Thu => Phase::Blackout,
        Weekday::Fri | Weekday::Sat | Weekday::Sun => Phase::Discussion,
    }
}

/// Instant of the next phase change after `now`, derived from the same
/// table. Display-only (countdowns); never stored, never authoritative.
pub fn next_transition(now: DateTime<Utc>) -> DateTime<Utc> {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always representable")
        .and_utc();
    let week_start = midnight - Duration::days(now.weekday().num_days_from_monday() as i64);

    let boundaries = [
        week_start + Duration::hours(CYCLE_OPENS_HOUR as i64), // Mon 09:00 -> voting
        week_start + Duration::days(2),                        // Wed 00:00 -> results
        week_start + Duration::days(3),                        // Thu 00:00 -> blackout
        week_start + Duration::days(4),                        // Fri 00:00 -> discussion
        week_start + Duration::days(7) + Duration::hours(CYCLE_OPENS_HOUR as i64),
    ];

    boundaries
        .into_iter()
        .find(|b| *b > now)
        .expect("next Monday 09:00 is always after now")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn weekly_table() {
        // 2025-01-06 is a Monday.
        assert_eq!(phase_at(at(2025, 1, 6, 8), None), Phase::Discussion);
        assert_eq!(phase_at(at(2025, 1, 6, 9), None), Phase::Voting);
        assert_eq!(phase_at(at(2025, 1, 6, 23), None), Phase::Voting);
        assert_eq!(phase_at(at(2025, 1, 7, 0), None), Phase::Voting); // Tue
        assert_eq!(phase_at(at(2025, 1, 8, 12), None), Phase::Results); // Wed
        assert_eq!(phase_at(at(2025, 1, 9, 12), None), Phase::Blackout); // Thu
        assert_eq!(phase_at(at(2025, 1, 10, 0), None), Phase::Discussion); // Fri
        assert_eq!(phase_at(at(2025, 1, 11, 12), None), Phase::Discussion); // Sat
        assert_eq!(phase_at(at(2025, 1, 12, 23), None), Phase::Discussion); // Sun
    }

    #[test]
    fn override_always_wins() {
        for hour in 0..24 {
            for day in 6..13 {
                let now = at(2025, 1, day, hour);
                assert_eq!(phase_at(now, Some(Phase::Blackout)), Phase::Blackout);
            }
        }
    }

    #[test]
    fn total_over_a_full_week() {
        // Every hour of a week maps to exactly one of the four phases.
        let start = at(2025, 1, 6, 0);
        for h in 0..(7 * 24) {
            let now = start + Duration::hours(h);
            let phase = phase_at(now, None);
            assert!(matches!(
                phase,
                Phase::Voting | Phase::Results | Phase::Blackout | Phase::Discussion
            ));
        }
    }

    #[test]
    fn next_transition_walks_the_table() {
        // Monday 08:00 -> Monday 09:00
        assert_eq!(next_transition(at(2025, 1, 6, 8)), at(2025, 1, 6, 9));
        // Monday 09:00 (inclusive start of voting) -> Wednesday 00:00
        assert_eq!(next_transition(at(2025, 1, 6, 9)), at(2025, 1, 8, 0));
        // Tuesday -> Wednesday 00:00
        assert_eq!(next_transition(at(2025, 1, 7, 15)), at(2025, 1, 8, 0));
        // Wednesday -> Thursday 00:00
        assert_eq!(next_transition(at(2025, 1, 8, 1)), at(2025, 1, 9, 0));
        // Thursday -> Friday 00:00
        assert_eq!(next_transition(at(2025, 1, 9, 23)), at(2025, 1, 10, 0));
        // Sunday night -> next Monday 09:00
        assert_eq!(next_transition(at(2025, 1, 12, 23)), at(2025, 1, 13, 9));
    }

    #[test]
    fn phase_round_trips_through_str() {
        for phase in [Phase::Voting, Phase::Results, Phase::Blackout, Phase::Discussion] {
            assert_eq!(phase.as_str().parse::<Phase>().unwrap(), phase);
        }
        assert!("midweek".parse::<Phase>().is_err());
    }
}
