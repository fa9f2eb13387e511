use chrono::{DateTime, Timelike, Utc};
use chrono_tz::US::Eastern;

/// Trading-session windows as (start, end) minute offsets from midnight ET.
const SESSIONS: &[(&str, (u32, u32), (u32, u32))] = &[
    ("asian", (20, 0), (2, 0)),
    ("london", (2, 0), (8, 0)),
    ("new_york", (8, 0), (16, 0)),
];

/// Maps the wall clock to the trading session currently in progress, so the
/// live session can lead the built-in suggestions for the session field.
pub struct SessionClock;

impl SessionClock {
    pub fn active() -> Option<&'static str> {
        Self::active_at(Utc::now())
    }

    pub fn active_at(utc_now: DateTime<Utc>) -> Option<&'static str> {
        let et_now = utc_now.with_timezone(&Eastern);
        let current = et_now.hour() * 60 + et_now.minute();

        for &(name, start, end) in SESSIONS {
            let start_min = start.0 * 60 + start.1;
            let end_min = end.0 * 60 + end.1;

            let in_session = if start_min < end_min {
                current >= start_min && current < end_min
            } else {
                // Wraps midnight (Asian session 20:00 - 02:00)
                current >= start_min || current < end_min
            };

            if in_session {
                return Some(name);
            }
        }
        None
    }

    /// All known session names with the active one (if any) first.
    pub fn ordered_at(utc_now: DateTime<Utc>) -> Vec<String> {
        let active = Self::active_at(utc_now);
        let mut names: Vec<String> = Vec::with_capacity(SESSIONS.len());
        if let Some(a) = active {
            names.push(a.to_string());
        }
        for &(name, _, _) in SESSIONS {
            if Some(name) != active {
                names.push(name.to_string());
            }
        }
        names
    }
}
