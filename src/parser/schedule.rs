use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, ScrapeError};
use crate::model::{Day, ScheduleSlot, Turn};

static SLOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(Lu|Ma|Mi|Ju|Vi|Sa|Do)\(([mtn])\)(\d{1,2}):(\d{1,2})$").unwrap());

/// Schedules the source uses for "not assigned yet".
pub const UNDEFINED_SCHEDULES: &[&str] = &["Sin definir", "Do(m)0:0", "Do(t)0:0", "Do(n)0:0"];

enum Decoded {
    Slot(ScheduleSlot),
    Sunday,
}

/// Decode a schedule string such as `"Lu(n)1:5 Mi(n)0:2"`.
///
/// Returns `Ok(None)` for the undefined sentinels and for anything that lands
/// on a Sunday: an anomalous schedule is reported as unknown, never halved.
pub fn decode(raw: &str) -> Result<Option<Vec<ScheduleSlot>>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ScrapeError::malformed("schedule", raw));
    }
    if is_undefined(raw) {
        return Ok(None);
    }

    // Every token must be well formed before a Sunday voids the string.
    let decoded = raw
        .split_whitespace()
        .map(decode_token)
        .collect::<Result<Vec<_>>>()?;
    let mut slots = Vec::with_capacity(decoded.len());
    for token in decoded {
        match token {
            Decoded::Slot(slot) => slots.push(slot),
            Decoded::Sunday => return Ok(None),
        }
    }
    Ok(Some(slots))
}

pub fn is_undefined(raw: &str) -> bool {
    UNDEFINED_SCHEDULES.contains(&raw.trim())
}

fn decode_token(token: &str) -> Result<Decoded> {
    let caps = SLOT_RE
        .captures(token)
        .ok_or_else(|| ScrapeError::malformed("schedule", token))?;

    let day = match &caps[1] {
        "Lu" => Day::Mon,
        "Ma" => Day::Tue,
        "Mi" => Day::Wed,
        "Ju" => Day::Thu,
        "Vi" => Day::Fri,
        "Sa" => Day::Sat,
        _ => return Ok(Decoded::Sunday),
    };
    let turn = match &caps[2] {
        "m" => Turn::Morning,
        "t" => Turn::Afternoon,
        _ => Turn::Night,
    };
    let bound = |s: &str| {
        s.parse::<u8>()
            .map_err(|_| ScrapeError::malformed("schedule slot", token))
    };

    Ok(Decoded::Slot(ScheduleSlot {
        day,
        turn,
        start_slot: bound(&caps[3])?,
        end_slot: bound(&caps[4])?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_night_slots() {
        let slots = decode("Lu(n)1:5 Mi(n)0:2").unwrap().unwrap();
        assert_eq!(
            slots,
            vec![
                ScheduleSlot { day: Day::Mon, turn: Turn::Night, start_slot: 1, end_slot: 5 },
                ScheduleSlot { day: Day::Wed, turn: Turn::Night, start_slot: 0, end_slot: 2 },
            ]
        );
    }

    #[test]
    fn keeps_token_order_and_count() {
        let slots = decode("Sa(m)0:4 Ju(t)2:3 Ma(m)1:1").unwrap().unwrap();
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].day, Day::Sat);
        assert_eq!(slots[1].turn, Turn::Afternoon);
        assert_eq!(slots[2].day, Day::Tue);
    }

    #[test]
    fn sentinels_are_undefined() {
        for s in UNDEFINED_SCHEDULES {
            assert_eq!(decode(s).unwrap(), None, "{s}");
        }
    }

    #[test]
    fn sunday_voids_whole_string() {
        assert_eq!(decode("Lu(n)1:5 Do(m)1:3").unwrap(), None);
    }

    #[test]
    fn sentinel_token_voids_whole_string() {
        assert_eq!(decode("Lu(n)1:5 Do(t)0:0").unwrap(), None);
    }

    #[test]
    fn bad_token_wins_over_sunday_in_any_order() {
        assert!(decode("Do(m)1:3 junk").unwrap_err().is_malformed());
        assert!(decode("junk Do(m)1:3").unwrap_err().is_malformed());
        assert!(decode("Do(t)0:0 Lu(n)").unwrap_err().is_malformed());
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(decode("Lunes 19hs").unwrap_err().is_malformed());
        assert!(decode("Lu(x)1:5").unwrap_err().is_malformed());
        assert!(decode("   ").unwrap_err().is_malformed());
    }
}
