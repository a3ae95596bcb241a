use std::fmt::{Debug, Display};

use bson::oid::ObjectId;
use chrono::Weekday;
use serde::{Deserialize, Serialize};

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// One fixed weekly training window: weekday plus a minute-of-day range.
/// The range is half-open, so back-to-back slots do not touch.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySlot {
    pub weekday: Weekday,
    pub start: u16,
    pub end: u16,
}

impl WeeklySlot {
    pub fn new(weekday: Weekday, start: u16, end: u16) -> WeeklySlot {
        WeeklySlot {
            weekday,
            start,
            end,
        }
    }

    /// A slot with an empty or inverted range carries no time at all and
    /// is ignored by the conflict scan.
    pub fn is_valid(&self) -> bool {
        self.start < self.end && self.end <= MINUTES_PER_DAY
    }

    pub fn overlaps(&self, other: &WeeklySlot) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        if self.weekday != other.weekday {
            return false;
        }
        self.start < other.end && other.start < self.end
    }
}

impl Debug for WeeklySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for WeeklySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {:02}:{:02}-{:02}:{:02}",
            self.weekday,
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

/// Scans the candidate slots against every other student's fixed schedule
/// and returns the first student whose schedule collides. `exclude` skips
/// the student being edited so they never conflict with themselves.
pub fn find_conflict<'a, I>(
    candidate: &[WeeklySlot],
    exclude: Option<ObjectId>,
    roster: I,
) -> Option<ObjectId>
where
    I: IntoIterator<Item = (ObjectId, &'a [WeeklySlot])>,
{
    for (student_id, slots) in roster {
        if Some(student_id) == exclude {
            continue;
        }
        for their in slots {
            for our in candidate {
                if our.overlaps(their) {
                    return Some(student_id);
                }
            }
        }
    }
    None
}
