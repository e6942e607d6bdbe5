//! Timeslot enum - the fixed set of windows a session can be held in.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ValidationError;

/// A pairing window.
///
/// Declaration order is significant: it is the tie-breaker when two
/// timeslot groups have the same size during matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeslot {
    Breakfast,
    Lunch,
    Tea,
}

impl Timeslot {
    /// Every timeslot in declaration order.
    pub const ALL: [Timeslot; 3] = [Timeslot::Breakfast, Timeslot::Lunch, Timeslot::Tea];

    /// Returns the wire name of this timeslot.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeslot::Breakfast => "breakfast",
            Timeslot::Lunch => "lunch",
            Timeslot::Tea => "tea",
        }
    }

    /// Parses wire names leniently: known timeslots come back in input
    /// order, names that match no timeslot are returned separately.
    pub fn parse_known<'a>(
        names: impl IntoIterator<Item = &'a str>,
    ) -> (Vec<Timeslot>, Vec<&'a str>) {
        let mut known = Vec::new();
        let mut unknown = Vec::new();
        for name in names {
            match name.parse::<Timeslot>() {
                Ok(slot) => known.push(slot),
                Err(_) => unknown.push(name),
            }
        }
        (known, unknown)
    }
}

impl fmt::Display for Timeslot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Timeslot {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(Timeslot::Breakfast),
            "lunch" => Ok(Timeslot::Lunch),
            "tea" => Ok(Timeslot::Tea),
            other => Err(ValidationError::invalid_format(
                "timeslot",
                format!("unknown timeslot '{}'", other),
            )),
        }
    }
}
