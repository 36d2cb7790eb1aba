// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signal state for two road groups and their pedestrian crossings
//!
//! Road group A is the road pair 1/2, group B is the pair 3/4. At any
//! settled instant exactly one group is GREEN and the other RED; a
//! pedestrian crossing shows GREEN exactly when its paired road is RED.
//!
//! The transition helpers here are pure: they compute the field writes a
//! controller must commit, and never touch shared state themselves.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A road or group label that does not name a known road group
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized road or group: {0:?} (expected A, B or a road 1-4)")]
pub struct InvalidTarget(pub String);

/// One of the two mutually exclusive directions of vehicle traffic
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadGroup {
    /// Roads 1 and 2
    A,
    /// Roads 3 and 4
    B,
}

impl RoadGroup {
    pub const ALL: [RoadGroup; 2] = [RoadGroup::A, RoadGroup::B];

    /// The group that must be RED while this one is GREEN
    pub fn other(self) -> RoadGroup {
        match self {
            RoadGroup::A => RoadGroup::B,
            RoadGroup::B => RoadGroup::A,
        }
    }

    /// Map a road identifier (1-4) to its group
    pub fn from_road(road: u8) -> Result<RoadGroup, InvalidTarget> {
        match road {
            1 | 2 => Ok(RoadGroup::A),
            3 | 4 => Ok(RoadGroup::B),
            other => Err(InvalidTarget(other.to_string())),
        }
    }
}

impl fmt::Display for RoadGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoadGroup::A => write!(f, "A"),
            RoadGroup::B => write!(f, "B"),
        }
    }
}

impl FromStr for RoadGroup {
    type Err = InvalidTarget;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" | "1" | "2" | "12" => Ok(RoadGroup::A),
            "B" | "3" | "4" | "34" => Ok(RoadGroup::B),
            _ => Err(InvalidTarget(s.to_string())),
        }
    }
}

/// Vehicle signal color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalColor {
    Red,
    Yellow,
    Green,
}

impl fmt::Display for SignalColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalColor::Red => write!(f, "RED"),
            SignalColor::Yellow => write!(f, "YELLOW"),
            SignalColor::Green => write!(f, "GREEN"),
        }
    }
}

/// Pedestrian crossing color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PedestrianColor {
    Red,
    Green,
}

impl fmt::Display for PedestrianColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PedestrianColor::Red => write!(f, "RED"),
            PedestrianColor::Green => write!(f, "GREEN"),
        }
    }
}

/// A single field write, the unit of replica propagation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", rename_all = "snake_case")]
pub enum FieldUpdate {
    Road {
        group: RoadGroup,
        color: SignalColor,
    },
    Pedestrian {
        group: RoadGroup,
        color: PedestrianColor,
    },
}

impl FieldUpdate {
    /// Whether this write touches a vehicle signal (as opposed to a crossing)
    pub fn is_road(&self) -> bool {
        matches!(self, FieldUpdate::Road { .. })
    }
}

impl fmt::Display for FieldUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldUpdate::Road { group, color } => write!(f, "road {} = {}", group, color),
            FieldUpdate::Pedestrian { group, color } => {
                write!(f, "pedestrian {} = {}", group, color)
            }
        }
    }
}

/// Signal and pedestrian colors for both road groups
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalState {
    pub road_a: SignalColor,
    pub road_b: SignalColor,
    pub pedestrian_a: PedestrianColor,
    pub pedestrian_b: PedestrianColor,
}

impl Default for SignalState {
    /// Group B GREEN, group A RED, crossings complementary
    fn default() -> Self {
        Self {
            road_a: SignalColor::Red,
            road_b: SignalColor::Green,
            pedestrian_a: PedestrianColor::Green,
            pedestrian_b: PedestrianColor::Red,
        }
    }
}

impl SignalState {
    pub fn road(&self, group: RoadGroup) -> SignalColor {
        match group {
            RoadGroup::A => self.road_a,
            RoadGroup::B => self.road_b,
        }
    }

    pub fn pedestrian(&self, group: RoadGroup) -> PedestrianColor {
        match group {
            RoadGroup::A => self.pedestrian_a,
            RoadGroup::B => self.pedestrian_b,
        }
    }

    /// The GREEN group, if exactly one group is GREEN
    pub fn green_group(&self) -> Option<RoadGroup> {
        match (self.road_a, self.road_b) {
            (SignalColor::Green, SignalColor::Green) => None,
            (SignalColor::Green, _) => Some(RoadGroup::A),
            (_, SignalColor::Green) => Some(RoadGroup::B),
            _ => None,
        }
    }

    /// One group GREEN, the other RED, nothing in amber
    pub fn is_settled(&self) -> bool {
        self.green_group()
            .is_some_and(|g| self.road(g.other()) == SignalColor::Red)
    }

    /// Each crossing is GREEN iff its road is RED, and RED iff its road is GREEN
    pub fn pedestrians_consistent(&self) -> bool {
        RoadGroup::ALL
            .iter()
            .all(|&g| match (self.road(g), self.pedestrian(g)) {
                (SignalColor::Red, PedestrianColor::Green) => true,
                (SignalColor::Green, PedestrianColor::Red) => true,
                _ => false,
            })
    }

    pub fn apply(&mut self, update: &FieldUpdate) {
        match *update {
            FieldUpdate::Road { group, color } => match group {
                RoadGroup::A => self.road_a = color,
                RoadGroup::B => self.road_b = color,
            },
            FieldUpdate::Pedestrian { group, color } => match group {
                RoadGroup::A => self.pedestrian_a = color,
                RoadGroup::B => self.pedestrian_b = color,
            },
        }
    }

    /// The amber write that precedes a switch to `target`, or `None` when
    /// `target` is already GREEN and no amber phase is needed
    pub fn amber_update(&self, target: RoadGroup) -> Option<FieldUpdate> {
        (self.road(target) != SignalColor::Green).then_some(FieldUpdate::Road {
            group: target,
            color: SignalColor::Yellow,
        })
    }

    /// Target GREEN, the other group RED
    pub fn green_updates(target: RoadGroup) -> [FieldUpdate; 2] {
        [
            FieldUpdate::Road {
                group: target,
                color: SignalColor::Green,
            },
            FieldUpdate::Road {
                group: target.other(),
                color: SignalColor::Red,
            },
        ]
    }

    /// Crossings complementary to `green`: its crossing RED, the other GREEN
    pub fn pedestrian_updates(green: RoadGroup) -> [FieldUpdate; 2] {
        [
            FieldUpdate::Pedestrian {
                group: green,
                color: PedestrianColor::Red,
            },
            FieldUpdate::Pedestrian {
                group: green.other(),
                color: PedestrianColor::Green,
            },
        ]
    }
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
