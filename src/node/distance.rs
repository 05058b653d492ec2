//! Distances and the per-router distance triple.

use std::ops::Add;

use super::id::NodeId;

// ── Distance ──────────────────────────────────────────────────────────

/// A path metric: a non-negative finite value or +∞ ("unreachable").
///
/// NaN never enters the simulator: link costs are validated on the way in
/// and sums of non-negative values cannot produce it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Distance(f64);

impl Distance {
    pub const ZERO: Distance = Distance(0.0);
    pub const INFINITY: Distance = Distance(f64::INFINITY);

    /// Wrap a raw metric. Returns `None` for NaN or negative values.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_nan() || value < 0.0 {
            None
        } else {
            Some(Distance(value))
        }
    }

    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }

    #[inline]
    pub fn is_infinite(self) -> bool {
        !self.0.is_finite()
    }

    /// The smaller of two distances; `self` wins ties.
    #[inline]
    pub fn min(self, other: Distance) -> Distance {
        if other < self {
            other
        } else {
            self
        }
    }
}

impl Default for Distance {
    fn default() -> Self {
        Distance::INFINITY
    }
}

impl Add for Distance {
    type Output = Distance;

    fn add(self, rhs: Distance) -> Distance {
        Distance(self.0 + rhs.0)
    }
}

impl std::fmt::Display for Distance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_infinite() {
            f.pad("inf")
        } else {
            f.pad(&self.0.to_string())
        }
    }
}

#[cfg(feature = "serialize")]
impl serde::Serialize for Distance {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_infinite() {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

#[cfg(feature = "serialize")]
impl<'de> serde::Deserialize<'de> for Distance {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DistanceVisitor;

        impl serde::de::Visitor<'_> for DistanceVisitor {
            type Value = Distance;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a non-negative number or \"inf\"")
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Distance, E> {
                Distance::new(v).ok_or_else(|| E::custom(format!("invalid distance {}", v)))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Distance, E> {
                Ok(Distance(v as f64))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Distance, E> {
                self.visit_f64(v as f64)
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Distance, E> {
                match v {
                    "inf" | "infinity" | "Infinity" => Ok(Distance::INFINITY),
                    other => Err(E::custom(format!("invalid distance {:?}", other))),
                }
            }
        }

        deserializer.deserialize_any(DistanceVisitor)
    }
}

// ── DistanceState ─────────────────────────────────────────────────────

/// A router's view of its route to the destination.
///
/// `feasible_distance` is the lowest distance held since the last
/// diffusing computation started; a neighbor whose reported distance is
/// strictly below it cannot be part of a loop through this router.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceState {
    pub distance: Distance,
    pub feasible_distance: Distance,
    pub successor: Option<NodeId>,
}

impl DistanceState {
    /// No route: `(inf, inf, --)`.
    pub const UNREACHABLE: DistanceState = DistanceState {
        distance: Distance::INFINITY,
        feasible_distance: Distance::INFINITY,
        successor: None,
    };

    pub fn new(distance: Distance, feasible_distance: Distance, successor: Option<NodeId>) -> Self {
        DistanceState {
            distance,
            feasible_distance,
            successor,
        }
    }

    /// The destination's own state: distance zero, its own successor.
    pub fn origin(node: NodeId) -> Self {
        DistanceState::new(Distance::ZERO, Distance::ZERO, Some(node))
    }
}

impl Default for DistanceState {
    fn default() -> Self {
        DistanceState::UNREACHABLE
    }
}

impl std::fmt::Display for DistanceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.successor {
            Some(next) => write!(f, "{}, {}, {}", self.distance, self.feasible_distance, next),
            None => write!(f, "{}, {}, --", self.distance, self.feasible_distance),
        }
    }
}
