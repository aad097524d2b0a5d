pub mod prelude {
    pub use super::interval::prelude::*;
    pub use super::index_set::prelude::*;
    pub use super::Time;
}

pub mod interval;
pub mod index_set;

/// Discrete model time, measured in ticks.
#[derive(Clone, Copy)]
#[derive(Debug, Default)]
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time {
    pub ticks: i64,
}

impl Time {
    /// Minimal distance separating two observable instants.
    pub const EPSILON: Time = Time { ticks: 1 };

    /// A deadline overrun of at most this magnitude is ignored as noise.
    pub const DEADLINE_MISS_TOLERANCE: Time = Time { ticks: 0 };

    pub const INFINITY: Time = Time { ticks: i64::MAX };

    pub fn zero() -> Self {
        Self { ticks: 0 }
    }

    pub fn ticks(ticks: i64) -> Self {
        Self { ticks }
    }

    pub fn as_ticks(&self) -> i64 {
        self.ticks
    }
}

impl std::ops::Add for Time {
    type Output = Time;

    fn add(self, rhs: Self) -> Self::Output {
        Self::Output { ticks: self.ticks + rhs.ticks }
    }
}

impl std::ops::Sub for Time {
    type Output = Time;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output { ticks: self.ticks - rhs.ticks }
    }
}

impl std::ops::Mul<i64> for Time {
    type Output = Time;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::Output { ticks: self.ticks * rhs }
    }
}

impl std::ops::Mul<Time> for i64 {
    type Output = Time;

    fn mul(self, rhs: Time) -> Self::Output {
        rhs * self
    }
}

impl std::ops::Div for Time {
    type Output = i64;

    fn div(self, rhs: Self) -> Self::Output {
        self.ticks / rhs.ticks
    }
}

impl std::ops::Div<i64> for Time {
    type Output = Time;

    fn div(self, rhs: i64) -> Self::Output {
        Time { ticks: self.ticks / rhs }
    }
}

impl std::iter::Sum for Time {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Time::zero(), |acc, val| acc + val)
    }
}

impl std::fmt::Display for Time {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.ticks)
    }
}

impl serde::Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer {
        self.ticks.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de> {
        Ok(Time { ticks: i64::deserialize(deserializer)? })
    }
}

#[test]
fn time_arithmetic() {
    assert_eq!(Time::ticks(3) + Time::ticks(4), Time::ticks(7));
    assert_eq!(Time::ticks(10) - Time::ticks(4), Time::ticks(6));
    assert_eq!(Time::ticks(3) * 4, Time::ticks(12));
    assert_eq!(4 * Time::ticks(3), Time::ticks(12));
    assert_eq!(Time::ticks(20) / Time::ticks(10), 2);
    assert_eq!(Time::ticks(20) / 4, Time::ticks(5));
    assert_eq!([Time::ticks(1), Time::ticks(2)].into_iter().sum::<Time>(), Time::ticks(3));
}

#[test]
fn time_serde_roundtrip() {
    let time: Time = serde_json::from_str("42").unwrap();
    assert_eq!(time, Time::ticks(42));
    assert_eq!(serde_json::to_string(&time).unwrap(), "42");
}
