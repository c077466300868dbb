// ABOUTME: Strongly typed 64-bit identifiers for athletes, exercises, sessions, and recommendations
// ABOUTME: Integers internally, rendered as decimal strings at the JSON serialization boundary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Tatami Insights Contributors

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw storage key
            #[must_use]
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Raw storage key
            #[must_use]
            pub const fn as_i64(self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse::<i64>().map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any(IdVisitor($label)).map(Self)
            }
        }
    };
}

/// Accepts either a decimal string or a JSON integer
struct IdVisitor(&'static str);

impl Visitor<'_> for IdVisitor {
    type Value = i64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a {} as a decimal string or integer", self.0)
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<i64, E> {
        Ok(value)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<i64, E> {
        i64::try_from(value).map_err(|_| E::custom(format!("{} out of range", self.0)))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<i64, E> {
        value
            .trim()
            .parse()
            .map_err(|_| E::custom(format!("invalid {}: {value}", self.0)))
    }
}

define_id!(
    /// Athlete primary key
    AthleteId,
    "athlete id"
);
define_id!(
    /// Platform user key (athlete login, trainer, or reviewer)
    UserId,
    "user id"
);
define_id!(
    /// Catalog exercise primary key
    ExerciseId,
    "exercise id"
);
define_id!(
    /// Training session primary key
    SessionId,
    "session id"
);
define_id!(
    /// Training cycle primary key
    CycleId,
    "cycle id"
);
define_id!(
    /// Recommendation primary key
    RecommendationId,
    "recommendation id"
);

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_ids_serialize_as_strings() {
        let id = RecommendationId::new(9_007_199_254_740_993);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"9007199254740993\"");
    }

    #[test]
    fn test_ids_accept_string_or_integer() {
        let from_string: AthleteId = serde_json::from_str("\"42\"").unwrap();
        let from_number: AthleteId = serde_json::from_str("42").unwrap();
        assert_eq!(from_string, from_number);
        assert!(serde_json::from_str::<AthleteId>("\"forty-two\"").is_err());
    }
}
