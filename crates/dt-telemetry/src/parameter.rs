//! Parameter table: which distribution each telemetry key is drawn from.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde_json::Value;

use crate::error::TelemetryError;

/// A generation rule for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParameterRule {
    /// Uniform integer in `[min, max]`.
    IntRange { min: i64, max: i64 },
    /// Uniform real in `[min, max)`.
    RealRange { min: f64, max: f64 },
    /// Uniform choice from a fixed label set.
    Choice(&'static [&'static str]),
    /// Uniform boolean.
    Flag,
}

impl ParameterRule {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Value {
        match *self {
            ParameterRule::IntRange { min, max } => Value::from(rng.gen_range(min..=max)),
            ParameterRule::RealRange { min, max } => Value::from(rng.gen_range(min..max)),
            ParameterRule::Choice(labels) => Value::from(labels[rng.gen_range(0..labels.len())]),
            ParameterRule::Flag => Value::from(rng.gen_bool(0.5)),
        }
    }

    /// Whether `value` is a possible output of this rule.
    pub fn admits(&self, value: &Value) -> bool {
        match *self {
            ParameterRule::IntRange { min, max } => value
                .as_i64()
                .is_some_and(|v| (min..=max).contains(&v)),
            ParameterRule::RealRange { min, max } => value
                .as_f64()
                .is_some_and(|v| (min..max).contains(&v)),
            ParameterRule::Choice(labels) => value
                .as_str()
                .is_some_and(|v| labels.contains(&v)),
            ParameterRule::Flag => value.is_boolean(),
        }
    }
}

const MODES: &[&str] = &["Cool", "Normal", "Heat"];
const CHANNELS: &[&str] = &["BBC", "CNN", "FOX", "ABC"];
const COLORS: &[&str] = &["White", "Red", "Green", "Blue"];
const STATUSES: &[&str] = &["Running", "Stopped", "Paused"];

/// Every telemetry parameter the simulator knows how to generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parameter {
    Temperature,
    Mode,
    FanSpeed,
    OnOff,
    Occupancy,
    PowerConsumed,
    Volume,
    Channel,
    Brightness,
    Lighting,
    Humidity,
    Speed,
    Color,
    Status,
}

impl Parameter {
    pub const ALL: [Parameter; 14] = [
        Parameter::Temperature,
        Parameter::Mode,
        Parameter::FanSpeed,
        Parameter::OnOff,
        Parameter::Occupancy,
        Parameter::PowerConsumed,
        Parameter::Volume,
        Parameter::Channel,
        Parameter::Brightness,
        Parameter::Lighting,
        Parameter::Humidity,
        Parameter::Speed,
        Parameter::Color,
        Parameter::Status,
    ];

    /// Key as it appears in `Init Data`.
    pub fn key(self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::Mode => "mode",
            Parameter::FanSpeed => "fanSpeed",
            Parameter::OnOff => "onOff",
            Parameter::Occupancy => "occupancy",
            Parameter::PowerConsumed => "powerConsumed",
            Parameter::Volume => "volume",
            Parameter::Channel => "channel",
            Parameter::Brightness => "brightness",
            Parameter::Lighting => "lighting",
            Parameter::Humidity => "humidity",
            Parameter::Speed => "speed",
            Parameter::Color => "color",
            Parameter::Status => "status",
        }
    }

    pub fn rule(self) -> ParameterRule {
        match self {
            Parameter::Temperature => ParameterRule::IntRange { min: 18, max: 23 },
            Parameter::Mode => ParameterRule::Choice(MODES),
            Parameter::FanSpeed => ParameterRule::IntRange { min: 0, max: 3 },
            Parameter::OnOff | Parameter::Occupancy => ParameterRule::Flag,
            Parameter::PowerConsumed => ParameterRule::RealRange { min: 0.0, max: 1.0 },
            Parameter::Volume => ParameterRule::IntRange { min: 0, max: 1 },
            Parameter::Channel => ParameterRule::Choice(CHANNELS),
            Parameter::Brightness | Parameter::Lighting | Parameter::Humidity => {
                ParameterRule::IntRange { min: 0, max: 100 }
            }
            Parameter::Speed => ParameterRule::IntRange { min: 0, max: 5 },
            Parameter::Color => ParameterRule::Choice(COLORS),
            Parameter::Status => ParameterRule::Choice(STATUSES),
        }
    }
}

impl FromStr for Parameter {
    type Err = TelemetryError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        Parameter::ALL
            .into_iter()
            .find(|p| p.key() == key)
            .ok_or_else(|| TelemetryError::UnknownParameter {
                key: key.to_string(),
            })
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keys_round_trip() {
        for p in Parameter::ALL {
            assert_eq!(p.key().parse::<Parameter>().unwrap(), p);
        }
    }

    #[test]
    fn unknown_key_is_an_error() {
        let err = "pressure".parse::<Parameter>().unwrap_err();
        assert!(matches!(err, TelemetryError::UnknownParameter { ref key } if key == "pressure"));
        // Keys are case sensitive.
        assert!("Temperature".parse::<Parameter>().is_err());
    }

    #[test]
    fn admits_checks_type_and_bounds() {
        let temp = Parameter::Temperature.rule();
        assert!(temp.admits(&json!(18)));
        assert!(temp.admits(&json!(23)));
        assert!(!temp.admits(&json!(24)));
        assert!(!temp.admits(&json!(20.5)));

        let power = Parameter::PowerConsumed.rule();
        assert!(power.admits(&json!(0.0)));
        assert!(!power.admits(&json!(1.0)));

        let color = Parameter::Color.rule();
        assert!(color.admits(&json!("Red")));
        assert!(!color.admits(&json!("Purple")));

        assert!(Parameter::OnOff.rule().admits(&json!(false)));
        assert!(!Parameter::OnOff.rule().admits(&json!(0)));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    proptest! {
        #[test]
        fn every_rule_stays_in_bounds(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            for p in Parameter::ALL {
                let rule = p.rule();
                let value = rule.sample(&mut rng);
                prop_assert!(rule.admits(&value), "{} produced {}", p, value);
            }
        }

        #[test]
        fn int_rules_reach_both_ends(seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let rule = Parameter::Volume.rule();
            let seen: std::collections::BTreeSet<i64> = (0..200)
                .filter_map(|_| rule.sample(&mut rng).as_i64())
                .collect();
            prop_assert_eq!(seen.into_iter().collect::<Vec<_>>(), vec![0, 1]);
        }
    }
}
