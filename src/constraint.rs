use crate::error::SchemaError;
use crate::value::Validated;
use chrono::DateTime;
use regex::Regex;
use serde_json::Value;
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::OnceLock;

/// Domain-specific string formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Email,
    /// EUI-48 in colon, dash, dotted (`001a.2b3c.4d5e`) or bare hex notation.
    MacAddress,
    /// An IPv4 address with a prefix length, e.g. `192.168.1.1/24`.
    Ipv4Interface,
    /// RFC 3339 date-time.
    Timestamp,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::MacAddress => "mac_address",
            Self::Ipv4Interface => "ipv4_interface",
            Self::Timestamp => "timestamp",
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Email => "email address",
            Self::MacAddress => "MAC address",
            Self::Ipv4Interface => "IPv4 interface",
            Self::Timestamp => "RFC 3339 timestamp",
        }
    }

    pub fn matches(&self, s: &str) -> bool {
        match self {
            Self::Email => email_regex().is_match(s),
            Self::MacAddress => mac_regex().is_match(s),
            Self::Ipv4Interface => is_ipv4_interface(s),
            Self::Timestamp => DateTime::parse_from_rfc3339(s).is_ok(),
        }
    }
}

impl FromStr for Format {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Self::Email),
            "mac_address" => Ok(Self::MacAddress),
            "ipv4_interface" => Ok(Self::Ipv4Interface),
            "timestamp" => Ok(Self::Timestamp),
            _ => Err(()),
        }
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$",
        )
        .expect("email pattern compiles")
    })
}

fn mac_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r"^(?:",
            r"(?:[0-9A-Fa-f]{1,2}:){5}[0-9A-Fa-f]{1,2}",
            r"|(?:[0-9A-Fa-f]{1,2}-){5}[0-9A-Fa-f]{1,2}",
            r"|(?:[0-9A-Fa-f]{4}\.){2}[0-9A-Fa-f]{4}",
            r"|[0-9A-Fa-f]{12}",
            r")$"
        ))
        .expect("MAC address pattern compiles")
    })
}

fn is_ipv4_interface(s: &str) -> bool {
    let (addr, prefix) = match s.split_once('/') {
        Some(parts) => parts,
        None => return false,
    };

    if prefix.is_empty() || prefix.len() > 2 || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    addr.parse::<Ipv4Addr>().is_ok() && prefix.parse::<u8>().map_or(false, |p| p <= 32)
}

/// A predicate over a coerced value.
///
/// Constraints are evaluated in declaration order and stop at the first
/// failure for a given field.
#[derive(Clone, Debug)]
pub enum Constraint {
    /// Minimum number of characters, items or entries.
    MinLength(usize),
    /// Maximum number of characters, items or entries.
    MaxLength(usize),
    /// The string must contain a match of the pattern. Anchor it to match
    /// the whole string.
    Pattern(Regex),
    /// The number must be strictly greater than zero.
    Positive,
    /// The number must lie within `min..=max`.
    Range { min: f64, max: f64 },
    /// The value must equal one of the listed values.
    OneOf(Vec<Validated>),
    Format(Format),
}

impl Constraint {
    pub fn pattern(pattern: &str) -> Result<Self, SchemaError> {
        Regex::new(pattern)
            .map(Self::Pattern)
            .map_err(|source| SchemaError::InvalidPattern {
                pattern: pattern.to_owned(),
                source,
            })
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self::Range { min, max }
    }

    pub fn one_of(values: impl IntoIterator<Item = Value>) -> Self {
        Self::OneOf(values.into_iter().map(Validated::from).collect())
    }

    pub fn check(&self, value: &Validated) -> Result<(), String> {
        match self {
            Self::MinLength(min) => {
                let len = length_of(value, "min_length")?;
                if len < *min {
                    return Err(format!(
                        "value should have at least {min} {}, not {len}",
                        unit_of(value, *min)
                    ));
                }
            }
            Self::MaxLength(max) => {
                let len = length_of(value, "max_length")?;
                if len > *max {
                    return Err(format!(
                        "value should have at most {max} {}, not {len}",
                        unit_of(value, *max)
                    ));
                }
            }
            Self::Pattern(re) => {
                let s = string_of(value, "pattern")?;
                if !re.is_match(s) {
                    return Err(format!("string should match pattern '{}'", re.as_str()));
                }
            }
            Self::Positive => {
                let n = number_of(value, "positive")?;
                if n <= 0.0 {
                    return Err("input should be greater than 0".to_owned());
                }
            }
            Self::Range { min, max } => {
                let n = number_of(value, "range")?;
                if n < *min || n > *max {
                    return Err(if max.is_infinite() {
                        format!("input should be at least {min}")
                    } else if min.is_infinite() {
                        format!("input should be at most {max}")
                    } else {
                        format!("input should be between {min} and {max}")
                    });
                }
            }
            Self::OneOf(allowed) => {
                if !allowed.contains(value) {
                    let listed: Vec<String> = allowed.iter().map(describe).collect();
                    return Err(format!("input should be one of {}", listed.join(", ")));
                }
            }
            Self::Format(format) => {
                let s = string_of(value, format.as_str())?;
                if !format.matches(s) {
                    return Err(format!("value is not a valid {}: {s:?}", format.describe()));
                }
            }
        }

        Ok(())
    }
}

fn length_of(value: &Validated, name: &str) -> Result<usize, String> {
    match value {
        Validated::String(s) => Ok(s.chars().count()),
        Validated::List(items) => Ok(items.len()),
        Validated::Map(entries) => Ok(entries.len()),
        other => Err(format!("{name} does not apply to {} values", other.kind_name())),
    }
}

fn unit_of(value: &Validated, n: usize) -> &'static str {
    match (value, n) {
        (Validated::String(_), 1) => "character",
        (Validated::String(_), _) => "characters",
        (_, 1) => "item",
        _ => "items",
    }
}

fn string_of<'a>(value: &'a Validated, name: &str) -> Result<&'a str, String> {
    value
        .as_str()
        .ok_or_else(|| format!("{name} does not apply to {} values", value.kind_name()))
}

fn number_of(value: &Validated, name: &str) -> Result<f64, String> {
    value
        .as_f64()
        .ok_or_else(|| format!("{name} does not apply to {} values", value.kind_name()))
}

fn describe(value: &Validated) -> String {
    match value {
        Validated::String(s) => format!("{s:?}"),
        Validated::Int(n) => n.to_string(),
        Validated::UInt(n) => n.to_string(),
        Validated::Float(f) => f.to_string(),
        Validated::Bool(b) => b.to_string(),
        Validated::Null => "null".to_owned(),
        other => other.kind_name().to_owned(),
    }
}
