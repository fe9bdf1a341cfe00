use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;

/// The eight scalar kinds a rule can declare in its `type` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    /// 32-bit signed integer.
    Integer,
    /// 64-bit signed integer.
    Long,
    /// 64-bit float.
    Double,
    /// UTF-8 text.
    String,
    /// Calendar date; any time-of-day is discarded.
    Date,
    /// Date and time of day.
    DateTime,
    /// `true` / `false`.
    Boolean,
    /// 128-bit UUID.
    Guid,
}

impl Kind {
    pub const ALL: [Kind; 8] = [
        Kind::Integer,
        Kind::Long,
        Kind::Double,
        Kind::String,
        Kind::Date,
        Kind::DateTime,
        Kind::Boolean,
        Kind::Guid,
    ];

    /// The name used in the rule contract.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Kind::Integer => "integer",
            Kind::Long => "long",
            Kind::Double => "double",
            Kind::String => "string",
            Kind::Date => "date",
            Kind::DateTime => "datetime",
            Kind::Boolean => "boolean",
            Kind::Guid => "guid",
        }
    }

    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Kind::Integer | Kind::Long | Kind::Double)
    }

    /// Whether a rule declaring `self` may target a field stored as `field`.
    ///
    /// Numeric kinds compare across widths, and a `date` rule may target a
    /// `datetime` field (the field is truncated to its date).
    #[must_use]
    pub fn accepts_field(self, field: Kind) -> bool {
        self == field
            || (self.is_numeric() && field.is_numeric())
            || (self == Kind::Date && field == Kind::DateTime)
    }
}

impl FromStr for Kind {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Kind::ALL
            .into_iter()
            .find(|k| k.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigurationError::UnknownType {
                name: s.to_owned(),
            })
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_names() {
        for kind in Kind::ALL {
            assert_eq!(kind.name().parse::<Kind>().unwrap(), kind);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("DateTime".parse::<Kind>().unwrap(), Kind::DateTime);
        assert_eq!(" GUID ".parse::<Kind>().unwrap(), Kind::Guid);
    }

    #[test]
    fn parse_unknown() {
        let err = "decimal".parse::<Kind>().unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownType { name } if name == "decimal"));
    }

    #[test]
    fn field_compatibility() {
        assert!(Kind::Integer.accepts_field(Kind::Double));
        assert!(Kind::Long.accepts_field(Kind::Integer));
        assert!(Kind::Date.accepts_field(Kind::DateTime));
        assert!(!Kind::DateTime.accepts_field(Kind::Date));
        assert!(!Kind::String.accepts_field(Kind::Integer));
        assert!(!Kind::Boolean.accepts_field(Kind::Guid));
    }
}
