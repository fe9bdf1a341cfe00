//! Conversion of literal tokens (and boxed record values) into typed values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use uuid::Uuid;

use crate::types::{Datum, DateOrder, Kind, Locale, TypeCoercionError, Value};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const TIME_SUFFIXES: &[&str] = &["", " %H:%M:%S", " %H:%M"];

/// Coerces text into [`Value`]s using one call's locale and UTC setting.
#[derive(Debug, Clone)]
pub struct Coercer {
    locale: Locale,
    utc: bool,
}

impl Coercer {
    #[must_use]
    pub fn new(locale: Locale, utc: bool) -> Self {
        Self { locale, utc }
    }

    #[must_use]
    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Parse one token as `kind`, or `None` if it is not valid text for it.
    #[must_use]
    pub fn parse(&self, token: &str, kind: Kind) -> Option<Value> {
        match kind {
            Kind::Integer => self.parse_integer(token).map(Value::Int),
            Kind::Long => self.parse_integer(token).map(Value::Long),
            Kind::Double => self.parse_double(token).map(Value::Double),
            Kind::String => Some(Value::String(token.to_owned())),
            Kind::Date => self.parse_datetime(token).map(|dt| Value::Date(dt.date())),
            Kind::DateTime => self.parse_datetime(token).map(Value::DateTime),
            Kind::Boolean => parse_bool(token).map(Value::Bool),
            Kind::Guid => Uuid::parse_str(token.trim()).ok().map(Value::Guid),
        }
    }

    /// Parse a token, attaching rule context to a failure.
    ///
    /// # Errors
    ///
    /// Returns [`TypeCoercionError`] when the token is not valid for `kind`.
    pub fn coerce(
        &self,
        token: &str,
        kind: Kind,
        operator: &str,
        field: &str,
    ) -> Result<Value, TypeCoercionError> {
        self.parse(token, kind).ok_or_else(|| TypeCoercionError {
            operator: operator.to_owned(),
            field: field.to_owned(),
            kind,
            token: token.to_owned(),
        })
    }

    /// Coerce every token of a literal.
    ///
    /// # Errors
    ///
    /// Returns the first [`TypeCoercionError`] encountered.
    pub fn coerce_all(
        &self,
        tokens: &[String],
        kind: Kind,
        operator: &str,
        field: &str,
    ) -> Result<Vec<Value>, TypeCoercionError> {
        tokens
            .iter()
            .map(|t| self.coerce(t, kind, operator, field))
            .collect()
    }

    /// Bring a boxed record value to `kind`. Values already of a compatible
    /// kind pass through; text and other scalars are re-parsed.
    pub(crate) fn coerce_datum<'a>(&self, datum: Datum<'a>, kind: Kind) -> Result<Datum<'a>, String> {
        let compatible = match (&datum, kind) {
            (Datum::Null, _) => true,
            (Datum::Int(_) | Datum::Long(_) | Datum::Double(_), k) => k.is_numeric(),
            (Datum::Str(_), Kind::String)
            | (Datum::Date(_), Kind::Date)
            | (Datum::DateTime(_), Kind::Date | Kind::DateTime)
            | (Datum::Bool(_), Kind::Boolean)
            | (Datum::Guid(_), Kind::Guid) => true,
            (Datum::List(_), _) => return Ok(datum),
            _ => false,
        };
        if compatible {
            return Ok(datum);
        }
        let Some(text) = datum.scalar_text() else {
            return Err(format!("{datum:?}"));
        };
        match self.parse(&text, kind) {
            Some(value) => Ok(Datum::from_value(value)),
            None => Err(text.into_owned()),
        }
    }

    fn parse_integer<T: std::str::FromStr>(&self, token: &str) -> Option<T> {
        let text = self.locale.normalize_number(token)?;
        if text.is_empty() {
            return None;
        }
        text.parse().ok()
    }

    fn parse_double(&self, token: &str) -> Option<f64> {
        let text = self.locale.normalize_number(token)?;
        if text.is_empty() {
            return None;
        }
        text.parse().ok()
    }

    fn parse_datetime(&self, token: &str) -> Option<NaiveDateTime> {
        let text = token.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(if self.utc {
                dt.naive_utc()
            } else {
                dt.naive_local()
            });
        }
        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Some(dt);
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Some(date.and_time(NaiveTime::MIN));
        }
        self.parse_local_date(text)
    }

    fn parse_local_date(&self, text: &str) -> Option<NaiveDateTime> {
        for sep in ['/', '-', '.'] {
            let date = match self.locale.date_order() {
                DateOrder::DayMonthYear => format!("%d{sep}%m{sep}%Y"),
                DateOrder::MonthDayYear => format!("%m{sep}%d{sep}%Y"),
                DateOrder::YearMonthDay => format!("%Y{sep}%m{sep}%d"),
            };
            for suffix in TIME_SUFFIXES {
                let format = format!("{date}{suffix}");
                if suffix.is_empty() {
                    if let Ok(d) = NaiveDate::parse_from_str(text, &format) {
                        return Some(d.and_time(NaiveTime::MIN));
                    }
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(text, &format) {
                    return Some(dt);
                }
            }
        }
        None
    }
}

impl Default for Coercer {
    fn default() -> Self {
        Self::new(Locale::invariant(), false)
    }
}

fn parse_bool(token: &str) -> Option<bool> {
    let text = token.trim();
    if ["true", "1", "yes"].iter().any(|t| t.eq_ignore_ascii_case(text)) {
        Some(true)
    } else if ["false", "0", "no"].iter().any(|t| t.eq_ignore_ascii_case(text)) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn es() -> Coercer {
        Coercer::new(Locale::parse("es-ES").unwrap(), false)
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn integers() {
        let c = Coercer::default();
        assert_eq!(c.parse(" 42 ", Kind::Integer), Some(Value::Int(42)));
        assert_eq!(c.parse("-7", Kind::Long), Some(Value::Long(-7)));
        assert_eq!(c.parse("1,000", Kind::Integer), Some(Value::Int(1000)));
        assert_eq!(c.parse("1.5", Kind::Integer), None);
        assert_eq!(c.parse("abc", Kind::Integer), None);
        assert_eq!(c.parse("", Kind::Long), None);
        assert_eq!(c.parse("3000000000", Kind::Integer), None);
        assert_eq!(c.parse("3000000000", Kind::Long), Some(Value::Long(3_000_000_000)));
    }

    #[test]
    fn misplaced_group_separators() {
        assert_eq!(es().parse("1.5", Kind::Integer), None);
        assert_eq!(es().parse("1.2.3", Kind::Long), None);
        assert_eq!(es().parse("1.234", Kind::Integer), Some(Value::Int(1234)));
        assert_eq!(es().parse("1.2,5", Kind::Double), None);
        assert_eq!(Coercer::default().parse("12,34", Kind::Double), None);
    }

    #[test]
    fn doubles_follow_locale() {
        assert_eq!(es().parse("1,12", Kind::Double), Some(Value::Double(1.12)));
        assert_eq!(es().parse("1.000,5", Kind::Double), Some(Value::Double(1000.5)));
        assert_eq!(
            Coercer::default().parse("1.12", Kind::Double),
            Some(Value::Double(1.12))
        );
        assert_eq!(Coercer::default().parse("x1", Kind::Double), None);
    }

    #[test]
    fn booleans() {
        let c = Coercer::default();
        assert_eq!(c.parse("TRUE", Kind::Boolean), Some(Value::Bool(true)));
        assert_eq!(c.parse("no", Kind::Boolean), Some(Value::Bool(false)));
        assert_eq!(c.parse("maybe", Kind::Boolean), None);
    }

    #[test]
    fn guids() {
        let c = Coercer::default();
        let id = "67e55044-10b1-426f-9247-bb680e5fe0c8";
        assert_eq!(
            c.parse(id, Kind::Guid),
            Some(Value::Guid(Uuid::parse_str(id).unwrap()))
        );
        assert_eq!(c.parse("67e55044-10b1", Kind::Guid), None);
    }

    #[test]
    fn iso_dates() {
        let c = Coercer::default();
        assert_eq!(c.parse("2024-03-01", Kind::Date), Some(Value::Date(ymd(2024, 3, 1))));
        assert_eq!(
            c.parse("2024-03-01T10:30:00", Kind::Date),
            Some(Value::Date(ymd(2024, 3, 1)))
        );
        assert_eq!(
            c.parse("2024-03-01 10:30", Kind::DateTime),
            Some(Value::DateTime(ymd(2024, 3, 1).and_hms_opt(10, 30, 0).unwrap()))
        );
        assert_eq!(c.parse("not a date", Kind::Date), None);
    }

    #[test]
    fn locale_ordered_dates() {
        assert_eq!(es().parse("13/02/2024", Kind::Date), Some(Value::Date(ymd(2024, 2, 13))));
        assert_eq!(
            Coercer::default().parse("02/13/2024", Kind::Date),
            Some(Value::Date(ymd(2024, 2, 13)))
        );
        assert_eq!(Coercer::default().parse("13/02/2024", Kind::Date), None);
        assert_eq!(
            es().parse("13.02.2024 08:15", Kind::DateTime),
            Some(Value::DateTime(ymd(2024, 2, 13).and_hms_opt(8, 15, 0).unwrap()))
        );
    }

    #[test]
    fn utc_flag_controls_offsets() {
        let local = Coercer::new(Locale::invariant(), false);
        let utc = Coercer::new(Locale::invariant(), true);
        let text = "2024-01-01T23:00:00-02:00";
        assert_eq!(
            local.parse(text, Kind::DateTime),
            Some(Value::DateTime(ymd(2024, 1, 1).and_hms_opt(23, 0, 0).unwrap()))
        );
        assert_eq!(
            utc.parse(text, Kind::DateTime),
            Some(Value::DateTime(ymd(2024, 1, 2).and_hms_opt(1, 0, 0).unwrap()))
        );
        assert_eq!(utc.parse(text, Kind::Date), Some(Value::Date(ymd(2024, 1, 2))));
    }

    #[test]
    fn coerce_reports_context() {
        let err = Coercer::default()
            .coerce("abc", Kind::Double, "less", "price")
            .unwrap_err();
        assert_eq!(err.operator, "less");
        assert_eq!(err.field, "price");
        assert_eq!(err.kind, Kind::Double);
        assert_eq!(err.token, "abc");
    }

    #[test]
    fn coerce_all_stops_at_first_failure() {
        let tokens = vec!["1".to_owned(), "x".to_owned(), "y".to_owned()];
        let err = Coercer::default()
            .coerce_all(&tokens, Kind::Integer, "in", "id")
            .unwrap_err();
        assert_eq!(err.token, "x");
    }

    #[test]
    fn coerce_boxed_values() {
        let c = Coercer::default();
        assert!(matches!(c.coerce_datum(Datum::from("12"), Kind::Integer), Ok(Datum::Int(12))));
        assert!(matches!(c.coerce_datum(Datum::Long(3), Kind::Double), Ok(Datum::Long(3))));
        assert!(matches!(c.coerce_datum(Datum::Null, Kind::Guid), Ok(Datum::Null)));
        assert!(matches!(
            c.coerce_datum(Datum::Int(5), Kind::String),
            Ok(Datum::Str(s)) if s == "5"
        ));
        assert_eq!(
            c.coerce_datum(Datum::from("twelve"), Kind::Integer).unwrap_err(),
            "twelve"
        );
    }
}
