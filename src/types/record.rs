use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use super::expr::CompareOp;
use super::schema::Schema;
use super::value::{cmp_numeric, Number, Value};

/// A filterable record type.
///
/// `schema()` describes the static shape used to resolve field paths when a
/// filter is built; `field()` and `index()` read values from an instance when
/// the filter runs.
///
/// ```
/// use rulefilter::{Datum, FieldType, Kind, Record, Schema};
///
/// struct Person {
///     id: i32,
///     name: String,
/// }
///
/// impl Record for Person {
///     fn schema() -> Schema {
///         Schema::new("Person")
///             .field("id", FieldType::scalar(Kind::Integer))
///             .field("name", FieldType::scalar(Kind::String))
///     }
///
///     fn field(&self, name: &str) -> Option<Datum<'_>> {
///         match name {
///             "id" => Some(Datum::Int(self.id)),
///             "name" => Some(Datum::from(self.name.as_str())),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Record {
    fn schema() -> Schema
    where
        Self: Sized;

    /// Read a member by name.
    fn field(&self, name: &str) -> Option<Datum<'_>>;

    /// Read through the record's indexer, if the schema declares one.
    fn index(&self, _key: &str) -> Option<Datum<'_>> {
        None
    }
}

/// A key-value mapping reachable from a record.
pub trait Mapping {
    fn lookup(&self, key: &str) -> Option<Datum<'_>>;
}

/// Borrowed run-time view of one value inside a record.
#[derive(Clone)]
pub enum Datum<'a> {
    Null,
    Int(i32),
    Long(i64),
    Double(f64),
    Str(Cow<'a, str>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bool(bool),
    Guid(Uuid),
    Record(&'a dyn Record),
    List(Vec<Datum<'a>>),
    Map(&'a dyn Mapping),
}

impl<'a> Datum<'a> {
    /// Wrap a slice of records as a collection datum.
    pub fn records<R: Record>(items: &'a [R]) -> Self {
        Datum::List(items.iter().map(|r| Datum::Record(r)).collect())
    }

    /// Wrap an optional nested record.
    pub fn record_or_null<R: Record>(item: Option<&'a R>) -> Self {
        match item {
            Some(r) => Datum::Record(r),
            None => Datum::Null,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Datum::Null)
    }

    /// Compare this datum to a literal using the given operator.
    /// Returns `None` for incompatible kinds, nulls and composite values.
    #[must_use]
    pub fn compare(&self, op: CompareOp, literal: &Value) -> Option<bool> {
        let ord = self.partial_cmp_value(literal)?;
        Some(op.holds(ord))
    }

    pub(crate) fn partial_cmp_value(&self, literal: &Value) -> Option<Ordering> {
        match (self, literal) {
            (Datum::Str(a), Value::String(b)) => Some(a.as_ref().cmp(b.as_str())),
            (Datum::Date(a), Value::Date(b)) => Some(a.cmp(b)),
            (Datum::DateTime(a), Value::DateTime(b)) => Some(a.cmp(b)),
            (Datum::DateTime(a), Value::Date(b)) => Some(a.date().cmp(b)),
            (Datum::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Datum::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            (a, b) => cmp_numeric(a.as_number()?, b.as_number()?),
        }
    }

    pub(crate) fn as_number(&self) -> Option<Number> {
        match self {
            Datum::Int(v) => Some(Number::Int(i64::from(*v))),
            Datum::Long(v) => Some(Number::Int(*v)),
            Datum::Double(v) => Some(Number::Float(*v)),
            _ => None,
        }
    }

    pub(crate) fn as_str(&self) -> Option<&str> {
        match self {
            Datum::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    /// Text form of a scalar, used when a dynamic value has to be coerced.
    pub(crate) fn scalar_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Datum::Str(s) => Some(Cow::Borrowed(s.as_ref())),
            Datum::Int(v) => Some(Cow::Owned(v.to_string())),
            Datum::Long(v) => Some(Cow::Owned(v.to_string())),
            Datum::Double(v) => Some(Cow::Owned(v.to_string())),
            Datum::Bool(v) => Some(Cow::Owned(v.to_string())),
            Datum::Date(v) => Some(Cow::Owned(v.format("%Y-%m-%d").to_string())),
            Datum::DateTime(v) => Some(Cow::Owned(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
            Datum::Guid(v) => Some(Cow::Owned(v.hyphenated().to_string())),
            Datum::Null | Datum::Record(_) | Datum::List(_) | Datum::Map(_) => None,
        }
    }

    /// Convert a coerced literal into an owned datum.
    pub(crate) fn from_value(value: Value) -> Datum<'static> {
        match value {
            Value::Int(v) => Datum::Int(v),
            Value::Long(v) => Datum::Long(v),
            Value::Double(v) => Datum::Double(v),
            Value::String(v) => Datum::Str(Cow::Owned(v)),
            Value::Date(v) => Datum::Date(v),
            Value::DateTime(v) => Datum::DateTime(v),
            Value::Bool(v) => Datum::Bool(v),
            Value::Guid(v) => Datum::Guid(v),
        }
    }
}

impl fmt::Debug for Datum<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Null => write!(f, "Null"),
            Datum::Int(v) => write!(f, "Int({v})"),
            Datum::Long(v) => write!(f, "Long({v})"),
            Datum::Double(v) => write!(f, "Double({v})"),
            Datum::Str(v) => write!(f, "Str({v:?})"),
            Datum::Date(v) => write!(f, "Date({v})"),
            Datum::DateTime(v) => write!(f, "DateTime({v})"),
            Datum::Bool(v) => write!(f, "Bool({v})"),
            Datum::Guid(v) => write!(f, "Guid({v})"),
            Datum::Record(_) => write!(f, "Record(..)"),
            Datum::List(items) => f.debug_tuple("List").field(items).finish(),
            Datum::Map(_) => write!(f, "Map(..)"),
        }
    }
}

impl<'a> From<&'a str> for Datum<'a> {
    fn from(v: &'a str) -> Self {
        Datum::Str(Cow::Borrowed(v))
    }
}

impl From<String> for Datum<'static> {
    fn from(v: String) -> Self {
        Datum::Str(Cow::Owned(v))
    }
}

/// Conversion from a stored Rust value into a [`Datum`] view.
pub trait ToDatum {
    fn to_datum(&self) -> Datum<'_>;
}

macro_rules! copy_datum {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl ToDatum for $ty {
                fn to_datum(&self) -> Datum<'_> {
                    Datum::$variant(*self)
                }
            }
        )*
    };
}

copy_datum! {
    i32 => Int,
    i64 => Long,
    f64 => Double,
    bool => Bool,
    NaiveDate => Date,
    NaiveDateTime => DateTime,
    Uuid => Guid,
}

impl ToDatum for str {
    fn to_datum(&self) -> Datum<'_> {
        Datum::Str(Cow::Borrowed(self))
    }
}

impl ToDatum for String {
    fn to_datum(&self) -> Datum<'_> {
        Datum::Str(Cow::Borrowed(self.as_str()))
    }
}

impl<T: ToDatum> ToDatum for Option<T> {
    fn to_datum(&self) -> Datum<'_> {
        match self {
            Some(v) => v.to_datum(),
            None => Datum::Null,
        }
    }
}

impl<T: ToDatum> ToDatum for [T] {
    fn to_datum(&self) -> Datum<'_> {
        Datum::List(self.iter().map(ToDatum::to_datum).collect())
    }
}

impl<T: ToDatum> ToDatum for Vec<T> {
    fn to_datum(&self) -> Datum<'_> {
        self.as_slice().to_datum()
    }
}

impl<V: ToDatum> Mapping for HashMap<String, V> {
    fn lookup(&self, key: &str) -> Option<Datum<'_>> {
        HashMap::get(self, key).map(ToDatum::to_datum)
    }
}

impl<V: ToDatum> ToDatum for HashMap<String, V> {
    fn to_datum(&self) -> Datum<'_> {
        Datum::Map(self)
    }
}

impl<V: ToDatum> Mapping for BTreeMap<String, V> {
    fn lookup(&self, key: &str) -> Option<Datum<'_>> {
        BTreeMap::get(self, key).map(ToDatum::to_datum)
    }
}

impl<V: ToDatum> ToDatum for BTreeMap<String, V> {
    fn to_datum(&self) -> Datum<'_> {
        Datum::Map(self)
    }
}

impl Mapping for serde_json::Map<String, serde_json::Value> {
    fn lookup(&self, key: &str) -> Option<Datum<'_>> {
        self.get(key).map(ToDatum::to_datum)
    }
}

impl ToDatum for serde_json::Value {
    fn to_datum(&self) -> Datum<'_> {
        use serde_json::Value as Json;
        match self {
            Json::Null => Datum::Null,
            Json::Bool(b) => Datum::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Datum::Long(i),
                None => n.as_f64().map_or(Datum::Null, Datum::Double),
            },
            Json::String(s) => Datum::Str(Cow::Borrowed(s.as_str())),
            Json::Array(items) => Datum::List(items.iter().map(ToDatum::to_datum).collect()),
            Json::Object(map) => Datum::Map(map),
        }
    }
}
