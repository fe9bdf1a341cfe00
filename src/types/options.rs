use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;
use crate::operators::CustomOperator;

/// Order of day, month and year in short numeric dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateOrder {
    DayMonthYear,
    MonthDayYear,
    YearMonthDay,
}

/// Number and date conventions for a culture tag such as `"es-ES"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Locale {
    tag: String,
    decimal: char,
    group: char,
    date_order: DateOrder,
}

const LOCALES: &[(&str, char, char, DateOrder)] = &[
    ("en-US", '.', ',', DateOrder::MonthDayYear),
    ("en-GB", '.', ',', DateOrder::DayMonthYear),
    ("es-ES", ',', '.', DateOrder::DayMonthYear),
    ("fr-FR", ',', ' ', DateOrder::DayMonthYear),
    ("de-DE", ',', '.', DateOrder::DayMonthYear),
    ("it-IT", ',', '.', DateOrder::DayMonthYear),
    ("pt-BR", ',', '.', DateOrder::DayMonthYear),
    ("nl-NL", ',', '.', DateOrder::DayMonthYear),
    ("ru-RU", ',', ' ', DateOrder::DayMonthYear),
    ("ja-JP", '.', ',', DateOrder::YearMonthDay),
    ("zh-CN", '.', ',', DateOrder::YearMonthDay),
];

impl Locale {
    /// The culture-neutral locale: `.` decimals, `,` groups, month-first dates.
    #[must_use]
    pub fn invariant() -> Self {
        Self {
            tag: String::new(),
            decimal: '.',
            group: ',',
            date_order: DateOrder::MonthDayYear,
        }
    }

    /// Look up a culture tag. Matching ignores case and accepts `_` for `-`;
    /// a bare language (`"es"`) selects its first listed region.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::UnknownLocale`] for unrecognised tags.
    pub fn parse(tag: &str) -> Result<Self, ConfigurationError> {
        let normalized = tag.trim().replace('_', "-");
        if normalized.is_empty() || normalized.eq_ignore_ascii_case("invariant") {
            return Ok(Self::invariant());
        }
        let found = LOCALES
            .iter()
            .find(|(name, ..)| name.eq_ignore_ascii_case(&normalized))
            .or_else(|| {
                LOCALES.iter().find(|(name, ..)| {
                    name.split('-')
                        .next()
                        .is_some_and(|lang| lang.eq_ignore_ascii_case(&normalized))
                })
            });
        match found {
            Some(&(name, decimal, group, date_order)) => Ok(Self {
                tag: name.to_owned(),
                decimal,
                group,
                date_order,
            }),
            None => Err(ConfigurationError::UnknownLocale {
                tag: tag.to_owned(),
            }),
        }
    }

    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    #[must_use]
    pub fn decimal_separator(&self) -> char {
        self.decimal
    }

    #[must_use]
    pub fn group_separator(&self) -> char {
        self.group
    }

    #[must_use]
    pub fn date_order(&self) -> DateOrder {
        self.date_order
    }

    /// Rewrite locale-formatted numeric text into the form Rust's parsers accept.
    ///
    /// Group separators are only allowed between the three-digit groups of
    /// the integral part; `None` when one appears anywhere else.
    pub(crate) fn normalize_number(&self, text: &str) -> Option<String> {
        let is_group = |c: char| c == self.group || c == '\u{a0}' || c == '\u{202f}';
        let text = text.trim();
        let (integral, fraction) = match text.split_once(self.decimal) {
            Some((integral, fraction)) => (integral, Some(fraction)),
            None => (text, None),
        };

        let mut out = String::with_capacity(text.len());
        let mut groups = integral.split(is_group);
        let lead = groups.next().unwrap_or("");
        out.push_str(lead);
        let mut grouped = false;
        for group in groups {
            if group.len() != 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            grouped = true;
            out.push_str(group);
        }
        if grouped {
            let digits = lead.trim_start_matches(['+', '-']);
            if !(1..=3).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
        }

        if let Some(fraction) = fraction {
            if fraction.contains(is_group) {
                return None;
            }
            out.push('.');
            out.push_str(fraction);
        }
        Some(out)
    }

    pub(crate) fn render_float(&self, value: f64) -> String {
        let text = value.to_string();
        if self.decimal == '.' {
            text
        } else {
            text.replace('.', &self.decimal.to_string())
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::invariant()
    }
}

impl TryFrom<String> for Locale {
    type Error = ConfigurationError;

    fn try_from(tag: String) -> Result<Self, Self::Error> {
        Self::parse(&tag)
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.tag
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tag.is_empty() {
            f.write_str("invariant")
        } else {
            f.write_str(&self.tag)
        }
    }
}

/// Per-call compilation settings. Read-only while compiling and safe to
/// share across threads and repeated compiles.
///
/// The serializable part can be loaded from configuration; custom operators
/// are attached in code.
///
/// ```
/// use rulefilter::CompileOptions;
///
/// let options: CompileOptions =
///     serde_json::from_str(r#"{"locale": "es-ES", "string_case_sensitive": true}"#).unwrap();
/// assert_eq!(options.locale.decimal_separator(), ',');
/// assert!(!options.parse_dates_as_utc);
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Culture for numeric and date literals.
    pub locale: Locale,
    /// Convert timestamps carrying an offset to UTC; otherwise keep the
    /// written wall-clock time.
    pub parse_dates_as_utc: bool,
    /// Compare text exactly instead of case-insensitively.
    pub string_case_sensitive: bool,
    /// Allow path segments to be read through the record's indexer.
    pub use_indexed_property: bool,
    /// Name of the indexer property to use.
    pub indexed_property_name: String,
    #[serde(skip)]
    pub custom_operators: Vec<Arc<dyn CustomOperator>>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            locale: Locale::invariant(),
            parse_dates_as_utc: false,
            string_case_sensitive: false,
            use_indexed_property: false,
            indexed_property_name: "Item".to_owned(),
            custom_operators: Vec::new(),
        }
    }
}

impl CompileOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    #[must_use]
    pub fn with_utc_dates(mut self, utc: bool) -> Self {
        self.parse_dates_as_utc = utc;
        self
    }

    #[must_use]
    pub fn with_case_sensitive_strings(mut self, sensitive: bool) -> Self {
        self.string_case_sensitive = sensitive;
        self
    }

    /// Enable indexer access through the property named `name`.
    #[must_use]
    pub fn with_indexed_property(mut self, name: &str) -> Self {
        self.use_indexed_property = true;
        self.indexed_property_name = name.to_owned();
        self
    }

    /// Register a custom operator. It shadows any built-in of the same name.
    #[must_use]
    pub fn with_operator(mut self, operator: impl CustomOperator + 'static) -> Self {
        self.custom_operators.push(Arc::new(operator));
        self
    }

    /// The custom operator registered under `name`, if any. Later
    /// registrations win over earlier ones.
    #[must_use]
    pub fn custom_operator(&self, name: &str) -> Option<&Arc<dyn CustomOperator>> {
        self.custom_operators.iter().rev().find(|op| op.name() == name)
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.custom_operators.iter().map(|op| op.name()).collect();
        f.debug_struct("CompileOptions")
            .field("locale", &self.locale.to_string())
            .field("parse_dates_as_utc", &self.parse_dates_as_utc)
            .field("string_case_sensitive", &self.string_case_sensitive)
            .field("use_indexed_property", &self.use_indexed_property)
            .field("indexed_property_name", &self.indexed_property_name)
            .field("custom_operators", &names)
            .finish()
    }
}
