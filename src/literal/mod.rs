//! Literal canonicalization: every shape a rule's `value` may take is reduced
//! to one ordered list of text tokens before coercion.

mod grammar;

use crate::{Locale, RawValue};

/// The canonical form of a rule's value: ordered text tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Literal {
    tokens: Vec<String>,
}

impl Literal {
    /// Reduce `raw` to tokens.
    ///
    /// `split` is set for multi-valued operators (membership and ranges):
    /// only then is a string read as a bracket list (`"[1,2]"`) or a comma
    /// list (`"1,2"`). A malformed bracket list stays a single token and
    /// fails later, during coercion. Native numbers are rendered with the
    /// locale's decimal separator so that coercion reads them back exactly.
    #[must_use]
    pub fn canonicalize(raw: Option<&RawValue>, split: bool, locale: &Locale) -> Self {
        let mut tokens = Vec::new();
        if let Some(raw) = raw {
            push_tokens(raw, split, locale, &mut tokens);
        }
        Self { tokens }
    }

    #[must_use]
    pub fn from_tokens<S: Into<String>>(tokens: impl IntoIterator<Item = S>) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

fn push_tokens(raw: &RawValue, split: bool, locale: &Locale, out: &mut Vec<String>) {
    match raw {
        RawValue::Bool(b) => out.push(b.to_string()),
        RawValue::Int(i) => out.push(i.to_string()),
        RawValue::Float(f) => out.push(locale.render_float(*f)),
        RawValue::Text(s) => {
            if split {
                out.extend(split_text(s));
            } else {
                out.push(s.clone());
            }
        }
        RawValue::List(items) => {
            for item in items {
                push_tokens(item, false, locale, out);
            }
        }
        RawValue::Other(json) => match json {
            serde_json::Value::String(s) => out.push(s.clone()),
            other => out.push(other.to_string()),
        },
    }
}

fn split_text(s: &str) -> Vec<String> {
    let trimmed = s.trim();
    if trimmed.starts_with('[') {
        return grammar::parse_bracket_list(trimmed).unwrap_or_else(|| vec![s.to_owned()]);
    }
    if trimmed.contains(',') {
        return trimmed.split(',').map(|t| t.trim().to_owned()).collect();
    }
    vec![s.to_owned()]
}
