use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::coerce::Coercer;
use crate::evaluate::{lower, Eval};
use crate::FilterError;

use super::expr::Expr;
use super::record::{Datum, Record};

/// An immutable, compiled filter over records of type `T`.
///
/// Holds both forms of the condition: the structured [`Expr`] for
/// translation and a lowered closure for in-process evaluation. Cloning is
/// cheap and the filter can be shared across threads.
///
/// ```
/// use rulefilter::{build_predicate, CompileOptions, Datum, FieldType, Kind, Record, RuleNode, Schema};
///
/// struct Item {
///     price: f64,
/// }
///
/// impl Record for Item {
///     fn schema() -> Schema {
///         Schema::new("Item").field("price", FieldType::scalar(Kind::Double))
///     }
///
///     fn field(&self, name: &str) -> Option<Datum<'_>> {
///         (name == "price").then_some(Datum::Double(self.price))
///     }
/// }
///
/// let rule = RuleNode::leaf("price", "less", "double", 10.0);
/// let filter = build_predicate::<Item>(Some(&rule), &CompileOptions::default()).unwrap();
/// assert_eq!(filter.evaluate(&Item { price: 4.5 }), Ok(true));
/// assert_eq!(filter.debug_text(), "(price < 10)");
/// ```
pub struct CompiledFilter<T> {
    inner: Arc<Inner>,
    _record: PhantomData<fn(&T) -> bool>,
}

struct Inner {
    expr: Expr,
    debug_text: String,
    eval: Eval,
}

impl<T: Record> CompiledFilter<T> {
    pub(crate) fn new(expr: Expr, coercer: Coercer) -> Self {
        let eval = lower(&expr, &Arc::new(coercer));
        Self {
            inner: Arc::new(Inner {
                debug_text: expr.to_string(),
                expr,
                eval,
            }),
            _record: PhantomData,
        }
    }

    /// Test one record.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::Coercion`] when a value read from the record
    /// must be coerced and cannot be.
    pub fn evaluate(&self, record: &T) -> Result<bool, FilterError> {
        (self.inner.eval)(&Datum::Record(record))
    }

    /// The structured condition.
    #[must_use]
    pub fn expr(&self) -> &Expr {
        &self.inner.expr
    }

    #[must_use]
    pub fn debug_text(&self) -> &str {
        &self.inner.debug_text
    }

    /// Whether the filter matches every record without reading it.
    #[must_use]
    pub fn matches_all(&self) -> bool {
        self.inner.expr == Expr::Constant(true)
    }

    /// Lazily filter a sequence of records.
    pub fn filter<'a, I>(&self, records: I) -> Filtered<'a, T, I::IntoIter>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        Filtered {
            records: records.into_iter(),
            filter: self.clone(),
            failed: false,
            _records: PhantomData,
        }
    }
}

impl<T> Clone for CompiledFilter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _record: PhantomData,
        }
    }
}

impl<T> fmt::Debug for CompiledFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFilter")
            .field("record", &std::any::type_name::<T>())
            .field("expr", &self.inner.debug_text)
            .finish()
    }
}

impl<T> fmt::Display for CompiledFilter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.debug_text)
    }
}

/// Iterator over the records a [`CompiledFilter`] accepts.
///
/// Yields `Err` once if a record cannot be evaluated and then stops.
pub struct Filtered<'a, T, I> {
    records: I,
    filter: CompiledFilter<T>,
    failed: bool,
    _records: PhantomData<&'a ()>,
}

impl<'a, T, I> Iterator for Filtered<'a, T, I>
where
    T: Record + 'a,
    I: Iterator<Item = &'a T>,
{
    type Item = Result<&'a T, FilterError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        for record in self.records.by_ref() {
            match self.filter.evaluate(record) {
                Ok(true) => return Some(Ok(record)),
                Ok(false) => {}
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

impl<'a, T, I> std::iter::FusedIterator for Filtered<'a, T, I>
where
    T: Record + 'a,
    I: std::iter::FusedIterator<Item = &'a T>,
{
}

impl<T, I: fmt::Debug> fmt::Debug for Filtered<'_, T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filtered")
            .field("filter", &self.filter)
            .field("failed", &self.failed)
            .finish_non_exhaustive()
    }
}
