//! Entry points: compile a rule tree and apply it to a data source.

use tracing::debug;

use crate::coerce::Coercer;
use crate::compile;
use crate::translate::{DocumentQuery, SqlQuery};
use crate::types::{CompileOptions, CompiledFilter, Filtered, Record, RuleNode};
use crate::FilterError;

/// Compile a rule tree into a filter over `T`.
///
/// An absent rule, or one with no leaves, matches every record.
///
/// # Errors
///
/// Returns the first configuration, resolution or coercion fault found
/// while walking the tree.
pub fn build_predicate<T: Record>(
    rule: Option<&RuleNode>,
    options: &CompileOptions,
) -> Result<CompiledFilter<T>, FilterError> {
    let expr = compile::compile::<T>(rule, options)?;
    let filter = CompiledFilter::new(expr, coercer(options));
    debug!(
        record = std::any::type_name::<T>(),
        leaves = filter.expr().leaf_count(),
        expr = filter.debug_text(),
        "compiled filter"
    );
    Ok(filter)
}

pub(crate) fn coercer(options: &CompileOptions) -> Coercer {
    Coercer::new(options.locale.clone(), options.parse_dates_as_utc)
}

/// Something a compiled filter can be applied to.
pub trait QuerySource<T: Record> {
    /// The filtered form of the source.
    type Filtered;

    /// Apply `filter`.
    ///
    /// # Errors
    ///
    /// Sources that translate the filter fail when it has no equivalent in
    /// their query language.
    fn apply(self, filter: &CompiledFilter<T>) -> Result<Self::Filtered, FilterError>;
}

impl<'a, T: Record + 'a> QuerySource<T> for &'a [T] {
    type Filtered = Filtered<'a, T, std::slice::Iter<'a, T>>;

    fn apply(self, filter: &CompiledFilter<T>) -> Result<Self::Filtered, FilterError> {
        Ok(filter.filter(self))
    }
}

impl<'a, T: Record + 'a> QuerySource<T> for &'a Vec<T> {
    type Filtered = Filtered<'a, T, std::slice::Iter<'a, T>>;

    fn apply(self, filter: &CompiledFilter<T>) -> Result<Self::Filtered, FilterError> {
        Ok(filter.filter(self.as_slice()))
    }
}

impl<T: Record> QuerySource<T> for SqlQuery {
    type Filtered = SqlQuery;

    fn apply(self, filter: &CompiledFilter<T>) -> Result<Self::Filtered, FilterError> {
        Ok(self.and_where(filter.expr())?)
    }
}

impl<T: Record> QuerySource<T> for DocumentQuery {
    type Filtered = DocumentQuery;

    fn apply(self, filter: &CompiledFilter<T>) -> Result<Self::Filtered, FilterError> {
        Ok(self.and_filter(filter.expr())?)
    }
}

/// Compile `rule` and apply it to `source`, returning the filtered source and
/// the rendered condition for diagnostics.
///
/// ```
/// use rulefilter::{build_query, CompileOptions, Datum, FieldType, Kind, Record, RuleNode, Schema};
///
/// struct Row(i32);
///
/// impl Record for Row {
///     fn schema() -> Schema {
///         Schema::new("Row").field("id", FieldType::scalar(Kind::Integer))
///     }
///
///     fn field(&self, name: &str) -> Option<Datum<'_>> {
///         (name == "id").then_some(Datum::Int(self.0))
///     }
/// }
///
/// let rows = vec![Row(1), Row(1), Row(2), Row(3)];
/// let rule = RuleNode::leaf("id", "in", "integer", "[1,2]");
/// let (matches, text) = build_query(&rows, Some(&rule), &CompileOptions::default()).unwrap();
/// assert_eq!(matches.collect::<Result<Vec<_>, _>>().unwrap().len(), 3);
/// assert_eq!(text, "(id IN (1, 2))");
/// ```
///
/// # Errors
///
/// Compilation faults, and translation faults for query sources.
pub fn build_query<T, S>(
    source: S,
    rule: Option<&RuleNode>,
    options: &CompileOptions,
) -> Result<(S::Filtered, String), FilterError>
where
    T: Record,
    S: QuerySource<T>,
{
    let filter = build_predicate::<T>(rule, options)?;
    let filtered = source.apply(&filter)?;
    Ok((filtered, filter.debug_text().to_owned()))
}
