//! A bounded cache of compiled-filter plans.
//!
//! Entries are keyed on the *shape* of a rule tree (fields, operators,
//! declared types and nesting) plus the record type and the options that
//! affect planning. Literal values, locale and date handling are not part of
//! the key: they are applied when a cached plan is bound, so rules that only
//! differ in their values share one entry.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::compile::{self, Plan};
use crate::query::{build_predicate, coercer};
use crate::types::{Combinator, CompileOptions, CompiledFilter, NodeKind, Record, RuleNode};
use crate::FilterError;

type PlanCell = Arc<OnceCell<Result<Arc<Plan>, FilterError>>>;

/// Hit, miss and eviction counts since the cache was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

/// A least-recently-used cache of filter plans, safe to share across threads.
///
/// Concurrent requests for the same key plan at most once; later callers
/// wait for the first and reuse its result (including a failure).
///
/// ```
/// use rulefilter::{CompileOptions, Datum, FieldType, FilterCache, Kind, Record, RuleNode, Schema};
///
/// struct Row(i64);
///
/// impl Record for Row {
///     fn schema() -> Schema {
///         Schema::new("Row").field("n", FieldType::scalar(Kind::Long))
///     }
///
///     fn field(&self, name: &str) -> Option<Datum<'_>> {
///         (name == "n").then_some(Datum::Long(self.0))
///     }
/// }
///
/// let cache = FilterCache::new(16);
/// let options = CompileOptions::default();
/// let five = cache.get_or_compile::<Row>(Some(&RuleNode::leaf("n", "equal", "long", 5)), &options).unwrap();
/// let six = cache.get_or_compile::<Row>(Some(&RuleNode::leaf("n", "equal", "long", 6)), &options).unwrap();
/// assert_eq!(five.evaluate(&Row(5)), Ok(true));
/// assert_eq!(six.evaluate(&Row(5)), Ok(false));
/// assert_eq!(cache.stats().hits, 1);
/// ```
pub struct FilterCache {
    capacity: usize,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    entries: HashMap<blake3::Hash, Entry>,
    tick: u64,
    stats: CacheStats,
}

struct Entry {
    plan: PlanCell,
    last_used: u64,
}

impl FilterCache {
    /// A cache holding at most `capacity` plans (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(State::default()),
        }
    }

    /// Compile `rule` for `T`, reusing a cached plan when one exists for the
    /// same shape.
    ///
    /// # Errors
    ///
    /// Same as [`build_predicate`].
    pub fn get_or_compile<T: Record>(
        &self,
        rule: Option<&RuleNode>,
        options: &CompileOptions,
    ) -> Result<CompiledFilter<T>, FilterError> {
        let Some(key) = cache_key::<T>(rule, options) else {
            debug!("rule shape could not be encoded; compiling without cache");
            return build_predicate::<T>(rule, options);
        };
        let cell = self.slot(key);
        let plan = cell
            .get_or_init(|| compile::plan::<T>(rule, options).map(Arc::new))
            .clone()?;
        let coercer = coercer(options);
        let expr = compile::bind(&plan, rule, options, &coercer)?;
        Ok(CompiledFilter::new(expr, coercer))
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.state.lock().entries.clear();
    }

    fn slot(&self, key: blake3::Hash) -> PlanCell {
        let mut state = self.state.lock();
        state.tick += 1;
        let tick = state.tick;
        if let Some(entry) = state.entries.get_mut(&key) {
            entry.last_used = tick;
            let plan = Arc::clone(&entry.plan);
            state.stats.hits += 1;
            debug!(key = %key.to_hex(), "filter cache hit");
            return plan;
        }
        state.stats.misses += 1;
        if state.entries.len() >= self.capacity {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                state.entries.remove(&oldest);
                state.stats.evictions += 1;
            }
        }
        let plan = PlanCell::default();
        state.entries.insert(
            key,
            Entry {
                plan: Arc::clone(&plan),
                last_used: tick,
            },
        );
        debug!(key = %key.to_hex(), entries = state.entries.len(), "filter cache miss");
        plan
    }
}

impl std::fmt::Debug for FilterCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FilterCache")
            .field("capacity", &self.capacity)
            .field("entries", &state.entries.len())
            .field("stats", &state.stats)
            .finish()
    }
}

/// The parts of a rule tree a plan depends on.
#[derive(Serialize)]
enum Shape<'a> {
    Empty,
    Fork {
        combinator: Combinator,
        children: Vec<(usize, Shape<'a>)>,
    },
    Leaf {
        field: Option<&'a str>,
        operator: Option<&'a str>,
        ty: Option<&'a str>,
    },
}

impl<'a> Shape<'a> {
    fn of(node: &'a RuleNode) -> Self {
        match node.kind() {
            NodeKind::Fork {
                combinator,
                children,
            } => Shape::Fork {
                combinator,
                children: children
                    .iter()
                    .enumerate()
                    .filter(|(_, child)| !child.is_empty())
                    .map(|(i, child)| (i, Shape::of(child)))
                    .collect(),
            },
            NodeKind::Leaf(leaf) => Shape::Leaf {
                field: leaf.field.as_deref(),
                operator: leaf.operator.as_deref(),
                ty: leaf.ty.as_deref(),
            },
            NodeKind::Empty => Shape::Empty,
        }
    }
}

#[derive(Serialize)]
struct Key<'a> {
    record: &'static str,
    shape: Shape<'a>,
    case_sensitive: bool,
    use_indexed_property: bool,
    indexed_property_name: &'a str,
    /// Name and identity of each registered custom operator.
    custom_operators: Vec<(&'a str, usize)>,
}

fn cache_key<T: Record>(rule: Option<&RuleNode>, options: &CompileOptions) -> Option<blake3::Hash> {
    let shape = match rule {
        Some(node) if !node.is_empty() => Shape::of(node),
        _ => Shape::Empty,
    };
    let key = Key {
        record: std::any::type_name::<T>(),
        shape,
        case_sensitive: options.string_case_sensitive,
        use_indexed_property: options.use_indexed_property,
        indexed_property_name: &options.indexed_property_name,
        custom_operators: options
            .custom_operators
            .iter()
            .map(|op| (op.name(), Arc::as_ptr(op).cast::<()>() as usize))
            .collect(),
    };
    let bytes = bincode::serde::encode_to_vec(&key, bincode::config::standard()).ok()?;
    Some(blake3::hash(&bytes))
}
