//! Field path resolution against a record schema.

use std::collections::HashMap;

use tracing::trace;

use crate::types::{
    CompileOptions, ConfigurationError, FieldPath, FieldRef, FieldResolutionError, FieldType,
    Kind, Schema, Step,
};
use crate::FilterError;

/// The access chain for one field path.
///
/// `hops` holds one path per collection crossed before the last segment,
/// each relative to the element of the previous hop. `path` is relative to
/// the innermost element (or the record when there are no hops).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedField {
    hops: Vec<FieldPath>,
    path: FieldPath,
    ty: FieldType,
    nullable: bool,
}

impl ResolvedField {
    #[must_use]
    pub fn hops(&self) -> &[FieldPath] {
        &self.hops
    }

    #[must_use]
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Shape of the value the path ends at.
    #[must_use]
    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    /// Whether a null may be read at the end of the path, either because the
    /// field is nullable or because a step on the way can be missing.
    #[must_use]
    pub fn nullable(&self) -> bool {
        self.nullable
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.ty.is_collection()
    }

    /// The scalar shape an operator tests: the element type for collections.
    #[must_use]
    pub fn element_type(&self) -> &FieldType {
        match &self.ty {
            FieldType::List(inner) => inner,
            other => other,
        }
    }

    /// A field reference with the rule's declared kind.
    #[must_use]
    pub fn field_ref(&self, kind: Kind, fold_case: bool) -> FieldRef {
        let stored = match self.element_type() {
            FieldType::Scalar { kind, .. } => Some(*kind),
            _ => None,
        };
        FieldRef::new(self.path.clone(), kind)
            .coerced(matches!(self.element_type(), FieldType::Dynamic))
            .folded(fold_case)
            .truncated(stored == Some(Kind::DateTime))
    }

    #[must_use]
    pub fn hop_refs(&self, kind: Kind) -> Vec<FieldRef> {
        self.hops
            .iter()
            .map(|path| FieldRef::new(path.clone(), kind))
            .collect()
    }

    /// Check the declared kind against the schema.
    pub(crate) fn check_kind(&self, field: &str, declared: Kind) -> Result<(), ConfigurationError> {
        match self.element_type() {
            FieldType::Scalar { kind, .. } if !declared.accepts_field(*kind) => {
                Err(ConfigurationError::TypeMismatch {
                    field: field.to_owned(),
                    declared,
                    actual: *kind,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Resolves paths for one record type, remembering what it has seen.
pub(crate) struct Resolver<'o> {
    root: fn() -> Schema,
    options: &'o CompileOptions,
    memo: HashMap<String, ResolvedField>,
}

impl<'o> Resolver<'o> {
    pub(crate) fn new(root: fn() -> Schema, options: &'o CompileOptions) -> Self {
        Self {
            root,
            options,
            memo: HashMap::new(),
        }
    }

    pub(crate) fn resolve(&mut self, field: &str) -> Result<ResolvedField, FilterError> {
        if let Some(hit) = self.memo.get(field) {
            return Ok(hit.clone());
        }
        let resolved = self.walk(field)?;
        trace!(field, hops = resolved.hops.len(), path = %resolved.path, ty = ?resolved.ty, "resolved field");
        self.memo.insert(field.to_owned(), resolved.clone());
        Ok(resolved)
    }

    fn walk(&self, field: &str) -> Result<ResolvedField, FilterError> {
        let segments: Vec<&str> = field.split('.').map(str::trim).collect();
        let mut hops = Vec::new();
        let mut steps = Vec::new();
        let mut ty = FieldType::Object(self.root);
        let mut ty_nullable = false;
        let mut nullable = false;

        let mut i = 0;
        while i < segments.len() {
            let segment = segments[i];
            match ty {
                FieldType::Object(schema_fn) => {
                    nullable |= ty_nullable;
                    let schema = schema_fn();
                    if let Some(def) = schema.get(segment) {
                        steps.push(Step::Member(segment.to_owned()));
                        ty_nullable = def.ty.is_nullable();
                        ty = def.ty.clone();
                    } else {
                        let (step, value_type) = self.index_step(field, &schema, &segments, &mut i)?;
                        steps.push(step);
                        ty_nullable = true;
                        ty = value_type;
                    }
                }
                FieldType::Map(inner) => {
                    nullable |= ty_nullable;
                    steps.push(Step::Key(segment.to_owned()));
                    ty_nullable = true;
                    ty = *inner;
                }
                FieldType::List(inner) => {
                    nullable |= ty_nullable;
                    hops.push(FieldPath::new(std::mem::take(&mut steps)));
                    ty_nullable = false;
                    ty = *inner;
                    continue;
                }
                FieldType::Scalar { .. } | FieldType::Dynamic => {
                    return Err(ConfigurationError::NotTraversable {
                        field: field.to_owned(),
                        segment: segment.to_owned(),
                    }
                    .into());
                }
            }
            i += 1;
        }

        Ok(ResolvedField {
            hops,
            path: FieldPath::new(steps),
            nullable: nullable || ty_nullable,
            ty,
        })
    }

    /// A segment that names no member may go through the schema's indexer,
    /// either as the key itself or as `Indexer.key`.
    fn index_step(
        &self,
        field: &str,
        schema: &Schema,
        segments: &[&str],
        i: &mut usize,
    ) -> Result<(Step, FieldType), FilterError> {
        let segment = segments[*i];
        let not_found = || FieldResolutionError {
            field: field.to_owned(),
            segment: segment.to_owned(),
            schema: schema.name().to_owned(),
        };
        let Some(indexer) = schema.indexer_def() else {
            return Err(not_found().into());
        };
        if !self.options.use_indexed_property {
            return Err(ConfigurationError::IndexerDisabled {
                field: field.to_owned(),
                segment: segment.to_owned(),
            }
            .into());
        }
        if indexer.name != self.options.indexed_property_name {
            return Err(not_found().into());
        }
        let key = if segment == indexer.name && *i + 1 < segments.len() {
            *i += 1;
            segments[*i]
        } else {
            segment
        };
        Ok((
            Step::Index {
                indexer: indexer.name.clone(),
                key: key.to_owned(),
            },
            indexer.value_type.clone(),
        ))
    }
}
