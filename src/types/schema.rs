use std::fmt;

use super::kind::Kind;
use super::record::Record;

/// Static shape of a field.
#[derive(Clone)]
pub enum FieldType {
    /// One of the eight scalar kinds, optionally nullable.
    Scalar { kind: Kind, nullable: bool },
    /// An ordered sequence of the inner type.
    List(Box<FieldType>),
    /// A nested record.
    Object(fn() -> Schema),
    /// A string-keyed mapping; the next path segment is a runtime key.
    Map(Box<FieldType>),
    /// A boxed value whose kind is only known per record. Rules against it
    /// coerce the stored value at evaluation time.
    Dynamic,
}

// Nested records compare by schema name.
impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                FieldType::Scalar { kind, nullable },
                FieldType::Scalar {
                    kind: other_kind,
                    nullable: other_nullable,
                },
            ) => kind == other_kind && nullable == other_nullable,
            (FieldType::List(a), FieldType::List(b)) | (FieldType::Map(a), FieldType::Map(b)) => a == b,
            (FieldType::Object(a), FieldType::Object(b)) => a().name() == b().name(),
            (FieldType::Dynamic, FieldType::Dynamic) => true,
            _ => false,
        }
    }
}

impl Eq for FieldType {}

impl FieldType {
    #[must_use]
    pub fn scalar(kind: Kind) -> Self {
        FieldType::Scalar {
            kind,
            nullable: false,
        }
    }

    #[must_use]
    pub fn nullable(kind: Kind) -> Self {
        FieldType::Scalar {
            kind,
            nullable: true,
        }
    }

    #[must_use]
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    #[must_use]
    pub fn map(values: FieldType) -> Self {
        FieldType::Map(Box::new(values))
    }

    #[must_use]
    pub fn object<R: Record>() -> Self {
        FieldType::Object(R::schema)
    }

    /// A null can legitimately be read from this field.
    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            FieldType::Scalar { nullable, .. } => *nullable,
            FieldType::List(_)
            | FieldType::Object(_)
            | FieldType::Map(_)
            | FieldType::Dynamic => true,
        }
    }

    #[must_use]
    pub fn is_collection(&self) -> bool {
        matches!(self, FieldType::List(_))
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            FieldType::Scalar { kind, nullable } => {
                if *nullable {
                    format!("{kind}?")
                } else {
                    kind.to_string()
                }
            }
            FieldType::List(inner) => format!("list<{}>", inner.describe()),
            FieldType::Object(schema) => schema().name().to_owned(),
            FieldType::Map(inner) => format!("map<{}>", inner.describe()),
            FieldType::Dynamic => "dynamic".to_owned(),
        }
    }
}

impl fmt::Debug for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
}

/// An indexer property: a named accessor taking a string key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerDef {
    pub name: String,
    pub value_type: FieldType,
}

/// Static description of a record type, used to resolve field paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<FieldDef>,
    indexer: Option<IndexerDef>,
}

impl Schema {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            fields: Vec::new(),
            indexer: None,
        }
    }

    #[must_use]
    pub fn field(mut self, name: &str, ty: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.to_owned(),
            ty,
        });
        self
    }

    /// Declare an indexer property, read through [`Record::index`].
    #[must_use]
    pub fn indexer(mut self, name: &str, value_type: FieldType) -> Self {
        self.indexer = Some(IndexerDef {
            name: name.to_owned(),
            value_type,
        });
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn indexer_def(&self) -> Option<&IndexerDef> {
        self.indexer.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address() -> Schema {
        Schema::new("Address").field("city", FieldType::scalar(Kind::String))
    }

    #[test]
    fn builder_keeps_field_order() {
        let schema = Schema::new("Person")
            .field("id", FieldType::scalar(Kind::Integer))
            .field("age", FieldType::nullable(Kind::Integer))
            .field("address", FieldType::Object(address));
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["id", "age", "address"]);
        assert!(schema.get("age").unwrap().ty.is_nullable());
        assert!(!schema.get("id").unwrap().ty.is_nullable());
        assert!(schema.get("missing").is_none());
    }

    #[test]
    fn describe_types() {
        assert_eq!(
            FieldType::list(FieldType::nullable(Kind::Long)).describe(),
            "list<long?>"
        );
        assert_eq!(FieldType::map(FieldType::Dynamic).describe(), "map<dynamic>");
        assert_eq!(FieldType::Object(address).describe(), "Address");
    }

    #[test]
    fn object_types_compare_by_schema_name() {
        fn other_address() -> Schema {
            Schema::new("Address")
        }
        fn company() -> Schema {
            Schema::new("Company")
        }
        assert_eq!(FieldType::Object(address), FieldType::Object(other_address));
        assert_ne!(FieldType::Object(address), FieldType::Object(company));
        assert_eq!(
            FieldType::list(FieldType::Object(address)),
            FieldType::list(FieldType::Object(other_address))
        );
        assert_ne!(FieldType::scalar(Kind::Long), FieldType::nullable(Kind::Long));
        assert_ne!(FieldType::Dynamic, FieldType::map(FieldType::Dynamic));
    }

    #[test]
    fn indexer_declaration() {
        let schema = Schema::new("Row").indexer("Item", FieldType::Dynamic);
        let idx = schema.indexer_def().unwrap();
        assert_eq!(idx.name, "Item");
        assert_eq!(idx.value_type, FieldType::Dynamic);
    }
}
