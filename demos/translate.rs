use rulefilter::translate::{Dialect, DocumentQuery, SqlQuery};
use rulefilter::{build_query, CompileOptions, Datum, FieldType, Kind, Record, RuleNode, Schema};

struct Customer;

fn address() -> Schema {
    Schema::new("Address").field("country", FieldType::scalar(Kind::String))
}

impl Record for Customer {
    fn schema() -> Schema {
        Schema::new("Customer")
            .field("name", FieldType::scalar(Kind::String))
            .field("age", FieldType::nullable(Kind::Integer))
            .field("address", FieldType::Object(address))
            .field("orders", FieldType::list(FieldType::scalar(Kind::Long)))
    }

    fn field(&self, _name: &str) -> Option<Datum<'_>> {
        None
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let options = CompileOptions::default();
    let rule = RuleNode::and(vec![
        RuleNode::leaf("name", "begins_with", "string", "Jo"),
        RuleNode::leaf("age", "not_between", "integer", "[18,25]"),
        RuleNode::leaf("address.country", "in", "string", ["NO", "SE"]),
    ]);

    for dialect in [Dialect::Postgres, Dialect::MySql] {
        let base = SqlQuery::new("SELECT * FROM customers", dialect);
        let (query, _) = build_query::<Customer, _>(base, Some(&rule), &options)
            .expect("failed to translate to SQL");
        println!("{}: {}", dialect.name(), query.sql());
        println!("  params: {:?}", query.params());
    }

    // Collections have no SQL form but translate to `$elemMatch`.
    let with_orders = RuleNode::and(vec![
        rule,
        RuleNode::leaf("orders", "greater", "long", 1000),
    ]);
    let (query, text) = build_query::<Customer, _>(DocumentQuery::new("customers"), Some(&with_orders), &options)
        .expect("failed to translate to a filter document");
    println!("{text}");
    println!(
        "db.{}.find({})",
        query.collection(),
        serde_json::to_string_pretty(query.filter()).expect("serializable filter")
    );
}
