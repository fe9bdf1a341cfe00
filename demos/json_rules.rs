use std::collections::HashMap;

use rulefilter::{
    build_query, CompileOptions, Datum, FieldType, Kind, Record, RuleNode, Schema, ToDatum,
};

struct Ticket {
    id: i64,
    title: String,
    opened: chrono::NaiveDate,
    fields: HashMap<String, String>,
}

impl Record for Ticket {
    fn schema() -> Schema {
        Schema::new("Ticket")
            .field("id", FieldType::scalar(Kind::Long))
            .field("title", FieldType::scalar(Kind::String))
            .field("opened", FieldType::scalar(Kind::Date))
            .field("fields", FieldType::map(FieldType::Dynamic))
    }

    fn field(&self, name: &str) -> Option<Datum<'_>> {
        match name {
            "id" => Some(self.id.to_datum()),
            "title" => Some(self.title.to_datum()),
            "opened" => Some(self.opened.to_datum()),
            "fields" => Some(self.fields.to_datum()),
            _ => None,
        }
    }
}

const RULES: &str = r#"{
    "condition": "AND",
    "rules": [
        {"field": "opened", "type": "date", "operator": "between", "value": ["01/03/2024", "31/03/2024"]},
        {"condition": "OR", "rules": [
            {"field": "title", "type": "string", "operator": "contains", "value": "crash"},
            {"field": "fields.priority", "type": "integer", "operator": "greater_or_equal", "value": "3"}
        ]}
    ]
}"#;

fn ticket(id: i64, title: &str, day: u32, priority: &str) -> Ticket {
    Ticket {
        id,
        title: title.to_owned(),
        opened: chrono::NaiveDate::from_ymd_opt(2024, 3, day).expect("valid date"),
        fields: HashMap::from([("priority".to_owned(), priority.to_owned())]),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let tickets = vec![
        ticket(1, "App CRASH on start", 4, "1"),
        ticket(2, "Typo in footer", 12, "1"),
        ticket(3, "Slow search", 20, "4"),
    ];

    let rule = RuleNode::from_json(RULES).expect("invalid rule JSON");
    let options: CompileOptions =
        serde_json::from_str(r#"{"locale": "en-GB"}"#).expect("invalid options JSON");

    let (matches, text) = build_query(&tickets, Some(&rule), &options).expect("failed to build query");
    println!("{text}");
    for ticket in matches {
        match ticket {
            Ok(t) => println!("  #{} {}", t.id, t.title),
            Err(err) => println!("  evaluation failed: {err}"),
        }
    }
}
