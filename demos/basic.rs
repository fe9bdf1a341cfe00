use rulefilter::{build_predicate, CompileOptions, Datum, FieldType, Kind, Record, RuleNode, Schema, ToDatum};

struct Product {
    sku: String,
    price: f64,
    tags: Vec<String>,
}

impl Record for Product {
    fn schema() -> Schema {
        Schema::new("Product")
            .field("sku", FieldType::scalar(Kind::String))
            .field("price", FieldType::scalar(Kind::Double))
            .field("tags", FieldType::list(FieldType::scalar(Kind::String)))
    }

    fn field(&self, name: &str) -> Option<Datum<'_>> {
        match name {
            "sku" => Some(self.sku.to_datum()),
            "price" => Some(self.price.to_datum()),
            "tags" => Some(self.tags.to_datum()),
            _ => None,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let products = vec![
        Product {
            sku: "AB-100".into(),
            price: 9.5,
            tags: vec!["Sale".into()],
        },
        Product {
            sku: "AB-200".into(),
            price: 42.0,
            tags: vec![],
        },
        Product {
            sku: "CD-300".into(),
            price: 5.0,
            tags: vec!["sale".into(), "new".into()],
        },
    ];

    // Cheap products on sale.
    let rule = RuleNode::and(vec![
        RuleNode::leaf("price", "less", "double", 10.0),
        RuleNode::leaf("tags", "equal", "string", "SALE"),
    ]);
    let filter = build_predicate::<Product>(Some(&rule), &CompileOptions::default())
        .expect("failed to compile filter");

    println!("{filter}");
    for product in filter.filter(&products) {
        match product {
            Ok(p) => println!("  {} at {:.2}", p.sku, p.price),
            Err(err) => println!("  evaluation failed: {err}"),
        }
    }
}
