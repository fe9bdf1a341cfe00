use rulefilter::{CompileOptions, Datum, FieldType, FilterCache, Kind, Record, RuleNode, Schema, ToDatum};

struct Reading {
    sensor: String,
    value: f64,
}

impl Record for Reading {
    fn schema() -> Schema {
        Schema::new("Reading")
            .field("sensor", FieldType::scalar(Kind::String))
            .field("value", FieldType::scalar(Kind::Double))
    }

    fn field(&self, name: &str) -> Option<Datum<'_>> {
        match name {
            "sensor" => Some(self.sensor.to_datum()),
            "value" => Some(self.value.to_datum()),
            _ => None,
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let readings: Vec<Reading> = (0..20)
        .map(|i| Reading {
            sensor: format!("s{}", i % 4),
            value: f64::from(i) * 1.5,
        })
        .collect();

    let cache = FilterCache::new(32);
    let options = CompileOptions::default();

    // Every request has the same shape, so only the first one plans.
    for (sensor, threshold) in [("s1", 10.0), ("s2", 20.0), ("s3", 5.0), ("s1", 0.0)] {
        let rule = RuleNode::and(vec![
            RuleNode::leaf("sensor", "equal", "string", sensor),
            RuleNode::leaf("value", "greater", "double", threshold),
        ]);
        let filter = cache
            .get_or_compile::<Reading>(Some(&rule), &options)
            .expect("failed to compile filter");
        let count = filter.filter(&readings).filter_map(Result::ok).count();
        println!("{filter}: {count} readings");
    }

    println!("{:?}", cache.stats());
}
