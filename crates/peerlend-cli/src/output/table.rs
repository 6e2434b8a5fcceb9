use serde_json::Value;
use tabled::{builder::Builder, Table};

/// Format output as a table using the tabled crate.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            if let Some(result) = map.get("result") {
                print_result_table(result, map);
            } else {
                print_flat_object(value);
            }
        }
        Value::Array(arr) => {
            print_array_table(arr);
        }
        _ => {
            println!("{}", value);
        }
    }
}

fn print_result_table(result: &Value, envelope: &serde_json::Map<String, Value>) {
    if let Value::Object(res_map) = result {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in res_map {
            // row-shaped arrays (schedule periods) get their own table below
            if val.is_array() {
                continue;
            }
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);

        for (key, val) in res_map {
            if let Value::Array(rows) = val {
                println!("\n{}:", key);
                print_array_table(rows);
            }
        }
    } else {
        print_flat_object(&Value::Object(envelope.clone()));
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_flat_object(value: &Value) {
    if let Value::Object(map) = value {
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            builder.push_record([key.as_str(), &format_value(val)]);
        }
        let table = Table::from(builder);
        println!("{}", table);
    }
}

fn print_array_table(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        for row in rows {
            println!("{}", format_value(row));
        }
        return;
    };

    let columns: Vec<&str> = first.keys().map(String::as_str).collect();
    let mut builder = Builder::default();
    builder.push_record(columns.clone());
    for row in rows {
        if let Value::Object(map) = row {
            let record: Vec<String> = columns
                .iter()
                .map(|c| map.get(*c).map(format_value).unwrap_or_default())
                .collect();
            builder.push_record(record);
        }
    }
    let table = Table::from(builder);
    println!("{}", table);
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}
