//! # conch_tablegen
//!
//! Offline front-end for the LR(1) parse-table generator. Builds the ACTION
//! and GOTO tables for the Conch grammar and writes them out as JSON, with
//! shift/reduce/accept actions encoded as `sN`/`rN`/`acc`. The reduction
//! functions themselves live in the grammar and are linked statically; the
//! dump is the inspectable asset for regression comparison.

use std::process;

use serde_json::{json, Map, Value};

use conch_lang::parser::generator::Generator;
use conch_lang::parser::grammar::grammar;
use conch_lang::parser::table::Action;

fn main() {
    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "parse-table.json".to_string());

    let grammar = grammar();
    let table = Generator::new(grammar).build();

    let actions: Vec<Value> = table
        .actions
        .iter()
        .map(|row| {
            let mut entries: Vec<_> = row.iter().collect();
            entries.sort_by_key(|(kind, _)| **kind);
            let mut object = Map::new();
            for (kind, action) in entries {
                let encoded = match action {
                    Action::Shift(state) => format!("s{state}"),
                    Action::Reduce(rule) => format!("r{rule}"),
                    Action::Accept => "acc".to_string(),
                };
                object.insert(kind.to_string(), Value::String(encoded));
            }
            Value::Object(object)
        })
        .collect();

    let gotos: Vec<Value> = table
        .gotos
        .iter()
        .map(|row| {
            let mut entries: Vec<_> = row.iter().collect();
            entries.sort_by_key(|(kind, _)| **kind);
            let mut object = Map::new();
            for (kind, state) in entries {
                object.insert(kind.to_string(), json!(state));
            }
            Value::Object(object)
        })
        .collect();

    let document = json!({
        "rules": grammar.rules.len(),
        "states": table.state_count(),
        "actions": actions,
        "gotos": gotos,
    });

    let serialized = match serde_json::to_string_pretty(&document) {
        Ok(serialized) => serialized,
        Err(error) => {
            eprintln!("Failed to serialize parse table: {error}");
            process::exit(1);
        }
    };
    if let Err(error) = std::fs::write(&output, serialized) {
        eprintln!("Failed to write '{output}': {error}");
        process::exit(1);
    }
    println!(
        "wrote {} states for {} rules to {output}",
        table.state_count(),
        grammar.rules.len()
    );
}
