//! Event catalogue listing.

use serde_json::{json, Value};

use crate::cli::EventsArgs;
use crate::domain::{EventDefinition, EventRegistry};
use crate::error::Result;

fn definition_json(definition: &EventDefinition) -> Value {
    json!({
        "name": definition.name(),
        "description": definition.description(),
        "priority": definition.priority(),
        "target_frequency_hz": definition.target_frequency_hz(),
        "max_per_window": definition.max_per_window(),
        "cancellable": definition.is_cancellable(),
        "payload_schema": definition
            .payload_schema()
            .iter()
            .map(|(name, spec)| (name.to_string(), json!(spec)))
            .collect::<serde_json::Map<String, Value>>(),
    })
}

/// Print the built-in event catalogue.
pub fn execute(args: &EventsArgs) -> Result<()> {
    let registry = EventRegistry::builtin();

    if args.json {
        let definitions: Vec<Value> = registry.iter().map(definition_json).collect();
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    println!(
        "  {:<20} {:>8} {:>10} {:>11}  {}",
        "Name", "Priority", "Rate (Hz)", "Cancellable", "Fields"
    );
    for definition in registry.iter() {
        let fields: Vec<String> = definition
            .payload_schema()
            .iter()
            .map(|(name, spec)| {
                if spec.is_required() {
                    format!("{name}*")
                } else {
                    name.to_string()
                }
            })
            .collect();
        println!(
            "  {:<20} {:>8} {:>10} {:>11}  {}",
            definition.name(),
            definition.priority(),
            definition.target_frequency_hz(),
            if definition.is_cancellable() { "yes" } else { "no" },
            fields.join(", ")
        );
    }
    println!();
    println!("  * required field");

    Ok(())
}
