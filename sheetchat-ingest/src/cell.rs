use calamine::Data;
use serde_json::{Number, Value};

/// Convert a spreadsheet cell into its JSON payload value.
///
/// Empty cells become an explicit `null` so every header key is present on every row.
pub fn cell_to_json(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::Int(value) => Value::from(*value),
        Data::Float(value) => Number::from_f64(*value).map_or(Value::Null, Value::Number),
        Data::String(value) => Value::String(value.clone()),
        Data::Bool(value) => Value::Bool(*value),
        Data::DateTime(value) => match value.as_datetime() {
            Some(datetime) => Value::String(datetime.format("%Y-%m-%dT%H:%M:%S").to_string()),
            None => Number::from_f64(value.as_f64()).map_or(Value::Null, Value::Number),
        },
        Data::Error(error) => Value::String(error.to_string()),
        // ISO date and duration strings are already in display form.
        other => Value::String(other.to_string()),
    }
}

/// Text used when a cell appears in the header row.
pub fn header_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(value) => value.clone(),
        other => other.to_string(),
    }
}

/// A cell that carries no content at all.
pub fn is_blank(cell: &Data) -> bool {
    match cell {
        Data::Empty => true,
        Data::String(value) => value.is_empty(),
        _ => false,
    }
}
