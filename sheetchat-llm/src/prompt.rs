use std::{fs, path::Path};

use anyhow::Context as _;
use serde_json::{Map, Value};

const DEFAULT_PREAMBLE: &str = "You are a data analyst assistant built into a spreadsheet exploration app. \
You answer questions about a tabular dataset the user uploaded. Be concise and concrete.";

/// The instructional preamble, overridable with a `SYSTEM_PROMPT.md` next to the binary's
/// working directory.
pub fn preamble() -> String {
    let prompt_file = Path::new("SYSTEM_PROMPT.md");
    match fs::read_to_string(prompt_file) {
        Ok(value) if !value.trim().is_empty() => value,
        _ => DEFAULT_PREAMBLE.to_owned(),
    }
}

/// What the model gets to know about a dataset.
#[derive(Clone, Copy, Debug)]
pub struct DatasetContext<'a> {
    pub name: &'a str,
    pub total_rows: u64,
    pub sample_cap: u32,
    pub sample_rows: &'a [Map<String, Value>],
}

pub fn build_system_prompt(preamble: &str, context: &DatasetContext<'_>) -> anyhow::Result<String> {
    let sample_json =
        serde_json::to_string_pretty(context.sample_rows).context("failed to encode sample rows")?;

    let lines = [
        preamble.trim_end().to_owned(),
        format!("Dataset name: {}", context.name),
        format!("Total rows: {}", context.total_rows),
        String::new(),
        format!(
            "You are given up to {} sample rows as JSON so you can learn the columns and their typical values.",
            context.sample_cap
        ),
        "Infer what each column means from them and explain your reasoning.".to_owned(),
        "When the user asks for filters or lookups, suggest concrete column/value conditions the app could run server-side.".to_owned(),
        String::new(),
        "Sample rows (JSON):".to_owned(),
        sample_json,
    ];

    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, Value, json};

    use super::{DatasetContext, build_system_prompt};

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn prompt_carries_dataset_facts_and_samples() {
        let rows = vec![
            row(json!({"__sheet": "Q1", "__rowIndex": 0, "Region": "North", "Sales": 10})),
            row(json!({"__sheet": "Q1", "__rowIndex": 1, "Region": "South", "Sales": null})),
        ];
        let context = DatasetContext {
            name: "Quarterly sales",
            total_rows: 1200,
            sample_cap: 30,
            sample_rows: &rows,
        };

        let prompt = build_system_prompt("You are helpful.\n", &context).unwrap();

        assert!(prompt.starts_with("You are helpful.\nDataset name: Quarterly sales\n"));
        assert!(prompt.contains("Total rows: 1200"));
        assert!(prompt.contains("up to 30 sample rows"));
        assert!(prompt.contains("\"Region\": \"South\""));
        assert!(prompt.contains("\"Sales\": null"));
    }

    #[test]
    fn sample_json_keeps_column_order() {
        let rows = vec![row(json!({"zeta": 1, "alpha": 2}))];
        let context = DatasetContext {
            name: "d",
            total_rows: 1,
            sample_cap: 30,
            sample_rows: &rows,
        };

        let prompt = build_system_prompt("p", &context).unwrap();
        let zeta = prompt.find("\"zeta\"").unwrap();
        let alpha = prompt.find("\"alpha\"").unwrap();
        assert!(zeta < alpha);
    }

    #[test]
    fn empty_sample_is_an_empty_array() {
        let context = DatasetContext {
            name: "d",
            total_rows: 0,
            sample_cap: 30,
            sample_rows: &[],
        };

        let prompt = build_system_prompt("p", &context).unwrap();
        assert!(prompt.ends_with("Sample rows (JSON):\n[]"));
    }
}
