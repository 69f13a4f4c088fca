use std::collections::HashSet;

use crate::{ROW_INDEX_KEY, SHEET_KEY};

const EMPTY_HEADER: &str = "__EMPTY";

/// Turn raw header cells into unique payload keys.
///
/// Blank headers become `__EMPTY`, `__EMPTY_1`, ... and repeated headers get a
/// numeric suffix (`Amount`, `Amount_1`, ...). The provenance keys are reserved,
/// so a column literally named `__sheet` is stored as `__sheet_1`.
pub fn normalize_headers<I>(raw: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut taken: HashSet<String> = [SHEET_KEY, ROW_INDEX_KEY]
        .into_iter()
        .map(str::to_owned)
        .collect();

    raw.into_iter()
        .map(|header| {
            let base = if header.trim().is_empty() {
                EMPTY_HEADER.to_owned()
            } else {
                header
            };

            let key = if taken.contains(&base) {
                (1_usize..)
                    .map(|suffix| format!("{base}_{suffix}"))
                    .find(|candidate| !taken.contains(candidate))
                    .unwrap_or_else(|| base.clone())
            } else {
                base
            };

            taken.insert(key.clone());
            key
        })
        .collect()
}
