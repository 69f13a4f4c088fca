pub mod chat;
pub mod datasets;
pub mod rate_limit;
pub mod records;
pub mod users;

#[cfg(test)]
pub(crate) mod test_support {
    use serde_json::{Map, Value, json};
    use uuid::Uuid;

    use crate::database::Database;
    use crate::impls::datasets::create_dataset_with_records;
    use crate::impls::users::create_user;
    use crate::model::dataset::{Dataset, NewDataset};
    use crate::model::record::NewRecord;

    pub(crate) async fn seed_user(db: &Database, email: &str) -> Uuid {
        create_user(db, email, "not-a-real-hash", None)
            .await
            .unwrap()
            .unwrap()
            .id
    }

    pub(crate) fn new_dataset(user_id: Uuid, name: &str) -> NewDataset {
        NewDataset {
            user_id,
            name: name.to_owned(),
            filename: format!("{name}.xlsx"),
            size_bytes: 1024,
            mime_type: "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                .to_owned(),
        }
    }

    pub(crate) fn records(count: u64) -> Vec<NewRecord> {
        (0..count)
            .map(|index| NewRecord {
                index,
                data: payload(index),
            })
            .collect()
    }

    pub(crate) fn payload(index: u64) -> Map<String, Value> {
        let value = json!({ "__sheet": "Sheet1", "__rowIndex": index, "Region": "north", "Units": index * 10 });
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    pub(crate) async fn seed_dataset(db: &Database, user_id: Uuid, rows: u64) -> Dataset {
        create_dataset_with_records(db, &new_dataset(user_id, "sales"), &records(rows), 4)
            .await
            .unwrap()
    }
}
