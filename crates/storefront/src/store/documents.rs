//! In-memory document map shared by the store bindings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    ArrayOp, CollectionPath, Document, DocumentPath, Fields, SetOptions, StoreError, WriteBatch,
    WriteOp,
};

/// All documents keyed by full path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Documents {
    docs: BTreeMap<String, Fields>,
}

impl Documents {
    pub(crate) fn len(&self) -> usize {
        self.docs.len()
    }

    pub(crate) fn get(&self, path: &DocumentPath) -> Option<Document> {
        self.docs.get(path.as_str()).map(|data| Document {
            id: path.id().to_owned(),
            data: data.clone(),
        })
    }

    pub(crate) fn set(&mut self, path: &DocumentPath, data: Fields, options: SetOptions) {
        match self.docs.get_mut(path.as_str()) {
            Some(existing) if options.merge => merge_fields(existing, data),
            _ => {
                self.docs.insert(path.as_str().to_owned(), data);
            }
        }
    }

    pub(crate) fn delete(&mut self, path: &DocumentPath) {
        self.docs.remove(path.as_str());
    }

    pub(crate) fn list(&self, collection: &CollectionPath) -> Vec<Document> {
        let prefix = format!("{}/", collection.as_str());
        self.docs
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, data)| {
                let id = key.get(prefix.len()..)?;
                (!id.contains('/')).then(|| Document {
                    id: id.to_owned(),
                    data: data.clone(),
                })
            })
            .collect()
    }

    /// Apply a batch. Writes to the in-memory map cannot fail halfway, so
    /// applying them in order is all-or-nothing.
    pub(crate) fn commit(&mut self, batch: WriteBatch) {
        for op in batch.ops {
            match op {
                WriteOp::Set {
                    path,
                    data,
                    options,
                } => self.set(&path, data, options),
                WriteOp::Delete { path } => self.delete(&path),
            }
        }
    }

    pub(crate) fn update_array(
        &mut self,
        path: &DocumentPath,
        field: &str,
        op: ArrayOp,
    ) -> Result<(), StoreError> {
        let doc = self
            .docs
            .get_mut(path.as_str())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        let slot = doc
            .entry(field.to_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !slot.is_array() {
            // Array transforms overwrite non-array values.
            *slot = Value::Array(Vec::new());
        }
        if let Value::Array(items) = slot {
            match op {
                ArrayOp::Add(value) => {
                    if !items.contains(&value) {
                        items.push(value);
                    }
                }
                ArrayOp::Remove(value) => items.retain(|item| item != &value),
            }
        }
        Ok(())
    }

    pub(crate) fn increment(
        &mut self,
        path: &DocumentPath,
        field: &str,
        delta: i64,
    ) -> Result<(), StoreError> {
        let doc = self
            .docs
            .get_mut(path.as_str())
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        let next = match doc.get(field) {
            None | Some(Value::Null) => Value::from(delta),
            Some(Value::Number(n)) => {
                if let Some(current) = n.as_i64() {
                    Value::from(current.saturating_add(delta))
                } else if let Some(current) = n.as_f64() {
                    #[allow(clippy::cast_precision_loss)]
                    let delta = delta as f64;
                    Value::from(current + delta)
                } else {
                    Value::from(delta)
                }
            }
            Some(_) => {
                return Err(StoreError::FieldType {
                    path: path.to_string(),
                    field: field.to_owned(),
                    expected: "a number",
                });
            }
        };
        doc.insert(field.to_owned(), next);
        Ok(())
    }
}

/// Merge `incoming` into `target`, recursing into nested objects.
fn merge_fields(target: &mut Fields, incoming: Fields) {
    for (key, value) in incoming {
        let Value::Object(nested) = value else {
            target.insert(key, value);
            continue;
        };
        if let Some(Value::Object(existing)) = target.get_mut(&key) {
            merge_fields(existing, nested);
            continue;
        }
        target.insert(key, Value::Object(nested));
    }
}
