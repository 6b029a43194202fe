//! Alignment of alias-keyed records onto an expected column order
//!
//! Every expected column gets exactly one cell: the supplied value when the
//! record carries it (under the column's alias or its internal name), the
//! missing sentinel otherwise. Columns the record does not mention are never
//! an error; values that cannot be typed are.

use serde_json::{Map, Value};

use crate::errors::{CoreError, Result};
use crate::schema::{FeatureKind, FeatureSchema};
use crate::table::{FeatureTable, FeatureValue};

/// A one-row table in expected order plus the columns that were imputed
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRecord {
    pub table: FeatureTable,
    pub missing: Vec<String>,
}

/// Map `record` onto `order`, producing a single-row feature table
pub fn align_record(
    order: &[String],
    record: &Map<String, Value>,
    schema: &FeatureSchema,
) -> Result<AlignedRecord> {
    let mut row = Vec::with_capacity(order.len());
    let mut missing = Vec::new();

    for column in order {
        let field = schema.field_for_column(column);
        let kind = field.map(|f| f.kind);

        let mut found: Option<(&str, &Value)> = None;
        let mut keys = vec![column.as_str()];
        if let Some(field) = field {
            if field.name != column {
                keys.push(field.name);
            }
        }

        for key in keys {
            match record.get(key) {
                None | Some(Value::Null) => {}
                Some(value) => {
                    if let Some((first, _)) = found {
                        return Err(CoreError::DuplicateValue {
                            column: column.clone(),
                            first: first.to_string(),
                            second: key.to_string(),
                        });
                    }
                    found = Some((key, value));
                }
            }
        }

        match found {
            Some((_, value)) => row.push(convert_value(column, kind, value)?),
            None => {
                missing.push(column.clone());
                row.push(FeatureValue::Missing);
            }
        }
    }

    let table = FeatureTable::single_row(order.to_vec(), row)?;
    Ok(AlignedRecord { table, missing })
}

fn convert_value(column: &str, kind: Option<FeatureKind>, value: &Value) -> Result<FeatureValue> {
    let invalid = |reason: &str| CoreError::InvalidValue {
        column: column.to_string(),
        reason: reason.to_string(),
    };

    match (kind, value) {
        (Some(FeatureKind::Categorical), Value::Number(_)) => {
            Err(invalid("expected a string category"))
        }
        (_, Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => Ok(FeatureValue::Number(v)),
            _ => Err(invalid("number is not representable as a finite float")),
        },
        (Some(FeatureKind::Numeric), Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(FeatureValue::Number(v)),
            _ => Err(invalid("expected a number")),
        },
        (_, Value::String(s)) => Ok(FeatureValue::Category(s.clone())),
        (_, Value::Bool(_)) => Err(invalid("booleans are not accepted")),
        (_, Value::Array(_)) | (_, Value::Object(_)) => {
            Err(invalid("expected a scalar value"))
        }
        (_, Value::Null) => Ok(FeatureValue::Missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::tribology_schema;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_full_record_follows_expected_order() {
        let schema = tribology_schema();
        let mut order = schema.column_names();
        order.reverse();

        let aligned = align_record(&order, &schema.example_record(), schema).unwrap();

        assert_eq!(aligned.table.columns(), order.as_slice());
        assert!(aligned.missing.is_empty());
        let load_idx = aligned.table.column_index("Load,N").unwrap();
        assert_eq!(aligned.table.rows()[0][load_idx], FeatureValue::Number(200.0));
    }

    #[test]
    fn test_absent_features_become_sentinels() {
        let schema = tribology_schema();
        let order = schema.column_names();
        let mut record = schema.example_record();
        record.remove("Phosphite");
        record.insert("Base_Oil".into(), Value::Null);

        let aligned = align_record(&order, &record, schema).unwrap();

        assert_eq!(aligned.missing, vec!["Base_Oil".to_string(), "Phosphite".to_string()]);
        let idx = aligned.table.column_index("Phosphite").unwrap();
        assert!(aligned.table.rows()[0][idx].is_missing());
    }

    #[test]
    fn test_internal_name_accepted() {
        let schema = tribology_schema();
        let order = vec!["Load,N".to_string()];
        let record = as_map(json!({ "Load_N": 250.0 }));

        let aligned = align_record(&order, &record, schema).unwrap();
        assert_eq!(aligned.table.rows()[0][0], FeatureValue::Number(250.0));
    }

    #[test]
    fn test_alias_and_name_together_rejected() {
        let schema = tribology_schema();
        let order = vec!["Load,N".to_string()];
        let record = as_map(json!({ "Load,N": 200.0, "Load_N": 250.0 }));

        let err = align_record(&order, &record, schema).unwrap_err();
        assert!(matches!(err, CoreError::DuplicateValue { .. }));
    }

    #[test]
    fn test_wrong_types_rejected() {
        let schema = tribology_schema();
        let order = schema.column_names();

        let mut record = schema.example_record();
        record.insert("ZDDP".into(), json!("lots"));
        assert!(matches!(
            align_record(&order, &record, schema),
            Err(CoreError::InvalidValue { .. })
        ));

        let mut record = schema.example_record();
        record.insert("Base_Oil".into(), json!(4));
        assert!(matches!(
            align_record(&order, &record, schema),
            Err(CoreError::InvalidValue { .. })
        ));

        let mut record = schema.example_record();
        record.insert("TCP".into(), json!([0.01]));
        assert!(matches!(
            align_record(&order, &record, schema),
            Err(CoreError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_numeric_string_is_parsed() {
        let schema = tribology_schema();
        let order = vec!["Load,N".to_string()];

        let record = as_map(json!({ "Load,N": " 200 " }));
        let aligned = align_record(&order, &record, schema).unwrap();
        assert_eq!(aligned.table.rows()[0][0], FeatureValue::Number(200.0));

        for bad in ["heavy", "", "NaN", "inf"] {
            let record = as_map(json!({ "Load,N": bad }));
            let err = align_record(&order, &record, schema).unwrap_err();
            assert!(matches!(err, CoreError::InvalidValue { .. }), "{bad:?} accepted");
        }
    }

    #[test]
    fn test_extra_keys_ignored() {
        let schema = tribology_schema();
        let order = vec!["TCP".to_string()];
        let record = as_map(json!({ "TCP": 0.5, "Colour": "amber" }));

        let aligned = align_record(&order, &record, schema).unwrap();
        assert_eq!(aligned.table.n_columns(), 1);
    }

    #[test]
    fn test_duplicate_expected_columns_rejected() {
        let schema = tribology_schema();
        let order = vec!["TCP".to_string(), "TCP".to_string()];
        let record = as_map(json!({ "TCP": 0.5 }));

        let err = align_record(&order, &record, schema).unwrap_err();
        assert_eq!(err, CoreError::DuplicateColumn("TCP".into()));
    }

    #[test]
    fn test_unknown_column_accepts_either_type() {
        let schema = tribology_schema();
        let order = vec!["Colour".to_string(), "Batch".to_string()];
        let record = as_map(json!({ "Colour": "amber", "Batch": 7 }));

        let aligned = align_record(&order, &record, schema).unwrap();
        assert_eq!(aligned.table.rows()[0][0], FeatureValue::Category("amber".into()));
        assert_eq!(aligned.table.rows()[0][1], FeatureValue::Number(7.0));
    }
}
