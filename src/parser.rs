use crate::error::NormalizeError;
use crate::ir::{Gender, Person, Relationships};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const LEGACY_FATHER: &str = "father";
const LEGACY_MOTHER: &str = "mother";

/// Reads raw person records from a family document (a JSON list).
///
/// Strict JSON is tried first; JSON5 is accepted as a fallback so that
/// hand-edited files with comments or trailing commas still load.
pub fn parse_records(input: &str) -> Result<Vec<Value>, NormalizeError> {
    let value = match serde_json::from_str::<Value>(input) {
        Ok(value) => value,
        Err(strict_err) => json5::from_str::<Value>(input)
            .map_err(|_| NormalizeError::Parse(strict_err.to_string()))?,
    };
    match value {
        Value::Array(records) => Ok(records),
        _ => Err(NormalizeError::NotAList),
    }
}

/// Parses a family document and normalizes its records.
pub fn parse_family(input: &str) -> Result<Vec<Person>, NormalizeError> {
    normalize_records(&parse_records(input)?)
}

pub fn normalize_records(records: &[Value]) -> Result<Vec<Person>, NormalizeError> {
    records
        .iter()
        .enumerate()
        .map(|(index, record)| normalize_record(record, index))
        .collect()
}

/// True when any record still uses the scalar `father`/`mother` fields.
pub fn has_legacy_parent_fields(records: &[Value]) -> bool {
    records.iter().any(|record| {
        relationship_object(record).is_some_and(|rels| {
            rels.contains_key(LEGACY_FATHER) || rels.contains_key(LEGACY_MOTHER)
        })
    })
}

pub fn normalize_record(record: &Value, index: usize) -> Result<Person, NormalizeError> {
    let Value::Object(object) = record else {
        return Err(NormalizeError::NotAnObject { index });
    };
    let id = match object.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => return Err(NormalizeError::MissingId { index }),
    };

    let attributes = object
        .get("data")
        .or_else(|| object.get("attributes"))
        .and_then(Value::as_object)
        .map(normalize_attributes)
        .unwrap_or_default();

    let relationships = relationship_object(record)
        .map(normalize_relationships)
        .unwrap_or_default();

    Ok(Person {
        id,
        attributes,
        relationships,
        to_add: flag(object, "to_add"),
        unknown: flag(object, "unknown"),
    })
}

fn relationship_object(record: &Value) -> Option<&Map<String, Value>> {
    record
        .get("rels")
        .or_else(|| record.get("relationships"))
        .and_then(Value::as_object)
}

fn flag(object: &Map<String, Value>, key: &str) -> bool {
    object.get(key).and_then(Value::as_bool).unwrap_or(false)
}

fn normalize_attributes(data: &Map<String, Value>) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    for (key, value) in data {
        let text = match value {
            Value::Null => continue,
            Value::String(text) => text.clone(),
            Value::Bool(flag) => flag.to_string(),
            Value::Number(number) => number.to_string(),
            nested => nested.to_string(),
        };
        attributes.insert(key.clone(), text);
    }
    attributes
}

fn normalize_relationships(rels: &Map<String, Value>) -> Relationships {
    let mut relationships = Relationships {
        parents: id_list(rels.get("parents")),
        spouses: id_list(rels.get("spouses")),
        children: id_list(rels.get("children")),
    };
    for legacy in [LEGACY_FATHER, LEGACY_MOTHER] {
        if let Some(id) = rels.get(legacy).and_then(id_value) {
            relationships.parents.push(id);
        }
    }
    relationships
}

fn id_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(id_value).collect(),
        Some(single) => id_value(single).into_iter().collect(),
        None => Vec::new(),
    }
}

fn id_value(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

/// Converts persons back to the exchange JSON shape.
///
/// Empty relationship lists are omitted. With `legacy` the `parents` list is
/// folded back into `father`/`mother` by gender; a second parent of the same
/// gender takes the remaining slot.
pub fn format_for_export(persons: &[Person], legacy: bool) -> Result<Vec<Value>, NormalizeError> {
    let mut out = Vec::with_capacity(persons.len());
    for person in persons {
        let mut rels = Map::new();
        if legacy {
            let (father, mother) = legacy_parents(person, persons)?;
            if let Some(father) = father {
                rels.insert(LEGACY_FATHER.to_string(), Value::String(father));
            }
            if let Some(mother) = mother {
                rels.insert(LEGACY_MOTHER.to_string(), Value::String(mother));
            }
        } else if !person.relationships.parents.is_empty() {
            rels.insert("parents".to_string(), ids_to_value(&person.relationships.parents));
        }
        if !person.relationships.spouses.is_empty() {
            rels.insert("spouses".to_string(), ids_to_value(&person.relationships.spouses));
        }
        if !person.relationships.children.is_empty() {
            rels.insert("children".to_string(), ids_to_value(&person.relationships.children));
        }

        let data: Map<String, Value> = person
            .attributes
            .iter()
            .map(|(key, value)| (key.clone(), Value::String(value.clone())))
            .collect();

        let mut record = Map::new();
        record.insert("id".to_string(), Value::String(person.id.clone()));
        record.insert("data".to_string(), Value::Object(data));
        record.insert("rels".to_string(), Value::Object(rels));
        if person.to_add {
            record.insert("to_add".to_string(), Value::Bool(true));
        }
        if person.unknown {
            record.insert("unknown".to_string(), Value::Bool(true));
        }
        out.push(Value::Object(record));
    }
    Ok(out)
}

fn legacy_parents(
    person: &Person,
    persons: &[Person],
) -> Result<(Option<String>, Option<String>), NormalizeError> {
    let mut father = None;
    let mut mother = None;
    for parent_id in &person.relationships.parents {
        let parent = persons
            .iter()
            .find(|candidate| &candidate.id == parent_id)
            .ok_or_else(|| NormalizeError::UnknownParent {
                person: person.id.clone(),
                parent: parent_id.clone(),
            })?;
        match parent.gender() {
            Some(Gender::Male) => {
                if father.is_none() {
                    father = Some(parent.id.clone());
                } else {
                    mother = Some(parent.id.clone());
                }
            }
            Some(Gender::Female) => {
                if mother.is_none() {
                    mother = Some(parent.id.clone());
                } else {
                    father = Some(parent.id.clone());
                }
            }
            None => {}
        }
    }
    Ok((father, mother))
}

fn ids_to_value(ids: &[String]) -> Value {
    Value::Array(ids.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn migrates_legacy_father_and_mother() {
        let record = json!({
            "id": "kid",
            "data": { "gender": "F", "birthday": 1970 },
            "rels": { "father": "dad", "mother": "mom" }
        });
        let person = normalize_record(&record, 0).unwrap();
        assert_eq!(person.relationships.parents, vec!["dad", "mom"]);
        assert!(person.relationships.spouses.is_empty());
        assert!(person.relationships.children.is_empty());
        assert_eq!(person.attributes.get("birthday").map(String::as_str), Some("1970"));
        assert!(person.is_female());
    }

    #[test]
    fn missing_rels_become_empty_lists() {
        let person = normalize_record(&json!({ "id": "solo" }), 3).unwrap();
        assert_eq!(person.relationships, Relationships::default());
        assert!(person.attributes.is_empty());
    }

    #[test]
    fn record_without_id_is_rejected() {
        let err = normalize_record(&json!({ "data": {} }), 4).unwrap_err();
        assert_eq!(err, NormalizeError::MissingId { index: 4 });
        let err = normalize_record(&json!("nope"), 1).unwrap_err();
        assert_eq!(err, NormalizeError::NotAnObject { index: 1 });
    }

    #[test]
    fn parse_family_accepts_json5() {
        let input = r#"[
            // trailing commas and comments are tolerated
            { id: 'a', data: { gender: 'M' }, rels: { children: ['b'], }, },
            { id: 'b', rels: { father: 'a' } },
        ]"#;
        let persons = parse_family(input).unwrap();
        assert_eq!(persons.len(), 2);
        assert_eq!(persons[1].relationships.parents, vec!["a"]);
    }

    #[test]
    fn parse_records_keeps_raw_fields() {
        let records = parse_records("[{id: 'kid', rels: {father: 'dad'},},]").unwrap();
        assert_eq!(records.len(), 1);
        assert!(has_legacy_parent_fields(&records));
        assert!(matches!(parse_records("[{"), Err(NormalizeError::Parse(_))));
    }

    #[test]
    fn parse_family_rejects_non_list() {
        assert_eq!(parse_family("{\"id\": \"a\"}").unwrap_err(), NormalizeError::NotAList);
    }

    #[test]
    fn detects_legacy_records() {
        let records = vec![json!({"id": "a", "rels": {}}), json!({"id": "b", "rels": {"mother": "a"}})];
        assert!(has_legacy_parent_fields(&records));
        assert!(!has_legacy_parent_fields(&records[..1]));
    }

    #[test]
    fn legacy_export_folds_parents_by_gender() {
        let persons = vec![
            Person::new("mom").with_gender(Gender::Female).with_children(["kid"]),
            Person::new("dad").with_gender(Gender::Male).with_children(["kid"]),
            Person::new("kid").with_parents(["mom", "dad"]),
        ];
        let exported = format_for_export(&persons, true).unwrap();
        assert_eq!(exported[2]["rels"]["father"], "dad");
        assert_eq!(exported[2]["rels"]["mother"], "mom");
        assert!(exported[2]["rels"].get("parents").is_none());
        assert!(exported[0]["rels"].get("spouses").is_none());
    }

    #[test]
    fn legacy_export_reports_unknown_parent() {
        let persons = vec![Person::new("kid").with_parents(["ghost"])];
        let err = format_for_export(&persons, true).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::UnknownParent {
                person: "kid".to_string(),
                parent: "ghost".to_string()
            }
        );
    }
}
