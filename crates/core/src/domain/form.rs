use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::domain::string_or_number;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormId(#[serde(deserialize_with = "string_or_number")] pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(#[serde(deserialize_with = "string_or_number")] pub String);

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    #[serde(alias = "textarea")]
    Text,
    Checkbox,
    Radio,
    #[serde(alias = "select")]
    Dropdown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormField {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Field definitions of one question, in the order the backend sent them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormFields(Vec<(String, FormField)>);

impl FormFields {
    pub fn new(fields: Vec<(String, FormField)>) -> Self {
        Self(fields)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormField)> {
        self.0.iter().map(|(id, field)| (id.as_str(), field))
    }

    pub fn get(&self, field_id: &str) -> Option<&FormField> {
        self.0.iter().find(|(id, _)| id == field_id).map(|(_, field)| field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for FormFields {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, field) in &self.0 {
            map.serialize_entry(id, field)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for FormFields {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = FormFields;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of field id to field definition")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut fields = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, field)) = access.next_entry::<String, FormField>()? {
                    fields.push((id, field));
                }
                Ok(FormFields(fields))
            }
        }

        deserializer.deserialize_map(FieldsVisitor)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormQuestion {
    pub id: QuestionId,
    #[serde(alias = "title")]
    pub name: String,
    #[serde(default)]
    pub fields: FormFields,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormDefinition {
    pub id: FormId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl AnswerValue {
    pub fn is_filled_for(&self, field_type: FieldType) -> bool {
        match (field_type, self) {
            (FieldType::Checkbox, Self::Bool(checked)) => *checked,
            (FieldType::Checkbox, _) => false,
            (_, Self::Text(text)) => !text.trim().is_empty(),
            (_, Self::Number(_)) => true,
            (_, Self::Bool(value)) => *value,
            (_, Self::Null) => false,
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Answers for a single (submission, question) pair.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormAnswers(pub BTreeMap<String, AnswerValue>);

impl FormAnswers {
    pub fn get(&self, field_id: &str) -> Option<&AnswerValue> {
        self.0.get(field_id)
    }

    pub fn set(&mut self, field_id: impl Into<String>, value: AnswerValue) {
        self.0.insert(field_id.into(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FormQuestion {
    /// Required field ids that do not hold a usable value.
    pub fn missing_required(&self, answers: &FormAnswers) -> Vec<String> {
        self.fields
            .iter()
            .filter(|(_, field)| field.required)
            .filter(|(id, field)| {
                !answers.get(id).is_some_and(|value| value.is_filled_for(field.field_type))
            })
            .map(|(id, _)| id.to_string())
            .collect()
    }

    pub fn is_complete(&self, answers: &FormAnswers) -> bool {
        self.missing_required(answers).is_empty()
    }

    /// Share of required fields that are filled; questions without required fields count as done.
    pub fn fraction_complete(&self, answers: &FormAnswers) -> f64 {
        let required = self.fields.iter().filter(|(_, field)| field.required).count();
        if required == 0 {
            return 1.0;
        }
        let missing = self.missing_required(answers).len();
        (required - missing) as f64 / required as f64
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfFillResult {
    pub pdf_url: String,
}
