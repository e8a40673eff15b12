// Technical-note handling: validate the loosely-typed rule document at the
// boundary, then flatten it into the requirements block embedded in the prompt.

use serde_json::{Map, Value};

use super::types::{Category, FlatCategory, FlatRequirement, Requirement, RuleDocument};
use super::JustificationError;

/// First line of every flattened requirements block.
pub const REQUIREMENTS_HEADER: &str = "REQUISITOS DA NOTA TÉCNICA:";

/// Placeholder for absent names and descriptions.
pub const MISSING_FIELD: &str = "N/A";

/// Category name used when a catalog requirement has no category.
pub const UNCATEGORIZED: &str = "Sem Categoria";

const CATEGORIES_KEY: &str = "Categorias";
const REQUIREMENTS_KEY: &str = "ERs";
const NAME_KEY: &str = "Nome";
const DESCRIPTION_KEY: &str = "Descrição";
const FLAT_DESCRIPTION_KEY: &str = "Descricao";
const FLAT_CATEGORY_KEY: &str = "categoria";

impl RuleDocument {
    /// Parse a rule document from its JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, JustificationError> {
        let value: Value = serde_json::from_str(json).map_err(|e| {
            JustificationError::InvalidRuleDocument(format!("not valid JSON: {e}"))
        })?;
        Self::from_value(&value)
    }

    /// Validate a `{"Categorias": [{"Nome", "Descrição", "ERs": [...]}]}` document.
    ///
    /// Missing lists are empty and missing fields are `None`; anything with
    /// the wrong shape is rejected.
    pub fn from_value(value: &Value) -> Result<Self, JustificationError> {
        let root = value.as_object().ok_or_else(|| {
            JustificationError::InvalidRuleDocument("document must be a JSON object".into())
        })?;

        let categories = list_field(root, CATEGORIES_KEY, "document")?
            .iter()
            .enumerate()
            .map(|(i, item)| parse_category(item, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { categories })
    }

    /// Validate a flat catalog list `[{"Nome", "Descricao", "categoria": {...}}]`
    /// and group it into categories.
    ///
    /// Shape errors are rejected the same way as in [`from_value`](Self::from_value).
    pub fn from_flat_value(value: &Value) -> Result<Self, JustificationError> {
        let items = match value {
            Value::Null => &[][..],
            Value::Array(items) => items.as_slice(),
            _ => {
                return Err(JustificationError::InvalidRuleDocument(
                    "requirement list must be a JSON array".into(),
                ))
            }
        };

        let flat = items
            .iter()
            .enumerate()
            .map(|(i, item)| parse_flat_requirement(item, i))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::from_flat_requirements(&flat))
    }

    /// Group a flat catalog requirement list into categories.
    ///
    /// Categories keep the order in which their name first appears.
    pub fn from_flat_requirements(items: &[FlatRequirement]) -> Self {
        let mut categories: Vec<Category> = Vec::new();

        for item in items {
            let category_name = item
                .category
                .as_ref()
                .and_then(|c| c.name.clone())
                .unwrap_or_else(|| UNCATEGORIZED.to_string());

            let requirement = Requirement {
                name: Some(item.name.clone().unwrap_or_else(|| MISSING_FIELD.to_string())),
                description: Some(
                    item.description
                        .clone()
                        .unwrap_or_else(|| MISSING_FIELD.to_string()),
                ),
            };

            match categories
                .iter_mut()
                .find(|c| c.name.as_deref() == Some(category_name.as_str()))
            {
                Some(existing) => existing.requirements.push(requirement),
                None => {
                    let description = item
                        .category
                        .as_ref()
                        .and_then(|c| c.description.clone())
                        .unwrap_or_default();
                    categories.push(Category {
                        name: Some(category_name),
                        description: Some(description),
                        requirements: vec![requirement],
                    });
                }
            }
        }

        Self { categories }
    }

    pub fn requirement_count(&self) -> usize {
        self.categories.iter().map(|c| c.requirements.len()).sum()
    }
}

fn list_field<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    owner: &str,
) -> Result<&'a [Value], JustificationError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(&[][..]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(JustificationError::InvalidRuleDocument(format!(
            "{owner}: \"{key}\" must be a list"
        ))),
    }
}

fn text_field(
    object: &Map<String, Value>,
    key: &str,
    owner: &str,
) -> Result<Option<String>, JustificationError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(_) => Err(JustificationError::InvalidRuleDocument(format!(
            "{owner}: \"{key}\" must be text"
        ))),
    }
}

fn parse_category(value: &Value, index: usize) -> Result<Category, JustificationError> {
    let owner = format!("category #{index}");
    let object = value.as_object().ok_or_else(|| {
        JustificationError::InvalidRuleDocument(format!("{owner} must be an object"))
    })?;

    let requirements = list_field(object, REQUIREMENTS_KEY, &owner)?
        .iter()
        .enumerate()
        .map(|(j, item)| parse_requirement(item, &format!("{owner}, requirement #{j}")))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Category {
        name: text_field(object, NAME_KEY, &owner)?,
        description: text_field(object, DESCRIPTION_KEY, &owner)?,
        requirements,
    })
}

fn parse_requirement(value: &Value, owner: &str) -> Result<Requirement, JustificationError> {
    let object = value.as_object().ok_or_else(|| {
        JustificationError::InvalidRuleDocument(format!("{owner} must be an object"))
    })?;

    Ok(Requirement {
        name: text_field(object, NAME_KEY, owner)?,
        description: text_field(object, DESCRIPTION_KEY, owner)?,
    })
}

fn parse_flat_requirement(value: &Value, index: usize) -> Result<FlatRequirement, JustificationError> {
    let owner = format!("requirement #{index}");
    let object = value.as_object().ok_or_else(|| {
        JustificationError::InvalidRuleDocument(format!("{owner} must be an object"))
    })?;

    let category = match object.get(FLAT_CATEGORY_KEY) {
        None | Some(Value::Null) => None,
        Some(Value::Object(category)) => {
            let owner = format!("{owner}, category");
            Some(FlatCategory {
                name: text_field(category, NAME_KEY, &owner)?,
                description: text_field(category, FLAT_DESCRIPTION_KEY, &owner)?,
            })
        }
        Some(_) => {
            return Err(JustificationError::InvalidRuleDocument(format!(
                "{owner}: \"{FLAT_CATEGORY_KEY}\" must be an object"
            )))
        }
    };

    Ok(FlatRequirement {
        name: text_field(object, NAME_KEY, &owner)?,
        description: text_field(object, FLAT_DESCRIPTION_KEY, &owner)?,
        category,
    })
}

fn or_placeholder(field: &Option<String>) -> &str {
    field.as_deref().unwrap_or(MISSING_FIELD)
}

/// Flatten the rule document into the requirements block used in the prompt.
pub fn flatten_requirements(document: &RuleDocument) -> String {
    let mut out = String::from(REQUIREMENTS_HEADER);

    for category in &document.categories {
        out.push_str(&format!(
            "\nCATEGORIA: {}({})",
            or_placeholder(&category.name),
            or_placeholder(&category.description)
        ));
        for requirement in &category.requirements {
            out.push_str(&format!(
                "\n - {}: {}",
                or_placeholder(&requirement.name),
                or_placeholder(&requirement.description)
            ));
        }
    }

    out
}
