use crate::domain::model::{
    AttributeDefinition, AttributeDraft, AttributeKind, AttributeValue, ProductSchema, Row,
};
use crate::utils::error::{ImportError, Result};
use std::collections::BTreeSet;

/// 依 schema 宣告的屬性型別，把一列資料轉為屬性值
///
/// 空值或缺欄不產生屬性；不支援的型別一律回傳
/// `UnsupportedAttributeType`，與資料內容無關。
pub fn map_attributes(row: &Row, schema: &ProductSchema) -> Result<Vec<AttributeDraft>> {
    let mut attributes = Vec::with_capacity(schema.attributes.len());
    for definition in &schema.attributes {
        if let Some(draft) = map_attribute(row, definition)? {
            attributes.push(draft);
        }
    }
    Ok(attributes)
}

pub fn map_attribute(row: &Row, definition: &AttributeDefinition) -> Result<Option<AttributeDraft>> {
    let name = definition.name.as_str();
    let value = match &definition.kind {
        AttributeKind::String
        | AttributeKind::Enum
        | AttributeKind::LocalizedEnum
        | AttributeKind::Boolean
        | AttributeKind::DateTime => row
            .non_empty(name)
            .map(|value| AttributeValue::Text(value.to_string())),
        AttributeKind::LocalizedString => {
            let text = row.localized(name);
            (!text.is_empty()).then_some(AttributeValue::Localized(text))
        }
        AttributeKind::Set { element_type } => match element_type.as_ref() {
            AttributeKind::String => row.non_empty(name).and_then(text_set),
            _ => return Err(unsupported(definition)),
        },
        _ => return Err(unsupported(definition)),
    };

    Ok(value.map(|value| AttributeDraft {
        name: name.to_string(),
        value,
    }))
}

fn text_set(raw: &str) -> Option<AttributeValue> {
    let values: BTreeSet<String> = raw
        .split(';')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    (!values.is_empty()).then_some(AttributeValue::TextSet(values))
}

fn unsupported(definition: &AttributeDefinition) -> ImportError {
    ImportError::UnsupportedAttributeType {
        attribute: definition.name.clone(),
        kind: definition.kind.to_string(),
    }
}
