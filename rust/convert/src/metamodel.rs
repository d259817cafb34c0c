// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Metamodel JSON ingestion
//!
//! A metamodel file carries the object tree and property sets for a
//! model whose geometry comes from a separate file (the usual shape for
//! split IFC-to-glTF exports). The schema matches the viewer's metadata
//! JSON: `metaObjects` with id/type/name/parent links, plus optional
//! `propertySets` and header fields describing the source project.

use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::Value;
use xkt_lite_model::{MetaObject, Property, PropertySet, PropertyValue, SceneModel};

/// Parsed metamodel file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaModelData {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub meta_objects: Vec<MetaObjectData>,
    #[serde(default)]
    pub property_sets: Vec<PropertySetData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaObjectData {
    pub id: String,
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub property_set_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySetData {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyData>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyData {
    pub name: String,
    #[serde(rename = "type", default)]
    pub property_type: Option<String>,
    #[serde(default)]
    pub value: Value,
}

/// Parse metamodel JSON bytes
pub fn parse_meta_model(data: &[u8]) -> Result<MetaModelData> {
    serde_json::from_slice(data).map_err(|e| Error::Input(format!("invalid metamodel JSON: {e}")))
}

/// Replay a metamodel into the scene model builder
pub fn apply_meta_model(data: &MetaModelData, model: &mut SceneModel) -> Result<()> {
    for property_set in &data.property_sets {
        model.create_property_set(PropertySet {
            id: property_set.id.clone(),
            name: property_set
                .name
                .clone()
                .unwrap_or_else(|| property_set.id.clone()),
            properties: property_set
                .properties
                .iter()
                .map(|p| Property {
                    name: p.name.clone(),
                    property_type: p.property_type.clone(),
                    value: convert_value(&p.value),
                })
                .collect(),
        })?;
    }
    for meta_object in &data.meta_objects {
        model.create_meta_object(MetaObject {
            id: meta_object.id.clone(),
            object_type: meta_object
                .object_type
                .clone()
                .unwrap_or_else(|| "default".into()),
            name: meta_object
                .name
                .clone()
                .unwrap_or_else(|| meta_object.id.clone()),
            parent: meta_object.parent.clone(),
            property_set_ids: meta_object.property_set_ids.clone(),
        })?;
    }
    tracing::debug!(
        meta_objects = data.meta_objects.len(),
        property_sets = data.property_sets.len(),
        "applied metamodel"
    );
    Ok(())
}

fn convert_value(value: &Value) -> PropertyValue {
    match value {
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Number(n) => PropertyValue::Number(n.as_f64().unwrap_or(0.0)),
        Value::String(s) => PropertyValue::String(s.clone()),
        other => PropertyValue::String(other.to_string()),
    }
}
