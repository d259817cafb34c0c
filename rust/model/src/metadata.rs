// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Meta objects and property sets
//!
//! Meta objects form a forest via parent ids (IFC spatial structure,
//! glTF node names, and so on). Ids are caller-supplied strings; in IFC
//! sources they are GlobalIds. Entities link to meta objects by id, and
//! finalize synthesizes a default meta object for entities without one.

use serde::{Deserialize, Serialize};

/// Node in the metadata tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaObject {
    /// Caller-supplied id, unique within the model
    pub id: String,
    /// Source type tag (e.g. "IfcWall"); "default" for synthesized objects
    #[serde(rename = "type")]
    pub object_type: String,
    /// Human-readable name
    pub name: String,
    /// Parent meta object id; `None` for roots
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Property sets attached to this object
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub property_set_ids: Vec<String>,
}

/// Typed property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    String(String),
}

/// One (name, type, value) property record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    /// Source value type tag, when the format provides one
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    pub value: PropertyValue,
}

/// Ordered list of property records, shared between meta objects
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySet {
    /// Caller-supplied id, unique within the model
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub properties: Vec<Property>,
}
