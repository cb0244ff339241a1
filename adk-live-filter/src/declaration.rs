//! Capability declarations advertised to the live model.
//!
//! A declaration is pure data: a name, a description and an object schema
//! describing the arguments the model should pass. The schema is advisory to
//! the remote model and is never enforced against inbound invocations.

use crate::error::{LiveFilterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Name of the duck detection capability.
pub const DUCK_SPOTTED: &str = "duck_spotted";

/// JSON schema type tags, in the upper-case form the Gemini API uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaKind {
    /// Object with named properties.
    Object,
    /// Boolean value.
    Boolean,
    /// String value.
    String,
    /// Floating point number.
    Number,
    /// Integer number.
    Integer,
    /// Array value.
    Array,
}

/// Schema of a single scalar argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimitiveSchema {
    /// Type of the argument.
    #[serde(rename = "type")]
    pub kind: SchemaKind,
    /// Human readable description shown to the model.
    pub description: String,
}

impl PrimitiveSchema {
    /// Create a schema of the given kind.
    pub fn new(kind: SchemaKind, description: impl Into<String>) -> Self {
        Self { kind, description: description.into() }
    }

    /// A boolean argument.
    pub fn boolean(description: impl Into<String>) -> Self {
        Self::new(SchemaKind::Boolean, description)
    }

    /// A string argument.
    pub fn string(description: impl Into<String>) -> Self {
        Self::new(SchemaKind::String, description)
    }
}

/// Object schema describing a capability's parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSchema {
    #[serde(rename = "type")]
    kind: SchemaKind,
    properties: BTreeMap<String, PrimitiveSchema>,
    required: Vec<String>,
}

impl ObjectSchema {
    /// Always [`SchemaKind::Object`].
    pub fn kind(&self) -> SchemaKind {
        self.kind
    }

    /// Declared properties keyed by argument name.
    pub fn properties(&self) -> &BTreeMap<String, PrimitiveSchema> {
        &self.properties
    }

    /// Names of required arguments, in declaration order.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Whether the named argument is required.
    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }
}

/// A named, schema-typed function the remote model may invoke.
///
/// Instances are immutable once built; [`CapabilityDeclarationBuilder::build`]
/// rejects declarations whose `required` list names an undeclared property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilityDeclaration {
    name: String,
    description: String,
    parameters: ObjectSchema,
}

impl CapabilityDeclaration {
    /// Start building a declaration with the given name.
    pub fn builder(name: impl Into<String>) -> CapabilityDeclarationBuilder {
        CapabilityDeclarationBuilder::new(name)
    }

    /// Capability name, unique within a session.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human readable description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Parameter schema.
    pub fn parameters(&self) -> &ObjectSchema {
        &self.parameters
    }
}

/// Builder for [`CapabilityDeclaration`].
#[derive(Debug, Clone, Default)]
pub struct CapabilityDeclarationBuilder {
    name: String,
    description: String,
    properties: BTreeMap<String, PrimitiveSchema>,
    required: Vec<String>,
}

impl CapabilityDeclarationBuilder {
    /// Create a new builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare an optional property.
    pub fn property(mut self, name: impl Into<String>, schema: PrimitiveSchema) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    /// Declare a property and mark it required.
    pub fn required_property(self, name: impl Into<String>, schema: PrimitiveSchema) -> Self {
        let name = name.into();
        self.property(name.clone(), schema).required(name)
    }

    /// Mark an already declared property as required.
    pub fn required(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    /// Validate and build the declaration.
    pub fn build(self) -> Result<CapabilityDeclaration> {
        if self.name.trim().is_empty() {
            return Err(LiveFilterError::schema("capability name must not be empty"));
        }

        if let Some(missing) = self.required.iter().find(|r| !self.properties.contains_key(*r)) {
            return Err(LiveFilterError::schema(format!(
                "capability `{}` requires undeclared property `{}`",
                self.name, missing
            )));
        }

        Ok(CapabilityDeclaration {
            name: self.name,
            description: self.description,
            parameters: ObjectSchema {
                kind: SchemaKind::Object,
                properties: self.properties,
                required: self.required,
            },
        })
    }
}

/// The `duck_spotted(spotted, where)` capability.
pub fn duck_spotted_declaration() -> CapabilityDeclaration {
    CapabilityDeclaration {
        name: DUCK_SPOTTED.to_string(),
        description: "Reports whether a duck was spotted in the image.".to_string(),
        parameters: ObjectSchema {
            kind: SchemaKind::Object,
            properties: BTreeMap::from([
                (
                    "spotted".to_string(),
                    PrimitiveSchema::boolean("Whether a duck was spotted in the image."),
                ),
                (
                    "where".to_string(),
                    PrimitiveSchema::string("Where the duck was spotted in the image."),
                ),
            ]),
            required: vec!["spotted".to_string(), "where".to_string()],
        },
    }
}
