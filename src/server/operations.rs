//! Operation registry.
//!
//! Describes the remotely invokable operations with typed parameters so that
//! callers can discover them (`GET /operations`) before invoking them.

use serde::Serialize;
use serde_json::{json, Value};

/// Name under which the file conversion is registered.
pub const CONVERT_OPERATION: &str = "convert_omero_file";

/// Type of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueKind {
    /// A structured entity of the data platform
    Structure { identifier: &'static str },
    Boolean,
    Float,
    List { item: Box<ValueKind> },
}

impl ValueKind {
    fn structure(identifier: &'static str) -> Self {
        ValueKind::Structure { identifier }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamDefinition {
    pub name: &'static str,
    #[serde(flatten)]
    pub kind: ValueKind,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ParamDefinition {
    fn required(name: &'static str, kind: ValueKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            default: None,
            description,
        }
    }

    fn optional(name: &'static str, kind: ValueKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            nullable: true,
            default: Some(Value::Null),
            description,
        }
    }

    fn with_default(mut self, default: Value) -> Self {
        self.nullable = false;
        self.default = Some(default);
        self
    }
}

/// Signature of one registered operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub params: Vec<ParamDefinition>,
    pub returns: ValueKind,
}

/// Definition of `convert_omero_file`.
pub fn convert_operation() -> OperationDefinition {
    OperationDefinition {
        name: CONVERT_OPERATION,
        description: "Convert an OMERO file into one representation per series",
        params: vec![
            ParamDefinition::required(
                "file",
                ValueKind::structure("omero_file"),
                "The file to be converted",
            ),
            ParamDefinition::optional(
                "stage",
                ValueKind::structure("stage"),
                "Stage that derived positions are placed on",
            ),
            ParamDefinition::optional(
                "era",
                ValueKind::structure("era"),
                "Era that derived timepoints are measured against",
            ),
            ParamDefinition::optional(
                "dataset",
                ValueKind::structure("dataset"),
                "Dataset to put the images in, instead of the file's datasets",
            ),
            ParamDefinition::optional(
                "position_from_planes",
                ValueKind::Boolean,
                "Use the first plane's position to place the image on the stage",
            )
            .with_default(json!(true)),
            ParamDefinition::optional(
                "timepoint_from_time",
                ValueKind::Boolean,
                "Derive a timepoint from the acquisition date",
            )
            .with_default(json!(true)),
            ParamDefinition::optional(
                "channels_from_channels",
                ValueKind::Boolean,
                "Create channel records and one view per channel",
            )
            .with_default(json!(true)),
            ParamDefinition::optional(
                "position_tolerance",
                ValueKind::Float,
                "Distance under which positions are merged",
            ),
            ParamDefinition::optional(
                "timepoint_tolerance",
                ValueKind::Float,
                "Time difference under which timepoints are merged",
            ),
        ],
        returns: ValueKind::List {
            item: Box::new(ValueKind::structure("representation")),
        },
    }
}

/// The set of operations a server exposes.
#[derive(Debug, Clone)]
pub struct OperationRegistry {
    operations: Vec<OperationDefinition>,
}

impl OperationRegistry {
    pub fn new() -> Self {
        Self {
            operations: vec![convert_operation()],
        }
    }

    pub fn list(&self) -> &[OperationDefinition] {
        &self.operations
    }

    pub fn get(&self, name: &str) -> Option<&OperationDefinition> {
        self.operations.iter().find(|op| op.name == name)
    }
}

impl Default for OperationRegistry {
    fn default() -> Self {
        Self::new()
    }
}
