//! Decoded pipe documents from JSON or YAML

use crate::core::error::{PipeError, PipeResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Pipe document as authored: modules plus wires
///
/// Unknown top-level fields (layout, descriptions, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPipe {
    /// Pipe identifier (optional in standalone documents)
    #[serde(default)]
    pub id: Option<String>,

    /// Human-readable name
    #[serde(default)]
    pub name: Option<String>,

    /// Module declarations
    #[serde(default)]
    pub modules: Vec<RawModule>,

    /// Wires between module terminals
    #[serde(default)]
    pub wires: Vec<RawWire>,
}

/// One module declaration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawModule {
    pub id: String,

    /// Module type tag, e.g. `fetch`, `filter` or `pipe:<id>`
    #[serde(rename = "type")]
    pub module_type: String,

    /// Parameter values
    #[serde(default)]
    pub conf: Map<String, Value>,
}

/// A wire from one module terminal to another
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub src: RawEndpoint,

    pub tgt: RawEndpoint,
}

/// Module terminal reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEndpoint {
    pub moduleid: String,

    /// Terminal name; defaults to `_OUTPUT` for sources and `_INPUT` for targets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl RawPipe {
    /// Load a pipe document; `.yaml`/`.yml` files are read as YAML, anything else as JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> PipeResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipeError::Decode(format!("{}: {}", path.display(), e)))?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );

        let mut pipe = if is_yaml {
            Self::from_yaml(&content)?
        } else {
            Self::from_json(&content)?
        };

        if pipe.id.is_none() {
            pipe.id = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .map(str::to_string);
        }

        Ok(pipe)
    }

    pub fn from_json(json: &str) -> PipeResult<Self> {
        serde_json::from_str(json).map_err(|e| PipeError::Decode(e.to_string()))
    }

    pub fn from_yaml(yaml: &str) -> PipeResult<Self> {
        serde_yaml::from_str(yaml).map_err(|e| PipeError::Decode(e.to_string()))
    }

    pub fn from_value(value: Value) -> PipeResult<Self> {
        serde_json::from_value(value).map_err(|e| PipeError::Decode(e.to_string()))
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
