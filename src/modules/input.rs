//! User input module

use crate::core::{Item, Mode, PipeResult};
use crate::execution::assembler::RunEnv;
use crate::execution::stream::{self, ItemStream};
use crate::modules::ConfigReader;
use serde_json::json;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct TextInputSpec {
    /// Input name; defaults to the module id
    pub name: Option<String>,
    pub default: String,
}

impl TextInputSpec {
    pub fn compile(config: &ConfigReader) -> PipeResult<Self> {
        Ok(Self {
            name: config.literal_str("name")?.filter(|name| !name.is_empty()),
            default: config.literal_str("default")?.unwrap_or_default(),
        })
    }

    /// Embedding bindings win, then caller inputs (live mode only), then the default
    pub fn value(&self, id: &str, env: &RunEnv) -> String {
        let name = self.name.as_deref().unwrap_or(id);

        if let Some(bound) = env.bindings.get(name).or_else(|| env.bindings.get(id)) {
            return bound.clone();
        }
        if env.settings.mode == Mode::Live {
            if let Some(given) = env.settings.inputs.get(name) {
                return given.clone();
            }
        }
        self.default.clone()
    }

    pub fn open(&self, id: &str, env: &RunEnv) -> ItemStream {
        let value = self.value(id, env);
        debug!("Text input {} resolved to '{}'", id, value);
        stream::once(Ok(Item::wrap(json!({ "content": value }))))
    }
}
