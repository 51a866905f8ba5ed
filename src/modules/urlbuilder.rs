//! URL builder module

use crate::core::{Item, ParamValue, PipeError, PipeResult};
use crate::execution::assembler::RunEnv;
use crate::execution::stream::{self, ItemStream};
use crate::modules::{per_item, ConfigReader, Inputs};
use serde_json::{json, Value};
use std::collections::HashMap;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct UrlBuilderSpec {
    pub base: ParamValue,
    pub path: Vec<ParamValue>,
    pub params: Vec<(String, ParamValue)>,
}

impl UrlBuilderSpec {
    pub fn compile(config: &ConfigReader) -> PipeResult<Self> {
        let base = config.required("BASE")?.clone();
        let path = config.list_values("PATH")?;
        let params = config
            .nested("PARAM")?
            .iter()
            .map(|param| -> PipeResult<(String, ParamValue)> {
                let key = param
                    .literal_str("key")?
                    .ok_or_else(|| param.error("url parameter without a key"))?;
                let value = param
                    .param("value")
                    .cloned()
                    .unwrap_or_else(|| ParamValue::literal(""));
                Ok((key, value))
            })
            .collect::<PipeResult<Vec<_>>>()?;

        Ok(Self { base, path, params })
    }

    pub fn bind(&self, values: &HashMap<String, Value>) -> Self {
        Self {
            base: self.base.bind(values),
            path: self.path.iter().map(|part| part.bind(values)).collect(),
            params: self
                .params
                .iter()
                .map(|(key, value)| (key.clone(), value.bind(values)))
                .collect(),
        }
    }

    pub fn open(&self, id: &str, inputs: Inputs, env: &RunEnv) -> ItemStream {
        let spec = self.clone();
        let id = id.to_string();
        per_item(inputs, env, move |item| {
            stream::once(spec.build(&id, &item).map(|url| Item::wrap(json!({ "url": url }))))
        })
    }

    /// Render the URL for one item
    pub fn build(&self, module: &str, item: &Item) -> PipeResult<String> {
        let base = self.base.resolve_text(item)?;
        let mut url = Url::parse(base.trim())
            .map_err(|e| PipeError::module_config(module, format!("invalid base url '{}': {}", base, e)))?;

        let mut segments = Vec::with_capacity(self.path.len());
        for part in &self.path {
            let text = part.resolve_text(item)?;
            segments.extend(
                text.split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(str::to_string),
            );
        }
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| PipeError::module_config(module, format!("base url '{}' cannot take a path", base)))?
                .pop_if_empty()
                .extend(segments);
        }

        if !self.params.is_empty() {
            let mut pairs = Vec::with_capacity(self.params.len());
            for (key, value) in &self.params {
                pairs.push((key.as_str(), value.resolve_text(item)?));
            }
            url.query_pairs_mut()
                .extend_pairs(pairs.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url.to_string())
    }
}
