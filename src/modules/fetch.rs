//! Source modules: fetch and fetchdata

use crate::core::{FieldPath, Item, ParamValue, PipeError, PipeResult};
use crate::execution::assembler::RunEnv;
use crate::execution::stream::{self, ItemStream};
use crate::modules::ConfigReader;
use crate::services::SourceRequest;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct FetchSpec {
    pub urls: Vec<ParamValue>,
}

impl FetchSpec {
    pub fn compile(config: &ConfigReader) -> PipeResult<Self> {
        Ok(Self {
            urls: compile_urls(config)?,
        })
    }

    pub fn open(&self, id: &str, env: &RunEnv) -> ItemStream {
        open_sources(id, "fetch", &self.urls, env)
    }

    pub fn bind(&self, values: &HashMap<String, Value>) -> Self {
        Self {
            urls: bind_urls(&self.urls, values),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchDataSpec {
    pub urls: Vec<ParamValue>,
    /// Where the item list sits inside each fetched document
    pub path: Option<FieldPath>,
}

impl FetchDataSpec {
    pub fn compile(config: &ConfigReader) -> PipeResult<Self> {
        Ok(Self {
            urls: compile_urls(config)?,
            path: config.path("path")?,
        })
    }

    pub fn bind(&self, values: &HashMap<String, Value>) -> Self {
        Self {
            urls: bind_urls(&self.urls, values),
            path: self.path.clone(),
        }
    }

    pub fn open(&self, id: &str, env: &RunEnv) -> ItemStream {
        let documents = open_sources(id, "fetchdata", &self.urls, env);
        match self.path.clone() {
            None => documents,
            Some(path) => stream::flat_map_items(documents, move |document| {
                match document.lookup(&path) {
                    Ok(Value::Array(list)) => {
                        stream::from_items(list.iter().cloned().map(Item::wrap).collect())
                    }
                    Ok(value) => stream::once(Ok(Item::wrap(value.clone()))),
                    Err(e) => stream::failed(e.into()),
                }
            }),
        }
    }
}

fn compile_urls(config: &ConfigReader) -> PipeResult<Vec<ParamValue>> {
    let urls = config.list_values("URL")?;
    if urls.is_empty() {
        return Err(config.error("missing parameter 'URL'"));
    }
    Ok(urls)
}

fn bind_urls(urls: &[ParamValue], values: &HashMap<String, Value>) -> Vec<ParamValue> {
    urls.iter().map(|url| url.bind(values)).collect()
}

/// One lazily opened source per URL, concatenated in order
fn open_sources(id: &str, module_type: &str, urls: &[ParamValue], env: &RunEnv) -> ItemStream {
    let streams = urls
        .iter()
        .map(|url| {
            let url = url.clone();
            let scope = env.scope.clone();
            let source = env.services.source.clone();
            let module_id = id.to_string();
            let module_type = module_type.to_string();

            stream::deferred(move || {
                let url = match url.resolve_text(&scope) {
                    Ok(url) => url,
                    Err(e) => return stream::failed(e.into()),
                };
                debug!("Module {} opening source {}", module_id, url);

                let request = SourceRequest {
                    module_id: module_id.clone(),
                    module_type,
                    url,
                };
                match source.open(&request) {
                    Ok(items) => Box::new(items.map(move |result| {
                        result.map_err(|e| PipeError::source_failed(&module_id, e.message))
                    })) as ItemStream,
                    Err(e) => stream::failed(PipeError::source_failed(&module_id, e.message)),
                }
            })
        })
        .collect();

    stream::concat(streams)
}
