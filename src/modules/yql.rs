//! YQL module - run a query per item against the query service

use crate::core::{ParamValue, PipeError, PipeResult};
use crate::execution::assembler::RunEnv;
use crate::execution::stream::{self, ItemStream};
use crate::modules::{per_item, ConfigReader, Inputs};
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct YqlSpec {
    pub query: ParamValue,
}

impl YqlSpec {
    pub fn compile(config: &ConfigReader) -> PipeResult<Self> {
        Ok(Self {
            query: config.required("yqlquery")?.clone(),
        })
    }

    pub fn bind(&self, values: &HashMap<String, Value>) -> Self {
        Self {
            query: self.query.bind(values),
        }
    }

    pub fn open(&self, id: &str, inputs: Inputs, env: &RunEnv) -> ItemStream {
        let query = self.query.clone();
        let service = env.services.query.clone();
        let id = id.to_string();
        per_item(inputs, env, move |item| {
            let text = match query.resolve_text(&item) {
                Ok(text) => text,
                Err(e) => return stream::failed(e.into()),
            };
            debug!("Module {} running query: {}", id, text);
            match service.query(&text) {
                Ok(rows) => stream::from_items(rows),
                Err(e) => stream::failed(PipeError::source_failed(&id, e.message)),
            }
        })
    }
}
