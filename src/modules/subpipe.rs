//! Embedded sub-pipe module

use crate::core::{ParamValue, PipeResult};
use crate::execution::assembler::RunEnv;
use crate::execution::stream::{self, ItemStream};
use crate::execution::CompiledGraph;
use crate::modules::{ConfigReader, SubPipeResolver};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct SubPipeSpec {
    pub pipe_id: String,
    pub graph: Arc<CompiledGraph>,
    /// Values bound to the sub-pipe's text inputs, by input name
    pub params: Vec<(String, ParamValue)>,
}

impl SubPipeSpec {
    pub fn compile(
        pipe_id: &str,
        config: &ConfigReader,
        resolver: &mut dyn SubPipeResolver,
    ) -> PipeResult<Self> {
        let graph = resolver.resolve(pipe_id)?;
        let params = config
            .entries()
            .map(|(name, param)| (name.clone(), param.clone()))
            .collect();

        Ok(Self {
            pipe_id: pipe_id.to_string(),
            graph,
            params,
        })
    }

    pub fn bind(&self, values: &HashMap<String, Value>) -> Self {
        Self {
            pipe_id: self.pipe_id.clone(),
            graph: self.graph.clone(),
            params: self
                .params
                .iter()
                .map(|(name, param)| (name.clone(), param.bind(values)))
                .collect(),
        }
    }

    /// Drive the sub-pipe with `input` feeding its `input` modules
    ///
    /// Parameters resolve against the embedding scope; the sub-pipe is only
    /// assembled on the first pull.
    pub fn open(&self, input: ItemStream, env: &RunEnv) -> ItemStream {
        let spec = self.clone();
        let env = env.clone();
        stream::deferred(move || {
            let mut bindings = HashMap::with_capacity(spec.params.len());
            for (name, param) in &spec.params {
                match param.resolve_text(&env.scope) {
                    Ok(value) => {
                        bindings.insert(name.clone(), value);
                    }
                    Err(e) => return stream::failed(e.into()),
                }
            }

            debug!("Driving sub-pipe {} with {} binding(s)", spec.pipe_id, bindings.len());
            spec.graph.drive(input, &env.with_bindings(bindings)).into_stream()
        })
    }
}
