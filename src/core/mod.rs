//! Core domain models for pipes
//!
//! This module defines items, parameters, pipe definitions and the context
//! threaded through compilation.

pub mod config;
pub mod context;
pub mod definition;
pub mod error;
pub mod item;
pub mod param;

pub use config::RawPipe;
pub use context::{Context, Mode, Settings};
pub use definition::{BuiltinType, ModuleNode, ModuleType, PipeDefinition, Wire};
pub use error::{PipeError, PipeResult};
pub use item::{FieldPath, Item, PathNotFound};
pub use param::{ModuleConfig, ParamValue, Template};
