//! Chartkit Engine - data-interchange helpers for MiniJinja templates
//!
//! This crate provides the functions a chart template calls to move data
//! between formats and to pick elements out of collections:
//! - YAML, JSON and TOML conversion that never fails a render
//! - A key/value filter over lists of maps or host objects
//! - A static function table (Helm names) with late-bound placeholders
//! - An engine wrapper that installs the table and renders strings

pub mod bridge;
pub mod engine;
pub mod error;
pub mod filter;
pub mod functions;

pub use bridge::{ERROR_KEY, Format};
pub use engine::{Engine, EngineBuilder};
pub use error::{BridgeError, EngineError, FilterError, Result, TemplateError};
pub use filter::{Shape, filter, must_filter};
pub use functions::{FunctionKind, install, install_core};
