//! # Archipelago context registry and replay engine
//!
//! Contexts are live instances produced by an interface's `init` entry
//! point, identified by string keys in a [`ContextRegistry`] and referenced
//! by other contexts through pinned handle values. A configuration is an
//! ordered script of [`ConfigStep`]s replayed by [`apply_steps`]; on any
//! failure the executed prefix is undone so that the registry population is
//! restored to its pre-replay state.

pub mod config;
pub mod context;
pub mod registry;

pub use config::{apply_steps, ConfigStep};
pub use context::{Context, ContextInterface, InterfaceHandle};
pub use registry::{ContextRegistry, InterfaceRegistry, WeakContextRegistry};
