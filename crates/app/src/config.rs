//! Configuration steps and the replay engine.
//!
//! A configuration is an ordered script of steps over the context registry.
//! Replay is transactional with respect to the registry population: when a
//! step fails, the executed prefix is walked in reverse and every undoable
//! step is inverted. The only undoable step type is INIT, whose inverse is
//! FINAL; the internal state of contexts touched by SET/ASSIGN/ACT is
//! deliberately not restored.

use archi_core::{ArchiResult, ParamList, SlotKey, Value};
use tracing::{debug, error, info};

use crate::registry::{ContextRegistry, InterfaceRegistry};

/// One entry of a configuration script.
#[derive(Debug, Clone)]
pub enum ConfigStep {
    /// Construct a context from a registered interface.
    Init {
        /// Key the new context is inserted under.
        key: String,
        /// Interface registry key.
        interface: String,
        /// Keyword arguments for `init`.
        params: ParamList,
    },
    /// Finalize a context and drop the registry's reference to it.
    Final {
        /// Key of the removed context.
        key: String,
    },
    /// Write a literal value into a slot.
    Set {
        /// Target context key.
        key: String,
        /// Target slot.
        slot: SlotKey,
        /// Value written.
        value: Value,
    },
    /// Write a value obtained from another context into a slot.
    ///
    /// With a source slot the value is read via `get`; without one the
    /// source context's own handle is written, pinning the source for as
    /// long as the destination keeps the value.
    Assign {
        /// Target context key.
        key: String,
        /// Target slot.
        slot: SlotKey,
        /// Source context key.
        source: String,
        /// Slot read on the source; `None` takes the source handle itself.
        source_slot: Option<SlotKey>,
    },
    /// Invoke an action on a context.
    Act {
        /// Target context key.
        key: String,
        /// Action designator.
        action: SlotKey,
        /// Keyword arguments for `act`.
        params: ParamList,
    },
}

impl ConfigStep {
    /// Returns the key of the context the step acts on.
    pub fn key(&self) -> &str {
        match self {
            Self::Init { key, .. }
            | Self::Final { key }
            | Self::Set { key, .. }
            | Self::Assign { key, .. }
            | Self::Act { key, .. } => key,
        }
    }

    /// Returns the step kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::Final { .. } => "final",
            Self::Set { .. } => "set",
            Self::Assign { .. } => "assign",
            Self::Act { .. } => "act",
        }
    }
}

/// Replays a configuration script against the registry.
///
/// Steps execute strictly in declared order on the calling thread. The
/// first failing step stops the replay; the already-executed prefix is then
/// undone in reverse (INIT inverted into FINAL, everything else left as is)
/// and the step's error is returned. On success the registry holds every
/// context the script initialized and did not finalize.
///
/// In dry-run mode every step is resolved and logged but nothing executes.
pub fn apply_steps(
    contexts: &ContextRegistry,
    interfaces: &InterfaceRegistry,
    steps: &[ConfigStep],
    dry_run: bool,
) -> ArchiResult<()> {
    let mut journal: Vec<&str> = Vec::new();

    for (index, step) in steps.iter().enumerate() {
        if dry_run {
            info!(
                step = index,
                kind = step.kind(),
                key = step.key(),
                "dry run: step skipped"
            );
            continue;
        }

        debug!(step = index, kind = step.kind(), key = step.key(), "step");

        if let Err(err) = apply_one(contexts, interfaces, step) {
            error!(
                step = index,
                kind = step.kind(),
                key = step.key(),
                code = err.code(),
                "configuration step failed: {err}"
            );
            undo(contexts, &journal);
            return Err(err);
        }

        if let ConfigStep::Init { key, .. } = step {
            journal.push(key);
        }
    }

    Ok(())
}

fn apply_one(
    contexts: &ContextRegistry,
    interfaces: &InterfaceRegistry,
    step: &ConfigStep,
) -> ArchiResult<()> {
    match step {
        ConfigStep::Init {
            key,
            interface,
            params,
        } => {
            let interface = interfaces.lookup(interface)?;
            contexts.add(key.clone(), interface, params)
        }
        ConfigStep::Final { key } => contexts.remove(key),
        ConfigStep::Set { key, slot, value } => contexts.context(key)?.set(slot, value),
        ConfigStep::Assign {
            key,
            slot,
            source,
            source_slot,
        } => {
            let source = contexts.context(source)?;
            let value = match source_slot {
                Some(source_slot) => source.get(source_slot)?,
                None => source.handle_value(),
            };
            contexts.context(key)?.set(slot, &value)
        }
        ConfigStep::Act {
            key,
            action,
            params,
        } => contexts.context(key)?.act(action, params),
    }
}

/// Walks the journal of executed INIT keys in reverse, removing each one.
fn undo(contexts: &ContextRegistry, journal: &[&str]) {
    for key in journal.iter().rev() {
        debug!(key = %key, "undo: removing context");
        if let Err(err) = contexts.remove(key) {
            // Removal can only fail if a later step already finalized the
            // context; nothing is left to undo for it.
            debug!(key = %key, code = err.code(), "undo skipped");
        }
    }
}
