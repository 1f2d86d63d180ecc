//! Reserved host contexts.
//!
//! The host pre-populates the registry with these before any blob replays:
//! the registry itself, the executable's own symbol table, the input file
//! being processed, and (when a watch set was requested) the signal flag
//! set. OS signal delivery is a collaborator outside this crate; the signal
//! context only owns the flags.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use archi_app::{ContextInterface, WeakContextRegistry};
use archi_core::{ArchiError, ArchiResult, ArrayLayout, ParamList, SlotKey, Value};
use archi_hsp::{
    advance_state, branch_state, select_first, select_loop, select_unconditional, BranchSelector,
    StateFunction,
};

/// Registry key of the context registry itself.
pub const KEY_REGISTRY: &str = "archi.registry";
/// Registry key of the executable's symbol table.
pub const KEY_EXECUTABLE: &str = "archi.executable";
/// Registry key of the configuration blob being processed.
pub const KEY_INPUT_FILE: &str = "archi.input_file";
/// Registry key of the signal management context.
pub const KEY_SIGNAL: &str = "archi.signal";

/// The `archi.registry` reserved context: exposes every registered context
/// by key. Reading a slot named after a context yields that context's
/// pinned handle value.
pub struct RegistryInterface;

impl ContextInterface for RegistryInterface {
    fn name(&self) -> &'static str {
        "archi.registry"
    }

    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        // A weak handle: the registry context must not keep the registry
        // it lives in alive.
        let registry = params
            .first("registry")
            .and_then(|value| value.borrow_as::<WeakContextRegistry>())
            .map(|registry| registry.clone())
            .ok_or_else(|| ArchiError::value("registry", "expected the context registry"))?;
        Ok(Value::data_of(
            registry,
            ArrayLayout::of_type::<WeakContextRegistry>(1),
        ))
    }

    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        let registry = handle
            .borrow_as::<WeakContextRegistry>()
            .ok_or_else(|| ArchiError::misuse("registry handle is gone"))?
            .upgrade()
            .ok_or_else(|| ArchiError::misuse("the context registry has been torn down"))?;
        registry.handle_value(&slot.name)
    }
}

/// The `archi.executable` reserved context: the symbol table of the
/// executable itself, holding the built-in state and selector functions.
pub struct ExecutableInterface;

impl ContextInterface for ExecutableInterface {
    fn name(&self) -> &'static str {
        "archi.executable"
    }

    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        let symbols = params
            .first("symbols")
            .and_then(|value| value.borrow_as::<HashMap<String, Value>>())
            .map(|symbols| symbols.clone())
            .ok_or_else(|| ArchiError::value("symbols", "expected the symbol table"))?;
        Ok(Value::data_of(
            symbols,
            ArrayLayout::of_type::<HashMap<String, Value>>(1),
        ))
    }

    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        let symbols = handle
            .borrow_as::<HashMap<String, Value>>()
            .ok_or_else(|| ArchiError::misuse("symbol table handle is gone"))?;
        symbols
            .get(&slot.name)
            .cloned()
            .ok_or_else(|| ArchiError::key(slot.name.clone()))
    }
}

/// Returns the symbol table exported by the executable: the built-in state
/// functions and branch selectors, addressable from configuration blobs.
pub fn executable_symbols() -> HashMap<String, Value> {
    let mut symbols = HashMap::new();
    symbols.insert(
        "hsp_state_advance".to_owned(),
        Value::function_of(advance_state as StateFunction),
    );
    symbols.insert(
        "hsp_state_branch".to_owned(),
        Value::function_of(branch_state as StateFunction),
    );
    symbols.insert(
        "hsp_branch_select_first".to_owned(),
        Value::function_of(select_first as BranchSelector),
    );
    symbols.insert(
        "hsp_branch_select_unconditional".to_owned(),
        Value::function_of(select_unconditional as BranchSelector),
    );
    symbols.insert(
        "hsp_branch_select_loop".to_owned(),
        Value::function_of(select_loop as BranchSelector),
    );
    symbols
}

struct InputFile {
    path: String,
    data: Value,
}

/// The `archi.input_file` reserved context: the configuration blob image
/// currently being processed.
pub struct InputFileInterface;

impl ContextInterface for InputFileInterface {
    fn name(&self) -> &'static str {
        "archi.input_file"
    }

    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        let path = params
            .first("path")
            .and_then(|value| value.borrow_as::<String>())
            .map(|path| path.clone())
            .ok_or_else(|| ArchiError::value("path", "expected the input pathname"))?;
        let data = params
            .first("data")
            .cloned()
            .ok_or_else(|| ArchiError::value("data", "expected the blob image"))?;
        Ok(Value::data_of(
            InputFile { path, data },
            ArrayLayout::of_type::<InputFile>(1),
        ))
    }

    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        let file = handle
            .borrow_as::<InputFile>()
            .ok_or_else(|| ArchiError::misuse("input file handle is gone"))?;
        match slot.name.as_str() {
            "path" => Ok(Value::data_of(
                file.path.clone(),
                ArrayLayout::of_count(1),
            )),
            "data" => Ok(file.data.clone()),
            "size" => Ok(Value::with_layout(ArrayLayout::of_count(
                file.data.layout().num_of,
            ))),
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }
}

struct SignalSet {
    flags: Vec<(i32, Arc<AtomicBool>)>,
}

impl SignalSet {
    fn flag(&self, signal: i64) -> ArchiResult<&Arc<AtomicBool>> {
        self.flags
            .iter()
            .find(|(number, _)| i64::from(*number) == signal)
            .map(|(_, flag)| flag)
            .ok_or_else(|| ArchiError::key(format!("signal {signal}")))
    }
}

/// The `archi.signal` reserved context: one atomic flag per watched signal.
///
/// The flags are shared `AtomicBool`s so an external delivery thread can
/// raise them; within the core, the `raise`/`reset` actions and the `flag`
/// slot are the whole surface.
pub struct SignalInterface;

impl ContextInterface for SignalInterface {
    fn name(&self) -> &'static str {
        "archi.signal"
    }

    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        let watch_set = params
            .first("signals")
            .and_then(|value| value.borrow_as::<Vec<i32>>())
            .map(|signals| signals.clone())
            .ok_or_else(|| ArchiError::value("signals", "expected the watch set"))?;

        let flags = watch_set
            .into_iter()
            .map(|number| (number, Arc::new(AtomicBool::new(false))))
            .collect();
        Ok(Value::data_of(
            SignalSet { flags },
            ArrayLayout::of_type::<SignalSet>(1),
        ))
    }

    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        let set = handle
            .borrow_as::<SignalSet>()
            .ok_or_else(|| ArchiError::misuse("signal set handle is gone"))?;
        match slot.name.as_str() {
            "num_signals" => Ok(Value::with_layout(ArrayLayout::of_count(set.flags.len()))),
            "flag" => {
                let signal = slot
                    .single_index()
                    .ok_or_else(|| ArchiError::misuse("`flag` takes exactly one index"))?;
                let raised = set.flag(signal)?.load(Ordering::Acquire);
                Ok(Value::data_of(
                    i64::from(raised),
                    ArrayLayout::of_type::<i64>(1),
                ))
            }
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }

    fn act(&self, handle: &Value, action: &SlotKey, _params: &ParamList) -> ArchiResult<()> {
        let set = handle
            .borrow_as::<SignalSet>()
            .ok_or_else(|| ArchiError::misuse("signal set handle is gone"))?;
        let signal = action
            .single_index()
            .ok_or_else(|| ArchiError::misuse("signal actions take exactly one index"))?;
        match action.name.as_str() {
            "raise" => {
                set.flag(signal)?.store(true, Ordering::Release);
                Ok(())
            }
            "reset" => {
                set.flag(signal)?.store(false, Ordering::Release);
                Ok(())
            }
            _ => Err(ArchiError::key(action.name.clone())),
        }
    }
}
