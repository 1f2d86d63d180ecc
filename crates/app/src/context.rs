//! Context interfaces and live context instances.

use std::fmt;
use std::rc::Rc;

use archi_core::{ArchiError, ArchiResult, ParamList, ReferenceCount, SlotKey, Value};

/// The vtable contract of a context interface.
///
/// An interface exposes any subset of the five entry points; the default
/// bodies report the entry point as absent (`init`, `get`, `set`, `act`) or
/// do nothing (`finalize`). Interfaces are immutable shared records: all
/// per-instance state lives behind the handle value produced by `init`.
pub trait ContextInterface {
    /// Interface name for diagnostics and error reports.
    fn name(&self) -> &'static str;

    /// Constructs a context instance and returns its handle.
    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        let _ = params;
        Err(ArchiError::interface(self.name(), "init"))
    }

    /// Destroys a context instance. Infallible; called exactly once per
    /// successful `init`.
    fn finalize(&self, handle: &Value) {
        let _ = handle;
    }

    /// Reads a slot.
    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        let _ = (handle, slot);
        Err(ArchiError::interface(self.name(), "get"))
    }

    /// Writes a slot.
    fn set(&self, handle: &Value, slot: &SlotKey, value: &Value) -> ArchiResult<()> {
        let _ = (handle, slot, value);
        Err(ArchiError::interface(self.name(), "set"))
    }

    /// Invokes an action.
    fn act(&self, handle: &Value, action: &SlotKey, params: &ParamList) -> ArchiResult<()> {
        let _ = (handle, action, params);
        Err(ArchiError::interface(self.name(), "act"))
    }
}

/// Shared reference to an interface record.
pub type InterfaceHandle = Rc<dyn ContextInterface>;

struct ContextCell {
    interface: InterfaceHandle,
    handle: Value,
    key: String,
}

impl Drop for ContextCell {
    fn drop(&mut self) {
        self.interface.finalize(&self.handle);
    }
}

/// A live context: an interface plus the handle its `init` produced.
///
/// The registry holds one [`Context`] per entry; other contexts pin it by
/// storing the value returned from [`Context::handle_value`], which carries
/// an ownership token. `finalize` runs exactly once, when the registry
/// entry is gone and the last pinned handle value has been dropped.
#[derive(Clone)]
pub struct Context {
    cell: Rc<ContextCell>,
    pin: ReferenceCount,
}

impl Context {
    /// Initializes a context through `interface.init`. On error nothing is
    /// created and the error is passed through.
    pub fn new<S: Into<String>>(
        key: S,
        interface: InterfaceHandle,
        params: &ParamList,
    ) -> ArchiResult<Self> {
        let handle = interface.init(params)?;
        let cell = Rc::new(ContextCell {
            interface,
            handle,
            key: key.into(),
        });
        let pin = ReferenceCount::new({
            let keep = cell.clone();
            move || drop(keep)
        });
        Ok(Self { cell, pin })
    }

    /// Returns the registry key of this context.
    pub fn key(&self) -> &str {
        &self.cell.key
    }

    /// Returns the interface name of this context.
    pub fn interface_name(&self) -> &'static str {
        self.cell.interface.name()
    }

    /// Returns the raw handle, without pinning.
    pub fn handle(&self) -> &Value {
        &self.cell.handle
    }

    /// Returns the handle as a value pinning this context: the context is
    /// not finalized while the returned value (or a clone of it) is alive.
    pub fn handle_value(&self) -> Value {
        self.cell.handle.clone().with_owner(self.pin.clone())
    }

    /// Reads a slot of this context.
    pub fn get(&self, slot: &SlotKey) -> ArchiResult<Value> {
        self.cell.interface.get(&self.cell.handle, slot)
    }

    /// Writes a slot of this context.
    pub fn set(&self, slot: &SlotKey, value: &Value) -> ArchiResult<()> {
        self.cell.interface.set(&self.cell.handle, slot, value)
    }

    /// Invokes an action on this context.
    pub fn act(&self, action: &SlotKey, params: &ParamList) -> ArchiResult<()> {
        self.cell.interface.act(&self.cell.handle, action, params)
    }

    /// Number of live pins, the registry's own reference included.
    /// Diagnostics only.
    pub fn pin_count(&self) -> usize {
        self.pin.count()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("key", &self.cell.key)
            .field("interface", &self.cell.interface.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archi_core::ArrayLayout;
    use std::cell::Cell;

    struct Probe;

    impl ContextInterface for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn init(&self, params: &ParamList) -> ArchiResult<Value> {
            let finals = params
                .first("finals")
                .and_then(|value| value.borrow_as::<Rc<Cell<u32>>>())
                .map(|counter| counter.clone());
            Ok(Value::data_of(
                finals,
                ArrayLayout::of_type::<Option<Rc<Cell<u32>>>>(1),
            ))
        }

        fn finalize(&self, handle: &Value) {
            if let Some(finals) = handle.borrow_as::<Option<Rc<Cell<u32>>>>() {
                if let Some(counter) = finals.as_ref() {
                    counter.set(counter.get() + 1);
                }
            }
        }
    }

    fn probe_params(finals: &Rc<Cell<u32>>) -> ParamList {
        ParamList::new().with(
            "finals",
            Value::data_of(finals.clone(), ArrayLayout::of_type::<Rc<Cell<u32>>>(1)),
        )
    }

    #[test]
    fn finalize_runs_when_context_drops() {
        let finals = Rc::new(Cell::new(0u32));
        let context = Context::new("p", Rc::new(Probe), &probe_params(&finals)).unwrap();
        assert_eq!(finals.get(), 0);
        drop(context);
        assert_eq!(finals.get(), 1);
    }

    #[test]
    fn pinned_handle_defers_finalize() {
        let finals = Rc::new(Cell::new(0u32));
        let context = Context::new("p", Rc::new(Probe), &probe_params(&finals)).unwrap();

        let pinned = context.handle_value();
        drop(context);
        assert_eq!(finals.get(), 0, "pinned context must stay alive");

        drop(pinned);
        assert_eq!(finals.get(), 1);
    }

    #[test]
    fn missing_entry_points_report_interface_errors() {
        struct Bare;
        impl ContextInterface for Bare {
            fn name(&self) -> &'static str {
                "bare"
            }
            fn init(&self, _params: &ParamList) -> ArchiResult<Value> {
                Ok(Value::empty())
            }
        }

        let context = Context::new("b", Rc::new(Bare), &ParamList::new()).unwrap();
        let slot = SlotKey::named("x");
        assert!(matches!(
            context.get(&slot),
            Err(ArchiError::Interface { .. })
        ));
        assert!(matches!(
            context.set(&slot, &Value::empty()),
            Err(ArchiError::Interface { .. })
        ));
        assert!(matches!(
            context.act(&slot, &ParamList::new()),
            Err(ArchiError::Interface { .. })
        ));
    }

    #[test]
    fn failed_init_creates_nothing() {
        struct Refuser;
        impl ContextInterface for Refuser {
            fn name(&self) -> &'static str {
                "refuser"
            }
            fn init(&self, _params: &ParamList) -> ArchiResult<Value> {
                Err(ArchiError::value("mode", "unsupported"))
            }
        }

        assert!(Context::new("r", Rc::new(Refuser), &ParamList::new()).is_err());
    }
}
