//! Interface and context registries.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use archi_core::{ArchiError, ArchiResult, ParamList, Value};
use tracing::debug;

use crate::context::{Context, ContextInterface, InterfaceHandle};

/// String-keyed table of context interfaces.
///
/// Populated at boot with the built-in interfaces and extended with the
/// interfaces declared by configuration blobs.
#[derive(Default)]
pub struct InterfaceRegistry {
    map: HashMap<String, InterfaceHandle>,
}

impl InterfaceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an interface under `key`. Duplicate keys are misuse.
    pub fn register<S: Into<String>>(
        &mut self,
        key: S,
        interface: InterfaceHandle,
    ) -> ArchiResult<()> {
        let key = key.into();
        if self.map.contains_key(&key) {
            return Err(ArchiError::misuse(format!(
                "interface key `{key}` is already registered"
            )));
        }
        debug!(key = %key, interface = interface.name(), "interface registered");
        self.map.insert(key, interface);
        Ok(())
    }

    /// Looks an interface up by key.
    pub fn lookup(&self, key: &str) -> ArchiResult<InterfaceHandle> {
        self.map
            .get(key)
            .cloned()
            .ok_or_else(|| ArchiError::key(key))
    }

    /// Returns `true` when `key` is registered.
    pub fn contains(&self, key: &str) -> bool {
        self.map.contains_key(key)
    }

    /// Returns the number of registered interfaces.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` when no interface is registered.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Default)]
struct RegistryInner {
    map: HashMap<String, Context>,
    order: Vec<String>,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        // Contexts go away in reverse insertion order, so later contexts can
        // still hold references into earlier ones while they finalize.
        while let Some(key) = self.order.pop() {
            self.map.remove(&key);
        }
    }
}

/// The mapping from string keys to live contexts.
///
/// The registry owns one strong reference per entry; a removed context
/// survives until the last pinned handle value drops. The registry is not
/// thread-safe; it belongs to the replay thread.
///
/// Cloning the registry yields another handle to the same underlying map
/// (the registry is itself exposed as a context, which requires aliasing).
#[derive(Clone, Default)]
pub struct ContextRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl ContextRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Constructs a context and inserts it.
    ///
    /// Order of operations: duplicate keys are rejected before `init` is
    /// called; a failed `init` inserts nothing and returns its error.
    pub fn add<S: Into<String>>(
        &self,
        key: S,
        interface: InterfaceHandle,
        params: &ParamList,
    ) -> ArchiResult<()> {
        let key = key.into();
        if self.inner.borrow().map.contains_key(&key) {
            return Err(ArchiError::misuse(format!(
                "context key `{key}` is already in use"
            )));
        }

        // `init` runs without the registry borrowed, in case the interface
        // reaches into the registry through previously acquired references.
        let context = Context::new(key.clone(), interface, params)?;
        debug!(key = %key, interface = context.interface_name(), "context added");

        let mut inner = self.inner.borrow_mut();
        inner.order.push(key.clone());
        inner.map.insert(key, context);
        Ok(())
    }

    /// Inserts an already-built context (used for host-provided reserved
    /// contexts). Duplicate keys are misuse.
    pub fn insert(&self, context: Context) -> ArchiResult<()> {
        let key = context.key().to_owned();
        let mut inner = self.inner.borrow_mut();
        if inner.map.contains_key(&key) {
            return Err(ArchiError::misuse(format!(
                "context key `{key}` is already in use"
            )));
        }
        inner.order.push(key.clone());
        inner.map.insert(key, context);
        Ok(())
    }

    /// Drops the registry's reference to the context under `key`.
    ///
    /// The context is finalized now unless pinned handle values keep it
    /// alive. Removing an absent key is an error.
    pub fn remove(&self, key: &str) -> ArchiResult<()> {
        let mut inner = self.inner.borrow_mut();
        let context = inner.map.remove(key).ok_or_else(|| ArchiError::key(key))?;
        inner.order.retain(|entry| entry != key);
        debug!(key = %key, "context removed");
        // The borrow ends before the context (and possibly its finalizer)
        // runs, so finalize may look other contexts up through held values.
        drop(inner);
        drop(context);
        Ok(())
    }

    /// Returns a dispatch handle for the context under `key`.
    pub fn context(&self, key: &str) -> ArchiResult<Context> {
        self.inner
            .borrow()
            .map
            .get(key)
            .cloned()
            .ok_or_else(|| ArchiError::key(key))
    }

    /// Returns the pinned handle value of the context under `key`.
    pub fn handle_value(&self, key: &str) -> ArchiResult<Value> {
        Ok(self.context(key)?.handle_value())
    }

    /// Returns `true` when `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.borrow().map.contains_key(key)
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.inner.borrow().map.len()
    }

    /// Returns `true` when the registry has no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.borrow().map.is_empty()
    }

    /// Returns the keys in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.borrow().order.clone()
    }

    /// Returns a non-owning handle to this registry.
    ///
    /// The registry is itself exposed as a context; that context must not
    /// keep its own map alive, or teardown would never run.
    pub fn downgrade(&self) -> WeakContextRegistry {
        WeakContextRegistry {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

/// A non-owning handle to a [`ContextRegistry`].
#[derive(Clone)]
pub struct WeakContextRegistry {
    inner: std::rc::Weak<RefCell<RegistryInner>>,
}

impl WeakContextRegistry {
    /// Recovers the registry while it is still alive.
    pub fn upgrade(&self) -> Option<ContextRegistry> {
        self.inner.upgrade().map(|inner| ContextRegistry { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use archi_core::{ArrayLayout, SlotKey};
    use std::cell::RefCell as StdRefCell;

    type Journal = Rc<StdRefCell<Vec<String>>>;

    struct Recorder {
        journal: Journal,
    }

    impl ContextInterface for Recorder {
        fn name(&self) -> &'static str {
            "recorder"
        }

        fn init(&self, params: &ParamList) -> ArchiResult<Value> {
            let label = params
                .first("label")
                .and_then(|value| value.borrow_as::<String>().map(|s| s.clone()))
                .unwrap_or_default();
            self.journal.borrow_mut().push(format!("init {label}"));
            Ok(Value::data_of(label, ArrayLayout::of_type::<String>(1)))
        }

        fn finalize(&self, handle: &Value) {
            let label = handle
                .borrow_as::<String>()
                .map(|s| s.clone())
                .unwrap_or_default();
            self.journal.borrow_mut().push(format!("final {label}"));
        }
    }

    fn label_params(label: &str) -> ParamList {
        ParamList::new().with(
            "label",
            Value::data_of(label.to_owned(), ArrayLayout::of_type::<String>(1)),
        )
    }

    fn recorder(journal: &Journal) -> InterfaceHandle {
        Rc::new(Recorder {
            journal: journal.clone(),
        })
    }

    #[test]
    fn add_then_remove_calls_init_and_final_once() {
        let journal: Journal = Rc::new(StdRefCell::new(Vec::new()));
        let registry = ContextRegistry::new();

        registry
            .add("k", recorder(&journal), &label_params("k"))
            .unwrap();
        assert!(registry.contains("k"));

        registry.remove("k").unwrap();
        assert!(!registry.contains("k"));
        assert_eq!(*journal.borrow(), vec!["init k", "final k"]);
    }

    #[test]
    fn duplicate_keys_are_rejected_before_init() {
        let journal: Journal = Rc::new(StdRefCell::new(Vec::new()));
        let registry = ContextRegistry::new();

        registry
            .add("k", recorder(&journal), &label_params("first"))
            .unwrap();
        let err = registry
            .add("k", recorder(&journal), &label_params("second"))
            .unwrap_err();

        assert!(matches!(err, ArchiError::Misuse { .. }));
        // The duplicate never reached init.
        assert_eq!(*journal.borrow(), vec!["init first"]);
    }

    #[test]
    fn removing_an_absent_key_is_an_error() {
        let registry = ContextRegistry::new();
        assert!(matches!(
            registry.remove("ghost"),
            Err(ArchiError::Key { .. })
        ));
    }

    #[test]
    fn pinned_context_outlives_removal() {
        let journal: Journal = Rc::new(StdRefCell::new(Vec::new()));
        let registry = ContextRegistry::new();

        registry
            .add("k", recorder(&journal), &label_params("k"))
            .unwrap();
        let pinned = registry.handle_value("k").unwrap();

        registry.remove("k").unwrap();
        assert_eq!(*journal.borrow(), vec!["init k"], "still pinned");

        drop(pinned);
        assert_eq!(*journal.borrow(), vec!["init k", "final k"]);
    }

    #[test]
    fn teardown_finalizes_in_reverse_insertion_order() {
        let journal: Journal = Rc::new(StdRefCell::new(Vec::new()));
        let registry = ContextRegistry::new();

        for label in ["a", "b", "c"] {
            registry
                .add(label, recorder(&journal), &label_params(label))
                .unwrap();
        }
        drop(registry);

        assert_eq!(
            *journal.borrow(),
            vec!["init a", "init b", "init c", "final c", "final b", "final a"]
        );
    }

    #[test]
    fn dispatch_to_absent_entry_points() {
        let journal: Journal = Rc::new(StdRefCell::new(Vec::new()));
        let registry = ContextRegistry::new();
        registry
            .add("k", recorder(&journal), &label_params("k"))
            .unwrap();

        let context = registry.context("k").unwrap();
        assert!(matches!(
            context.get(&SlotKey::named("x")),
            Err(ArchiError::Interface { .. })
        ));
    }
}
