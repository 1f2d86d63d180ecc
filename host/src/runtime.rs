//! The boot/teardown glue: reserved contexts, blob application, library
//! declarations.

use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use archi_app::{apply_steps, Context, ContextRegistry, InterfaceHandle, InterfaceRegistry};
use archi_blob::{ConfigBlob, Serializable};
use archi_builtin::{
    builtin_interfaces, executable_symbols, interface_by_symbol, ExecutableInterface,
    InputFileInterface, RegistryInterface, SignalInterface, KEY_EXECUTABLE, KEY_INPUT_FILE,
    KEY_REGISTRY, KEY_SIGNAL,
};
use archi_core::{ArchiError, ArchiResult, ArrayLayout, ParamList, Value};
use tracing::{debug, info, warn};

/// Library keys treated as the executable itself; their interface symbols
/// resolve against the built-in tables instead of a loaded library.
const SELF_LIBRARY_PATHNAME: &str = "";

/// The live application: interface table, context registry, reserved
/// contexts, and the blob application loop.
pub struct Runtime {
    contexts: ContextRegistry,
    interfaces: InterfaceRegistry,
    /// Declared libraries: key -> pathname. Pathless entries alias the
    /// executable; anything else needs the library-loading collaborator.
    libraries: HashMap<String, String>,
    dry_run: bool,
}

impl Runtime {
    /// Boots the application: registers the built-in interfaces and the
    /// reserved `archi.registry` / `archi.executable` contexts.
    pub fn new(dry_run: bool) -> ArchiResult<Self> {
        let contexts = ContextRegistry::new();
        let mut interfaces = InterfaceRegistry::new();

        for (key, interface) in builtin_interfaces() {
            interfaces.register(key, interface)?;
        }
        debug!(count = interfaces.len(), "built-in interfaces registered");

        let registry_params = ParamList::new().with(
            "registry",
            Value::data_of(contexts.downgrade(), ArrayLayout::of_count(1)),
        );
        contexts.insert(Context::new(
            KEY_REGISTRY,
            Rc::new(RegistryInterface) as InterfaceHandle,
            &registry_params,
        )?)?;

        let symbol_params = ParamList::new().with(
            "symbols",
            Value::data_of(executable_symbols(), ArrayLayout::of_count(1)),
        );
        contexts.insert(Context::new(
            KEY_EXECUTABLE,
            Rc::new(ExecutableInterface) as InterfaceHandle,
            &symbol_params,
        )?)?;

        Ok(Self {
            contexts,
            interfaces,
            libraries: HashMap::new(),
            dry_run,
        })
    }

    /// Returns the context registry (for inspection by tests).
    pub fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    /// Reads, parses and applies one configuration blob file.
    pub fn apply_file(&mut self, path: &Path) -> ArchiResult<()> {
        info!(path = %path.display(), "applying configuration blob");

        let image = std::fs::read(path).map_err(|err| {
            ArchiError::resource(format!("cannot read `{}`: {err}", path.display()))
        })?;
        let blob = ConfigBlob::from_bytes(&image)?;
        self.apply_blob(&path.display().to_string(), image, &blob)
    }

    /// Applies a parsed blob: signal watch set, libraries, interfaces, then
    /// the configuration script. An error during the script replays undo
    /// within this blob only; earlier blobs stay committed.
    pub fn apply_blob(&mut self, path: &str, image: Vec<u8>, blob: &ConfigBlob) -> ArchiResult<()> {
        self.start_signal_watching(&blob.signals)?;
        self.refresh_input_file(path, image)?;

        for library in &blob.libraries {
            debug!(
                key = %library.key,
                pathname = %library.pathname,
                lazy = library.lazy,
                global = library.global,
                "library declared"
            );
            self.libraries
                .insert(library.key.clone(), library.pathname.clone());
        }

        for decl in &blob.interfaces {
            let pathname = self
                .libraries
                .get(&decl.library)
                .ok_or_else(|| ArchiError::key(decl.library.clone()))?;
            if pathname != SELF_LIBRARY_PATHNAME {
                // Opening shared libraries is the loader collaborator's
                // job; this host resolves only its own symbol table.
                return Err(ArchiError::resource(format!(
                    "shared library `{pathname}` cannot be opened by this host"
                )));
            }
            let interface = interface_by_symbol(&decl.symbol)
                .ok_or_else(|| ArchiError::key(decl.symbol.clone()))?;
            self.interfaces.register(decl.key.clone(), interface)?;
        }

        apply_steps(&self.contexts, &self.interfaces, &blob.steps, self.dry_run)
    }

    /// Registers the `archi.signal` context the first time a blob asks for
    /// signal watching. Later watch sets extend nothing; the original host
    /// unions them at startup, which this rendition does not need because
    /// the flags context is per-process anyway.
    fn start_signal_watching(&mut self, signals: &[i32]) -> ArchiResult<()> {
        if signals.is_empty() || self.contexts.contains(KEY_SIGNAL) {
            if !signals.is_empty() {
                warn!("signal watch set ignored: watching already active");
            }
            return Ok(());
        }

        info!(count = signals.len(), "signal watching requested");
        let params = ParamList::new().with(
            "signals",
            Value::data_of(signals.to_vec(), ArrayLayout::of_count(signals.len())),
        );
        self.contexts.insert(Context::new(
            KEY_SIGNAL,
            Rc::new(SignalInterface) as InterfaceHandle,
            &params,
        )?)
    }

    /// Replaces the `archi.input_file` context with the blob being applied.
    fn refresh_input_file(&mut self, path: &str, image: Vec<u8>) -> ArchiResult<()> {
        if self.contexts.contains(KEY_INPUT_FILE) {
            self.contexts.remove(KEY_INPUT_FILE)?;
        }

        let size = image.len();
        let params = ParamList::new()
            .with(
                "path",
                Value::data_of(path.to_owned(), ArrayLayout::of_count(1)),
            )
            .with(
                "data",
                Value::data_of(image, ArrayLayout::of_type::<u8>(size)).read_only(),
            );
        self.contexts.insert(Context::new(
            KEY_INPUT_FILE,
            Rc::new(InputFileInterface) as InterfaceHandle,
            &params,
        )?)
    }
}
