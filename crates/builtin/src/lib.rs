//! # Archipelago built-in context interfaces
//!
//! The interfaces every configuration can rely on without loading a single
//! shared library: the state processor and its frame/branch builders, a
//! value array, a string-to-number converter, and the reserved host
//! contexts (`archi.registry`, `archi.executable`, `archi.input_file`,
//! `archi.signal`).

pub mod array;
pub mod branch;
pub mod convert;
pub mod exe;
pub mod hsp;

mod util;

pub use array::ArrayInterface;
pub use branch::BranchInterface;
pub use convert::StringToNumberInterface;
pub use exe::{
    executable_symbols, ExecutableInterface, InputFileInterface, RegistryInterface,
    SignalInterface, KEY_EXECUTABLE, KEY_INPUT_FILE, KEY_REGISTRY, KEY_SIGNAL,
};
pub use hsp::{FrameInterface, HspInterface};

use archi_app::InterfaceHandle;
use std::rc::Rc;

/// Returns the built-in interfaces with their registry keys, in
/// registration order.
pub fn builtin_interfaces() -> Vec<(&'static str, InterfaceHandle)> {
    vec![
        ("archi.hsp", Rc::new(HspInterface) as InterfaceHandle),
        ("archi.hsp.frame", Rc::new(FrameInterface)),
        ("archi.hsp.branch", Rc::new(BranchInterface)),
        ("archi.array", Rc::new(ArrayInterface)),
        (
            "archi.convert.string_to_number",
            Rc::new(StringToNumberInterface),
        ),
    ]
}

/// Resolves an interface vtable symbol of the executable itself, the way a
/// shared library's exported interface symbols would be resolved.
pub fn interface_by_symbol(symbol: &str) -> Option<InterfaceHandle> {
    match symbol {
        "archi_hsp_interface" => Some(Rc::new(HspInterface) as InterfaceHandle),
        "archi_hsp_frame_interface" => Some(Rc::new(FrameInterface)),
        "archi_hsp_branch_interface" => Some(Rc::new(BranchInterface)),
        "archi_array_interface" => Some(Rc::new(ArrayInterface)),
        "archi_string_to_number_interface" => Some(Rc::new(StringToNumberInterface)),
        _ => None,
    }
}
