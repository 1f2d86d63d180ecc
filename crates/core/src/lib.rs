//! # Archipelago core
//!
//! The value model underneath the Archipelago execution host. Everything the
//! registry, the replay engine and the state processor exchange is expressed
//! in the types of this crate:
//!
//! - [`Value`]: the universal polymorphic handle (data or function pointer,
//!   flags, element layout, optional ownership token);
//! - [`ReferenceCount`]: shared ownership with a destructor run exactly once
//!   when the last holder releases;
//! - [`ArrayLayout`]: packed array arithmetic with a poison value for
//!   invalid layouts;
//! - [`ParamList`] / [`SlotKey`]: keyword arguments and slot designators for
//!   context entry points;
//! - [`ArchiError`]: the status-code taxonomy shared by every subsystem.

pub mod error;
pub mod layout;
pub mod params;
pub mod refcount;
pub mod value;
pub mod verbosity;

pub use error::{exit_code, ArchiError, ArchiResult, EXIT_CODE_BASE};
pub use layout::{padded_size, ArrayLayout};
pub use params::{Param, ParamList, SlotKey};
pub use refcount::ReferenceCount;
pub use value::{DataRef, FunctionRef, Value, ValueFlags, ValueKind};
pub use verbosity::{Verbosity, VERBOSITY_MAX};
