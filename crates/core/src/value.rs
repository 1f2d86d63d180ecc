//! The universal polymorphic value handle.
//!
//! A [`Value`] is the only currency exchanged between contexts: it wraps
//! either a shared data pointer or an opaque function record (a tagged sum,
//! never both), together with a flag set, an element layout describing the
//! pointee, and an optional ownership token. Consumers pattern-match on the
//! variant instead of inspecting a flag bit.
//!
//! No deep cloning of pointees happens anywhere; [`Value::clone`] clones the
//! pointer and the ownership token only.

use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::layout::ArrayLayout;
use crate::refcount::ReferenceCount;

/// Shared mutable data pointee.
pub type DataRef = Rc<RefCell<dyn Any>>;

/// Opaque function record; consumers downcast to a concrete `fn` type.
pub type FunctionRef = Rc<dyn Any>;

bitflags! {
    /// Flags qualifying a value.
    ///
    /// The data/function distinction of the original flag set is carried by
    /// the [`ValueKind`] discriminant instead of a bit.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ValueFlags: u32 {
        /// The pointee may be written through this value.
        const WRITABLE = 1 << 0;
    }
}

/// The active variant of a value: a data pointer or a function pointer.
#[derive(Clone)]
pub enum ValueKind {
    /// Possibly-absent shared data. An absent pointer still carries a
    /// meaningful layout (e.g. values that are bare element counts).
    Data(Option<DataRef>),
    /// A function record.
    Function(FunctionRef),
}

/// The universal polymorphic handle of the value model.
#[derive(Clone)]
pub struct Value {
    kind: ValueKind,
    flags: ValueFlags,
    layout: ArrayLayout,
    owner: Option<ReferenceCount>,
}

impl Value {
    /// Creates an empty data value: no pointee, unspecified layout.
    pub fn empty() -> Self {
        Self {
            kind: ValueKind::Data(None),
            flags: ValueFlags::empty(),
            layout: ArrayLayout::default(),
            owner: None,
        }
    }

    /// Creates a data value with no pointee but a meaningful layout.
    pub fn with_layout(layout: ArrayLayout) -> Self {
        Self {
            kind: ValueKind::Data(None),
            flags: ValueFlags::empty(),
            layout,
            owner: None,
        }
    }

    /// Creates a writable data value owning a freshly allocated pointee.
    pub fn data_of<T: Any>(data: T, layout: ArrayLayout) -> Self {
        let cell: DataRef = Rc::new(RefCell::new(data));
        Self {
            kind: ValueKind::Data(Some(cell)),
            flags: ValueFlags::WRITABLE,
            layout,
            owner: None,
        }
    }

    /// Creates a data value sharing an existing pointee.
    pub fn from_data_ref(data: DataRef, layout: ArrayLayout) -> Self {
        Self {
            kind: ValueKind::Data(Some(data)),
            flags: ValueFlags::WRITABLE,
            layout,
            owner: None,
        }
    }

    /// Creates a function value from any function record, typically a plain
    /// `fn` pointer type.
    pub fn function_of<F: Any>(function: F) -> Self {
        Self {
            kind: ValueKind::Function(Rc::new(function)),
            flags: ValueFlags::empty(),
            layout: ArrayLayout::of_count(1),
            owner: None,
        }
    }

    /// Attaches an ownership token, consuming the value.
    pub fn with_owner(mut self, owner: ReferenceCount) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Replaces the flag set, consuming the value.
    pub fn with_flags(mut self, flags: ValueFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Returns a read-only view of the same pointee (the ownership token is
    /// kept, the `WRITABLE` flag is cleared).
    pub fn read_only(mut self) -> Self {
        self.flags.remove(ValueFlags::WRITABLE);
        self
    }

    /// Returns the active variant.
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Returns the flag set.
    pub fn flags(&self) -> ValueFlags {
        self.flags
    }

    /// Returns the element layout of the pointee.
    pub fn layout(&self) -> ArrayLayout {
        self.layout
    }

    /// Returns the ownership token, if the value is owned.
    pub fn owner(&self) -> Option<&ReferenceCount> {
        self.owner.as_ref()
    }

    /// Returns `true` when the function variant is active.
    pub fn is_function(&self) -> bool {
        matches!(self.kind, ValueKind::Function(_))
    }

    /// Returns `true` for a data value with a live pointee.
    pub fn has_data(&self) -> bool {
        matches!(self.kind, ValueKind::Data(Some(_)))
    }

    /// Semantic equality: same active variant and same raw address.
    /// Layout, flags and ownership are ignored.
    pub fn same_target(&self, other: &Self) -> bool {
        match (&self.kind, &other.kind) {
            (ValueKind::Data(None), ValueKind::Data(None)) => true,
            (ValueKind::Data(Some(a)), ValueKind::Data(Some(b))) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            (ValueKind::Function(a), ValueKind::Function(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }

    /// Borrows the data pointee downcast to `T`.
    ///
    /// Returns `None` for function values, absent pointees, pointees of a
    /// different type, or a pointee already borrowed mutably.
    pub fn borrow_as<T: Any>(&self) -> Option<Ref<'_, T>> {
        match &self.kind {
            ValueKind::Data(Some(cell)) => {
                let borrow = cell.try_borrow().ok()?;
                Ref::filter_map(borrow, |any| any.downcast_ref::<T>()).ok()
            }
            _ => None,
        }
    }

    /// Mutably borrows the data pointee downcast to `T`.
    ///
    /// In addition to the [`Value::borrow_as`] conditions, the value must
    /// carry the `WRITABLE` flag.
    pub fn borrow_mut_as<T: Any>(&self) -> Option<RefMut<'_, T>> {
        if !self.flags.contains(ValueFlags::WRITABLE) {
            return None;
        }
        match &self.kind {
            ValueKind::Data(Some(cell)) => {
                let borrow = cell.try_borrow_mut().ok()?;
                RefMut::filter_map(borrow, |any| any.downcast_mut::<T>()).ok()
            }
            _ => None,
        }
    }

    /// Returns the function record downcast to `F` (typically a `fn` type).
    pub fn function_as<F: Any + Copy>(&self) -> Option<F> {
        match &self.kind {
            ValueKind::Function(record) => record.downcast_ref::<F>().copied(),
            _ => None,
        }
    }

    /// Returns the shared data pointee, if present.
    pub fn data_ref(&self) -> Option<&DataRef> {
        match &self.kind {
            ValueKind::Data(Some(cell)) => Some(cell),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match &self.kind {
            ValueKind::Data(None) => "data(null)",
            ValueKind::Data(Some(_)) => "data",
            ValueKind::Function(_) => "function",
        };
        f.debug_struct("Value")
            .field("kind", &variant)
            .field("flags", &self.flags)
            .field("layout", &self.layout)
            .field("owned", &self.owner.is_some())
            .finish()
    }
}
