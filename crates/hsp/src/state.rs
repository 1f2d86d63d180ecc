//! States, frames, transitions and the control-flow directive.

use std::fmt;

use archi_core::{ArchiError, Value};

use crate::processor::StateProcessor;

/// A state function. Runs with the processor borrowed mutably and yields the
/// next control-flow directive as its return value.
pub type StateFunction = fn(&mut StateProcessor) -> Flow;

/// The transition hook. Called before every state invocation with the
/// incoming state, the prospective next state (stack top, absent when the
/// stack is empty), the status cell and the hook's own data. A non-`None`
/// return value overrides the next state without popping the stack.
pub type TransitionFunction = fn(
    current: Option<&State>,
    next: Option<&State>,
    status: &mut Option<ArchiError>,
    data: &Value,
) -> Option<State>;

/// One unit of execution: a function with its data and metadata.
///
/// A state is non-null by construction; absent states are `Option<State>`.
/// The metadata is carried for diagnostics only, the engine never looks
/// inside it.
#[derive(Clone)]
pub struct State {
    function: StateFunction,
    data: Value,
    metadata: Value,
}

impl State {
    /// Creates a state with empty data and metadata.
    pub fn new(function: StateFunction) -> Self {
        Self {
            function,
            data: Value::empty(),
            metadata: Value::empty(),
        }
    }

    /// Replaces the state data, consuming the state.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Replaces the state metadata, consuming the state.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the state function.
    pub fn function(&self) -> StateFunction {
        self.function
    }

    /// Returns the state data.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns the opaque metadata.
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("function", &(self.function as usize as *const ()))
            .field("data", &self.data)
            .finish()
    }
}

/// An immutable ordered bundle of states, pushed onto the stack atomically.
///
/// Element 0 ends up on top of the stack after a push. Null slots are
/// filtered at construction; a frame left without states pushes nothing.
#[derive(Clone, Default)]
pub struct Frame {
    states: Vec<State>,
    metadata: Value,
}

impl Frame {
    /// Creates an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frame from present states.
    pub fn of(states: Vec<State>) -> Self {
        Self {
            states,
            metadata: Value::empty(),
        }
    }

    /// Creates a frame from possibly-null slots, skipping the null ones.
    pub fn from_slots(slots: Vec<Option<State>>) -> Self {
        Self {
            states: slots.into_iter().flatten().collect(),
            metadata: Value::empty(),
        }
    }

    /// Replaces the frame metadata, consuming the frame.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the number of states in the frame.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Returns `true` when the frame holds no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Returns the bundled states in push order.
    pub fn states(&self) -> &[State] {
        &self.states
    }

    /// Returns the opaque frame metadata.
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("num_states", &self.states.len())
            .finish()
    }
}

/// The optional hook consulted before each state invocation.
#[derive(Clone)]
pub struct Transition {
    /// The hook function.
    pub function: TransitionFunction,
    /// Data handed to the hook on every call.
    pub data: Value,
}

impl Transition {
    /// Creates a transition with empty data.
    pub fn new(function: TransitionFunction) -> Self {
        Self {
            function,
            data: Value::empty(),
        }
    }

    /// Replaces the hook data, consuming the transition.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Control-flow directive returned by a state function.
#[derive(Debug)]
pub enum Flow {
    /// Return to the engine loop without touching the stack.
    /// Equivalent to `Advance { pop: 0, push: Frame::new() }`.
    Continue,
    /// Pop `pop` states, then push the frame (element 0 on top).
    Advance {
        /// Number of states popped off the stack.
        pop: usize,
        /// States pushed after popping.
        push: Frame,
    },
    /// Terminate the machine with a status, clearing the stack.
    Abort(ArchiError),
}

impl Flow {
    /// Builds an advance directive.
    pub fn advance(pop: usize, push: Frame) -> Self {
        Self::Advance { pop, push }
    }

    /// Builds a push-only advance directive.
    pub fn push(frame: Frame) -> Self {
        Self::Advance {
            pop: 0,
            push: frame,
        }
    }

    /// Builds an abort directive.
    pub fn abort(error: ArchiError) -> Self {
        Self::Abort(error)
    }
}
