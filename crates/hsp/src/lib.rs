//! # Archipelago hierarchical state processor
//!
//! A single-threaded cooperative execution engine. States are
//! `(function, data, metadata)` triples kept on an explicit stack owned by a
//! [`StateProcessor`]; an optional transition hook is consulted before every
//! state invocation and may substitute the next state or terminate the
//! machine.
//!
//! A state function yields control by *returning* a [`Flow`] directive:
//! `Continue` (equivalent to `Advance { pop: 0, push: empty }`), `Advance`
//! (pop N states, push a frame atomically) or `Abort` (terminate with a
//! status, clearing the stack). Because the directive is the return value,
//! no code can run after an advance; the non-local-return contract of the
//! engine holds without unwinding.

pub mod branch;
pub mod processor;
pub mod state;

pub use branch::{
    advance_state, branch_state, select_first, select_loop, select_unconditional, BranchData,
    BranchSelector, LoopSelector,
};
pub use processor::StateProcessor;
pub use state::{Flow, Frame, State, StateFunction, Transition, TransitionFunction};
