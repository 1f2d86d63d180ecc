//! The state processor execution loop.

use archi_core::{ArchiError, ArchiResult};
use tracing::trace;

use crate::state::{Flow, Frame, State, Transition};

const INITIAL_STACK_CAPACITY: usize = 32;

/// Execution context of one [`StateProcessor::execute`] call.
///
/// Owns the current state, the optional transition hook, the state stack and
/// the status cell. Created at the top of `execute`, destroyed on return;
/// it never outlives that call. The processor is strictly single-threaded:
/// exactly one state function is active at any time, and the processor must
/// only be touched from its owning thread.
pub struct StateProcessor {
    current: Option<State>,
    transition: Option<Transition>,
    stack: Vec<State>,
    status: Option<ArchiError>,
}

impl StateProcessor {
    /// Runs the machine: pushes the entry frame and executes states until
    /// the stack drains or the status cell becomes non-zero.
    ///
    /// An empty entry frame is a no-op returning success.
    pub fn execute(entry: &Frame, transition: Option<Transition>) -> ArchiResult<()> {
        if entry.is_empty() {
            return Ok(());
        }

        let mut processor = Self {
            current: None,
            transition,
            stack: Vec::with_capacity(INITIAL_STACK_CAPACITY),
            status: None,
        };
        processor.splice(entry);
        processor.run();

        match processor.status {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    /// Returns the state currently executing. `None` only before the first
    /// state is entered.
    pub fn current_state(&self) -> Option<&State> {
        self.current.as_ref()
    }

    /// Returns the number of states on the stack, not counting the state
    /// currently executing.
    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns the status cell.
    pub fn status(&self) -> Option<&ArchiError> {
        self.status.as_ref()
    }

    /// Returns the numeric status code, `0` while no error is set.
    pub fn status_code(&self) -> i32 {
        self.status.as_ref().map_or(0, ArchiError::code)
    }

    /// Pushes a frame: states go on in reverse index order, so that element
    /// 0 becomes the new stack top.
    fn splice(&mut self, frame: &Frame) {
        self.stack.reserve(frame.len());
        for state in frame.states().iter().rev() {
            self.stack.push(state.clone());
        }
    }

    /// Consults the transition hook and selects the next state.
    ///
    /// `None` means the machine terminates (either the hook set a non-zero
    /// status, or no override was produced and the stack is empty).
    fn next_state(&mut self) -> Option<State> {
        let mut override_state = None;
        if let Some(transition) = &self.transition {
            let hook = transition.function;
            override_state = hook(
                self.current.as_ref(),
                self.stack.last(),
                &mut self.status,
                &transition.data,
            );
        }

        if self.status.is_some() {
            return None;
        }

        // A hook override replaces the next state without popping.
        match override_state {
            Some(state) => Some(state),
            None => self.stack.pop(),
        }
    }

    fn run(&mut self) {
        while self.status.is_none() {
            let Some(next) = self.next_state() else {
                break;
            };

            trace!(depth = self.stack.len(), "entering state");
            self.current = Some(next);

            // The directive is the state function's return value; nothing
            // runs in the state after it is produced.
            let function = match &self.current {
                Some(state) => state.function(),
                None => break,
            };
            let flow = function(self);
            self.apply(flow);
        }
    }

    /// Applies a control-flow directive to the stack.
    fn apply(&mut self, flow: Flow) {
        match flow {
            Flow::Continue => {}
            Flow::Advance { pop, push } => {
                if pop > self.stack.len() {
                    self.abort(ArchiError::misuse(format!(
                        "advance pops {pop} states but the stack holds {}",
                        self.stack.len()
                    )));
                    return;
                }
                self.stack.truncate(self.stack.len() - pop);
                self.splice(&push);
            }
            Flow::Abort(error) => self.abort(error),
        }
    }

    /// Terminates the machine: sets the status and clears the stack, which
    /// guarantees exit on the next loop iteration.
    fn abort(&mut self, error: ArchiError) {
        trace!(code = error.code(), "state processor aborted");
        self.status = Some(error);
        self.stack.clear();
    }
}
