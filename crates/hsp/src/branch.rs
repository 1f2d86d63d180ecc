//! Execution-branching state functions.
//!
//! [`advance_state`] pushes the frame found in its state data;
//! [`branch_state`] selects one of several branch frames through a selector
//! function. Both make data-driven control flow expressible without writing
//! a dedicated state function per branch.

use archi_core::{ArrayLayout, Value};

use crate::processor::StateProcessor;
use crate::state::{Flow, Frame};

/// Selects a branch index out of `num_branches`. An out-of-range result
/// makes the branch state a no-op.
pub type BranchSelector = fn(num_branches: usize, data: &Value) -> usize;

/// Data of a [`branch_state`]: the candidate frames and the selector.
#[derive(Clone, Default)]
pub struct BranchData {
    branches: Vec<Frame>,
    selector: Option<BranchSelector>,
    selector_data: Value,
}

impl BranchData {
    /// Creates branch data with `num_branches` empty branches and no
    /// selector (branch 0 is then taken unconditionally).
    pub fn new(num_branches: usize) -> Self {
        Self {
            branches: vec![Frame::new(); num_branches],
            selector: None,
            selector_data: Value::empty(),
        }
    }

    /// Installs the selector, consuming the data.
    pub fn with_selector(mut self, selector: BranchSelector, data: Value) -> Self {
        self.selector = Some(selector);
        self.selector_data = data;
        self
    }

    /// Replaces the frame of branch `index`. Out-of-range indices are
    /// ignored.
    pub fn set_branch(&mut self, index: usize, frame: Frame) {
        if let Some(slot) = self.branches.get_mut(index) {
            *slot = frame;
        }
    }

    /// Returns the number of branches.
    pub fn num_branches(&self) -> usize {
        self.branches.len()
    }

    /// Returns the frame of branch `index`.
    pub fn branch(&self, index: usize) -> Option<&Frame> {
        self.branches.get(index)
    }

    /// Wraps the data into a state-data value.
    pub fn into_value(self) -> Value {
        Value::data_of(self, ArrayLayout::of_type::<BranchData>(1))
    }
}

/// State function that pushes the [`Frame`] held in its state data.
/// Missing or mistyped data makes it a plain no-op state.
pub fn advance_state(processor: &mut StateProcessor) -> Flow {
    let frame = processor
        .current_state()
        .and_then(|state| state.data().borrow_as::<Frame>())
        .map(|frame| frame.clone());

    match frame {
        Some(frame) => Flow::push(frame),
        None => Flow::Continue,
    }
}

/// State function that runs the selector of its [`BranchData`] and pushes
/// the selected branch frame. No data, zero branches or an out-of-range
/// selection make it a no-op.
pub fn branch_state(processor: &mut StateProcessor) -> Flow {
    let selected = {
        let Some(data) = processor
            .current_state()
            .and_then(|state| state.data().borrow_as::<BranchData>())
        else {
            return Flow::Continue;
        };

        if data.num_branches() == 0 {
            return Flow::Continue;
        }

        let index = match data.selector {
            Some(selector) => selector(data.num_branches(), &data.selector_data),
            None => 0,
        };
        data.branch(index).cloned()
    };

    match selected {
        Some(frame) => Flow::push(frame),
        None => Flow::Continue,
    }
}

/// Selector that always takes branch 0.
pub fn select_first(_num_branches: usize, _data: &Value) -> usize {
    0
}

/// Selector that reads the branch index from its data (`usize` pointee);
/// missing data selects branch 0.
pub fn select_unconditional(_num_branches: usize, data: &Value) -> usize {
    data.borrow_as::<usize>().map_or(0, |index| *index)
}

/// Loop counter for [`select_loop`].
#[derive(Debug, Clone, Default)]
pub struct LoopSelector {
    /// Number of times branch 0 is taken before falling through.
    pub num_iterations: usize,
    /// Current iteration, reset when the loop exits.
    pub iteration: usize,
}

impl LoopSelector {
    /// Creates a counter for `num_iterations` loop passes.
    pub fn new(num_iterations: usize) -> Self {
        Self {
            num_iterations,
            iteration: 0,
        }
    }
}

/// Selector driving a counted loop: takes branch 0 for the configured
/// number of iterations, then branch 1 once, resetting the counter.
pub fn select_loop(_num_branches: usize, data: &Value) -> usize {
    let Some(mut counter) = data.borrow_mut_as::<LoopSelector>() else {
        return 1;
    };

    if counter.iteration < counter.num_iterations {
        counter.iteration += 1;
        0
    } else {
        counter.iteration = 0;
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;
    use crate::StateProcessor;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Trace = Rc<RefCell<Vec<&'static str>>>;

    fn trace_value(trace: &Trace) -> Value {
        Value::data_of(trace.clone(), ArrayLayout::of_type::<Trace>(1))
    }

    fn trace_of(processor: &StateProcessor) -> Trace {
        processor
            .current_state()
            .and_then(|state| state.data().borrow_as::<Trace>())
            .map(|trace| trace.clone())
            .expect("state data must hold a trace")
    }

    fn log_x(processor: &mut StateProcessor) -> Flow {
        trace_of(processor).borrow_mut().push("X");
        Flow::Continue
    }

    fn log_y(processor: &mut StateProcessor) -> Flow {
        trace_of(processor).borrow_mut().push("Y");
        Flow::Continue
    }

    fn log_z(processor: &mut StateProcessor) -> Flow {
        trace_of(processor).borrow_mut().push("Z");
        Flow::Continue
    }

    #[test]
    fn advance_state_pushes_its_frame() {
        let trace: Trace = Rc::new(RefCell::new(Vec::new()));
        let inner = Frame::of(vec![State::new(log_x).with_data(trace_value(&trace))]);
        let entry = Frame::of(vec![State::new(advance_state)
            .with_data(Value::data_of(inner, ArrayLayout::of_type::<Frame>(1)))]);

        StateProcessor::execute(&entry, None).unwrap();
        assert_eq!(*trace.borrow(), vec!["X"]);
    }

    #[test]
    fn advance_state_without_data_is_a_no_op() {
        let entry = Frame::of(vec![State::new(advance_state)]);
        assert!(StateProcessor::execute(&entry, None).is_ok());
    }

    #[test]
    fn branch_selects_the_indexed_target() {
        let trace: Trace = Rc::new(RefCell::new(Vec::new()));

        let mut data = BranchData::new(3).with_selector(
            select_unconditional,
            Value::data_of(1usize, ArrayLayout::of_type::<usize>(1)),
        );
        data.set_branch(
            0,
            Frame::of(vec![State::new(log_x).with_data(trace_value(&trace))]),
        );
        data.set_branch(
            1,
            Frame::of(vec![State::new(log_y).with_data(trace_value(&trace))]),
        );
        data.set_branch(
            2,
            Frame::of(vec![State::new(log_z).with_data(trace_value(&trace))]),
        );

        let entry = Frame::of(vec![State::new(branch_state).with_data(data.into_value())]);
        StateProcessor::execute(&entry, None).unwrap();
        assert_eq!(*trace.borrow(), vec!["Y"]);
    }

    #[test]
    fn out_of_range_selection_is_a_no_op() {
        let trace: Trace = Rc::new(RefCell::new(Vec::new()));

        let mut data = BranchData::new(1).with_selector(
            select_unconditional,
            Value::data_of(5usize, ArrayLayout::of_type::<usize>(1)),
        );
        data.set_branch(
            0,
            Frame::of(vec![State::new(log_x).with_data(trace_value(&trace))]),
        );

        let entry = Frame::of(vec![State::new(branch_state).with_data(data.into_value())]);
        StateProcessor::execute(&entry, None).unwrap();
        assert!(trace.borrow().is_empty());
    }

    #[test]
    fn loop_selector_counts_iterations() {
        let counter = Value::data_of(LoopSelector::new(2), ArrayLayout::of_type::<LoopSelector>(1));
        assert_eq!(select_loop(2, &counter), 0);
        assert_eq!(select_loop(2, &counter), 0);
        assert_eq!(select_loop(2, &counter), 1);
        // The counter reset; the loop can run again.
        assert_eq!(select_loop(2, &counter), 0);
    }

    #[test]
    fn loop_branch_repeats_a_body() {
        let trace: Trace = Rc::new(RefCell::new(Vec::new()));
        let counter = Value::data_of(LoopSelector::new(2), ArrayLayout::of_type::<LoopSelector>(1));

        let mut data = BranchData::new(2).with_selector(select_loop, counter);

        // Branch 0: run the body, then re-enter the branch state.
        // The branch state itself is rebuilt inside the frame, so the data
        // value is shared.
        let data_value = {
            data.set_branch(
                1,
                Frame::of(vec![State::new(log_z).with_data(trace_value(&trace))]),
            );
            let shared = Rc::new(RefCell::new(data));
            Value::from_data_ref(shared, ArrayLayout::of_type::<BranchData>(1))
        };

        // Rebuild branch 0 now that the shared value exists.
        {
            let mut borrowed = data_value.borrow_mut_as::<BranchData>().unwrap();
            borrowed.set_branch(
                0,
                Frame::of(vec![
                    State::new(log_x).with_data(trace_value(&trace)),
                    State::new(branch_state).with_data(data_value.clone()),
                ]),
            );
        }

        let entry = Frame::of(vec![State::new(branch_state).with_data(data_value.clone())]);
        StateProcessor::execute(&entry, None).unwrap();
        assert_eq!(*trace.borrow(), vec!["X", "X", "Z"]);
    }
}
