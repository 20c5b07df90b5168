//! Explicit dataset session; the engine never reads ambient process state.

use crate::model::{ComputeInput, DataSet};

/// Holds the datasets for one computation, with an explicit
/// create / replace / clear lifecycle. The engine receives the input by
/// reference and returns its result; nothing is shared between runs.
#[derive(Debug, Default)]
pub struct Session {
    input: ComputeInput,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one parsed file. Source file indices follow load order.
    pub fn load(&mut self, dataset: DataSet) {
        self.input.datasets.push(dataset);
    }

    /// Swap in a new set of files, keeping any loaded filter data.
    pub fn replace(&mut self, datasets: Vec<DataSet>) {
        self.input.datasets = datasets;
    }

    pub fn set_filter_data(&mut self, dataset: DataSet) {
        self.input.filter_data = Some(dataset);
    }

    /// Drop everything, returning the session to its freshly-created state.
    pub fn clear(&mut self) {
        self.input = ComputeInput::default();
    }

    pub fn dataset_count(&self) -> usize {
        self.input.datasets.len()
    }

    pub fn input(&self) -> &ComputeInput {
        &self.input
    }
}
