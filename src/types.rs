//! Sample containers consumed by the consensus engine.
//!
//! Estimators never copy the caller's samples: single-list families borrow a
//! slice and correspondence families borrow an input slice and an output
//! slice, both for the lifetime of the estimator.

/// Indexed, read-only view over the samples of an estimation problem.
pub trait SampleData {
    /// Value handed to minimal solvers and residual functions.
    type Item: Copy;

    /// Number of samples.
    fn len(&self) -> usize;

    /// Sample at `index`. Panics when out of bounds, like slice indexing.
    fn get(&self, index: usize) -> Self::Item;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy the samples at `indices` into `out`, replacing its contents.
    fn gather(&self, indices: &[usize], out: &mut Vec<Self::Item>) {
        out.clear();
        out.extend(indices.iter().map(|&i| self.get(i)));
    }
}

impl<T: Copy> SampleData for &[T] {
    type Item = T;

    fn len(&self) -> usize {
        <[T]>::len(self)
    }

    fn get(&self, index: usize) -> T {
        self[index]
    }
}

/// Pairwise correspondences between an input list and an output list.
///
/// Both lists are borrowed; their lengths are validated by
/// [`Correspondences::new`].
#[derive(Debug)]
pub struct Correspondences<'a, I, O> {
    inputs: &'a [I],
    outputs: &'a [O],
}

// Manual impls: deriving would require `I: Clone`/`O: Clone` even though only
// the references are copied.
impl<I, O> Clone for Correspondences<'_, I, O> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I, O> Copy for Correspondences<'_, I, O> {}

impl<'a, I, O> Correspondences<'a, I, O> {
    /// Pair `inputs[i]` with `outputs[i]`. Returns `None` when the lengths differ.
    pub fn new(inputs: &'a [I], outputs: &'a [O]) -> Option<Self> {
        (inputs.len() == outputs.len()).then_some(Self { inputs, outputs })
    }

    pub fn inputs(&self) -> &'a [I] {
        self.inputs
    }

    pub fn outputs(&self) -> &'a [O] {
        self.outputs
    }
}

impl<I: Copy, O: Copy> SampleData for Correspondences<'_, I, O> {
    type Item = (I, O);

    fn len(&self) -> usize {
        self.inputs.len()
    }

    fn get(&self, index: usize) -> (I, O) {
        (self.inputs[index], self.outputs[index])
    }
}

#[cfg(test)]
mod tests {
    use super::{Correspondences, SampleData};

    #[test]
    fn correspondences_pair_inputs_with_outputs() {
        let inputs = [1, 2, 3];
        let outputs = [10.0, 20.0, 30.0];
        let data = Correspondences::new(&inputs, &outputs).unwrap();

        assert_eq!(data.len(), 3);
        assert_eq!(data.get(1), (2, 20.0));
        assert!(std::ptr::eq(data.inputs(), &inputs[..]));

        let mut gathered = Vec::new();
        data.gather(&[2, 0], &mut gathered);
        assert_eq!(gathered, vec![(3, 30.0), (1, 10.0)]);
    }

    #[test]
    fn correspondences_reject_length_mismatch() {
        let inputs = [1, 2, 3];
        let outputs = [1, 2];
        assert!(Correspondences::new(&inputs, &outputs).is_none());
    }

    #[test]
    fn slices_are_sample_data() {
        let values = [4u8, 5, 6];
        let data: &[u8] = &values;
        assert_eq!(SampleData::len(&data), 3);
        assert_eq!(SampleData::get(&data, 2), 6);
        assert!(!SampleData::is_empty(&data));
    }
}
