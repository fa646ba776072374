//! The parameter averaging primitive.

use crate::error::{AveragingError, Result};
use crate::group::{ProcessGroup, ReduceOp};
use crate::model::ParameterSet;

/// Averages `model`'s parameters in place across all ranks of `group`.
///
/// The parameter tensors are packed into one contiguous buffer, reduced
/// with a single mean all-reduce, and unpacked back into the tensors. On
/// success every rank in the group holds the element-wise mean of the
/// group's parameters, up to floating-point reduction order.
///
/// The call blocks until every rank of the group has reached its
/// corresponding call. It is issued even when the model has no parameters,
/// so that ranks with empty models keep their collective cadence matched.
///
/// # Errors
///
/// Communication failures from the group propagate unmodified; there is
/// no retry. After a failed collective, parameters may be partially
/// reduced on some ranks, and the caller is expected to abort the run.
pub fn average_parameters(model: &mut dyn ParameterSet, group: &dyn ProcessGroup) -> Result<()> {
    let mut flat = flatten_parameters(model);
    group.all_reduce(&mut flat, ReduceOp::Mean)?;
    unflatten_parameters(model, &flat)
}

/// Packs all parameter tensors into one contiguous buffer.
pub fn flatten_parameters(model: &dyn ParameterSet) -> Vec<f32> {
    let mut flat = Vec::with_capacity(model.num_elements());
    for tensor in model.parameters() {
        flat.extend_from_slice(tensor);
    }
    flat
}

/// Unpacks `flat` back into the model's parameter tensors.
///
/// # Errors
///
/// Returns a shape error if `flat` does not hold exactly
/// `model.num_elements()` values.
pub fn unflatten_parameters(model: &mut dyn ParameterSet, flat: &[f32]) -> Result<()> {
    let expected = model.num_elements();
    if flat.len() != expected {
        return Err(AveragingError::shape(expected, flat.len()));
    }

    let mut offset = 0;
    for tensor in model.parameters_mut() {
        tensor.copy_from_slice(&flat[offset..offset + tensor.len()]);
        offset += tensor.len();
    }
    Ok(())
}
