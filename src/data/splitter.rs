// ============================================================
// Layer 4: Train/Validation Splitter
// ============================================================
// Carves the validation partition out of the concatenated
// training pool at a fixed offset:
//
//   pool:  [0 ........ K) [K ..................... N)
//           validation      train
//
// There is no shuffle. The same files always give the same
// partitions, which keeps runs reproducible.

use crate::domain::error::TrainError;

/// Split `pool` into (train, validation): the first `validation_size`
/// rows become validation, the rest become train.
///
/// The training partition must end up strictly larger than the
/// validation partition.
pub fn split_validation<T>(
    mut pool: Vec<T>,
    validation_size: usize,
) -> Result<(Vec<T>, Vec<T>), TrainError> {
    let total = pool.len();
    if validation_size == 0 {
        return Err(TrainError::InvalidConfig(
            "validation size must be at least 1".to_string(),
        ));
    }
    if validation_size >= total || total - validation_size <= validation_size {
        return Err(TrainError::InvalidConfig(format!(
            "validation size {validation_size} leaves no larger training partition \
             out of {total} images"
        )));
    }

    // split_off(k) keeps [0..k) in `pool` and returns [k..total)
    let train = pool.split_off(validation_size);

    tracing::debug!(
        "Dataset split: {} training, {} validation",
        train.len(),
        pool.len()
    );

    Ok((train, pool))
}
