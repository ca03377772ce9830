use burn::tensor::{backend::Backend, Tensor};

/// Mean of `x` over the positions where `mask` is non-zero, weighted by `mask`.
/// Values at masked-out positions never reach the sum, so NaN there is ignored.
pub fn masked_average<B: Backend, const D: usize>(x: Tensor<B, D>, mask: Tensor<B, D>) -> Tensor<B, 1> {
    let zeros = x.zeros_like();
    let keep = mask.clone().equal_elem(0.0).bool_not();
    let weighted = x * mask.clone();
    let weighted_tensor = zeros.mask_where(keep, weighted);
    let sum_weights = mask.sum().clamp_min(1.0);

    weighted_tensor.sum() / sum_weights
}

/// Mean absolute error restricted to `mask`, e.g. the indicating mask of the
/// values hidden for supervision.
pub fn masked_mae<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    targets: Tensor<B, D>,
    mask: Tensor<B, D>,
) -> Tensor<B, 1> {
    masked_average((predictions - targets).abs(), mask)
}

pub fn masked_mse<B: Backend, const D: usize>(
    predictions: Tensor<B, D>,
    targets: Tensor<B, D>,
    mask: Tensor<B, D>,
) -> Tensor<B, 1> {
    let residual = predictions - targets;
    masked_average(residual.clone() * residual, mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn mae_ignores_unmasked_positions() {
        let pred = Tensor::<TestBackend, 2>::from_floats([[1.0, 5.0], [3.0, 100.0]]);
        let target = Tensor::<TestBackend, 2>::from_floats([[2.0, 5.0], [1.0, 0.0]]);
        let mask = Tensor::<TestBackend, 2>::from_floats([[1.0, 1.0], [1.0, 0.0]]);

        let mae = masked_mae(pred, target, mask).into_data().value;
        assert!((mae[0] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn mse_over_masked_positions() {
        let pred = Tensor::<TestBackend, 2>::from_floats([[2.0, 0.0]]);
        let target = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0]]);
        let mask = Tensor::<TestBackend, 2>::from_floats([[1.0, 1.0]]);

        let mse = masked_mse(pred, target, mask).into_data().value;
        assert!((mse[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn empty_mask_yields_zero() {
        let x = Tensor::<TestBackend, 2>::from_floats([[f32::NAN, 3.0]]);
        let mask = Tensor::<TestBackend, 2>::from_floats([[0.0, 0.0]]);

        let avg = masked_average(x, mask).into_data().value;
        assert_eq!(avg[0], 0.0);
    }
}
