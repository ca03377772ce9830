use burn::data::dataloader::batcher::Batcher;
use burn::tensor::backend::Backend;
use burn::tensor::{Data, Int, Shape, Tensor};

use crate::data::batchitem::CsdiBatch;
use crate::data::csdiitem::CsdiItem;
use crate::data::series::SeriesArray;

/// Collates [`CsdiItem`]s into a [`CsdiBatch`] on `device`.
pub struct CsdiBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> CsdiBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack_series<F>(&self, items: &[CsdiItem], field: F) -> Tensor<B, 3>
    where
        F: Fn(&CsdiItem) -> &SeriesArray,
    {
        let [n_steps, n_features] = items.first().map(|i| field(i).shape()).unwrap_or([0, 0]);
        let values: Vec<f32> = items
            .iter()
            .flat_map(|item| field(item).values().iter().copied())
            .collect();

        let data = Data::new(
            values,
            Shape {
                dims: [items.len(), n_steps, n_features],
            },
        );
        let tensor: Tensor<B, 3> = Tensor::from_data(data.convert());
        tensor.to_device(&self.device)
    }

    fn int_vector(&self, values: Vec<i64>) -> Tensor<B, 1, Int> {
        let len = values.len();
        let data = Data::new(values, Shape { dims: [len] });
        let tensor: Tensor<B, 1, Int> = Tensor::from_data(data.convert());
        tensor.to_device(&self.device)
    }
}

impl<B: Backend> Batcher<CsdiItem, CsdiBatch<B>> for CsdiBatcher<B> {
    fn batch(&self, items: Vec<CsdiItem>) -> CsdiBatch<B> {
        let batch_size = items.len();
        let n_steps = items.first().map(|i| i.time_points.len()).unwrap_or(0);

        let indices = self.int_vector(items.iter().map(|i| i.index as i64).collect());

        let observed_data = self.stack_series(&items, |i| &i.observed_data);
        let observed_mask = self.stack_series(&items, |i| &i.observed_mask);
        let gt_mask = self.stack_series(&items, |i| &i.gt_mask);
        let for_pattern_mask = self.stack_series(&items, |i| &i.for_pattern_mask);

        let time_points = {
            let values: Vec<f32> = items
                .iter()
                .flat_map(|i| i.time_points.iter().copied())
                .collect();
            let data = Data::new(
                values,
                Shape {
                    dims: [batch_size, n_steps],
                },
            );
            let tensor: Tensor<B, 2> = Tensor::from_data(data.convert());
            tensor.to_device(&self.device)
        };

        // cut lengths may differ in width across samples; right-pad with zeros
        let cut_length = {
            let width = items.iter().map(|i| i.cut_length.len()).max().unwrap_or(0);
            let values: Vec<i64> = items
                .iter()
                .flat_map(|i| {
                    let mut row = i.cut_length.clone();
                    row.resize(width, 0);
                    row
                })
                .collect();
            let data = Data::new(
                values,
                Shape {
                    dims: [batch_size, width],
                },
            );
            let tensor: Tensor<B, 2, Int> = Tensor::from_data(data.convert());
            tensor.to_device(&self.device)
        };

        let labels: Option<Vec<i64>> = items.iter().map(|i| i.label).collect();
        let labels = labels
            .filter(|l| !l.is_empty())
            .map(|l| self.int_vector(l));

        CsdiBatch {
            indices,
            observed_data,
            observed_mask,
            time_points,
            gt_mask,
            for_pattern_mask,
            cut_length,
            labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn item(index: usize, label: Option<i64>, cut_length: Vec<i64>) -> CsdiItem {
        let data = SeriesArray::new((0..6).map(|v| (v + index) as f32).collect(), 3, 2).unwrap();
        let mask = SeriesArray::filled(1.0, 3, 2);
        CsdiItem {
            index,
            observed_data: data,
            observed_mask: mask.clone(),
            time_points: vec![0.0, 1.0, 2.0],
            gt_mask: mask.clone(),
            for_pattern_mask: mask,
            cut_length,
            label,
        }
    }

    #[test]
    fn batch_shapes() {
        let batcher = CsdiBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![
            item(0, Some(1), vec![0, 0, 0]),
            item(5, Some(0), vec![0, 0, 0]),
        ]);

        assert_eq!(batch.observed_data.dims(), [2, 3, 2]);
        assert_eq!(batch.observed_mask.dims(), [2, 3, 2]);
        assert_eq!(batch.gt_mask.dims(), [2, 3, 2]);
        assert_eq!(batch.for_pattern_mask.dims(), [2, 3, 2]);
        assert_eq!(batch.time_points.dims(), [2, 3]);
        assert_eq!(batch.cut_length.dims(), [2, 3]);
        assert_eq!(batch.indices.into_data().value, vec![0, 5]);
        assert_eq!(batch.labels.unwrap().into_data().value, vec![1, 0]);

        let values = batch.observed_data.into_data().value;
        assert_eq!(values[6], 5.0);
    }

    #[test]
    fn labels_dropped_when_any_item_lacks_one() {
        let batcher = CsdiBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![item(0, Some(1), vec![0]), item(1, None, vec![0])]);
        assert!(batch.labels.is_none());
    }

    #[test]
    fn ragged_cut_lengths_are_padded() {
        let batcher = CsdiBatcher::<TestBackend>::new(Default::default());
        let batch = batcher.batch(vec![item(0, None, vec![2]), item(1, None, vec![1, 1])]);

        assert_eq!(batch.cut_length.dims(), [2, 2]);
        assert_eq!(batch.cut_length.into_data().value, vec![2, 0, 1, 1]);
    }
}
