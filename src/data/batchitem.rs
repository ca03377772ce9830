use burn::tensor::{backend::Backend, Int, Tensor};

#[derive(Clone, Debug)]
pub struct CsdiBatch<B: Backend> {
    pub indices: Tensor<B, 1, Int>,          // [N]
    pub observed_data: Tensor<B, 3>,         // [N, T, F]
    pub observed_mask: Tensor<B, 3>,         // [N, T, F]
    pub time_points: Tensor<B, 2>,           // [N, T]
    pub gt_mask: Tensor<B, 3>,               // [N, T, F]
    pub for_pattern_mask: Tensor<B, 3>,      // [N, T, F]
    pub cut_length: Tensor<B, 2, Int>,       // [N, C]
    pub labels: Option<Tensor<B, 1, Int>>,   // [N]
}
