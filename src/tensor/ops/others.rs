use crate::tensor::Tensor;
use approx::AbsDiffEq;
use std::cmp::PartialEq;

impl From<f32> for Tensor {
    /// 实现 From<f32> trait 用于将`f32`类型转换为形状为`[1, 1]`的矩阵
    fn from(scalar: f32) -> Self {
        Self::new(&[scalar], &[1, 1])
    }
}

impl PartialEq for Tensor {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl AbsDiffEq for Tensor {
    type Epsilon = f32;

    fn default_epsilon() -> f32 {
        f32::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f32) -> bool {
        self.is_same_shape(other)
            && self
                .data
                .iter()
                .zip(other.data.iter())
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl Tensor {
    /// 对矩阵中的所有元素求和
    pub fn sum(&self) -> f32 {
        self.data.sum()
    }

    /// Frobenius 范数，调试日志里用来观察各缓冲区的量级
    pub fn frobenius_norm(&self) -> f32 {
        self.data.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// 是否存在 NaN（哨兵值）
    pub fn has_nan(&self) -> bool {
        self.data.iter().any(|x| x.is_nan())
    }
}
