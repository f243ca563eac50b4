/*
 * @Author       : 老董
 * @Date         : 2026-02-11
 * @Description  : 门控计算用到的逐元素激活函数及其导数，以及对角（peephole）权重的按行缩放。
 *
 * 导数都以“激活后的值”为输入：
 *   sigmoid'(x) = v ⊙ (1 - v)，其中 v = sigmoid(x)
 *   tanh'(x)    = 1 - v²，     其中 v = tanh(x)
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use ndarray::{Array2, Axis, Zip};

impl Tensor {
    pub fn sigmoid(&self) -> Self {
        Self::from_array(self.data.mapv(|x| 1.0 / (1.0 + (-x).exp())))
    }

    pub fn tanh(&self) -> Self {
        Self::from_array(self.data.mapv(f32::tanh))
    }

    /// `self`须是 sigmoid 的输出
    pub fn sigmoid_derivative(&self) -> Self {
        Self::from_array(self.data.mapv(|v| v * (1.0 - v)))
    }

    /// `self`须是 tanh 的输出
    pub fn tanh_derivative(&self) -> Self {
        Self::from_array(self.data.mapv(|v| 1.0 - v * v))
    }

    /// 每一列都与列向量`column`逐元素相乘，即第`i`行整体乘以`column[i]`。
    /// 用于 peephole 权重：`Wc ⊙ c` 中的`Wc`只是一个对角矩阵。
    pub fn scale_rows_by(&self, column: &Self) -> Self {
        assert!(
            column.cols() == 1 && column.rows() == self.rows(),
            "{}",
            TensorError::OperatorError {
                operator: Operator::ColumnScale,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: column.shape().to_vec(),
            }
        );
        Self::from_array(&self.data * &column.data)
    }

    /// 按行求内积：结果为`[rows, 1]`，第`i`行为`Σ_j a[i, j] * b[i, j]`
    pub fn row_inner_product(a: &Self, b: &Self) -> Self {
        assert!(
            a.is_same_shape(b),
            "{}",
            TensorError::OperatorError {
                operator: Operator::InnerProduct,
                tensor1_shape: a.shape().to_vec(),
                tensor2_shape: b.shape().to_vec(),
            }
        );
        let mut result = Array2::zeros((a.rows(), 1));
        Zip::from(result.column_mut(0))
            .and(a.data.rows())
            .and(b.data.rows())
            .for_each(|r, x, y| *r = x.dot(&y));
        Self::from_array(result)
    }

    /// 对每一行求和（即把所有列相加），结果为`[rows, 1]`
    pub fn sum_columns(&self) -> Self {
        let sums = self.data.sum_axis(Axis(1));
        Self::from_array(sums.insert_axis(Axis(1)))
    }
}
