use ndarray::linalg::general_mat_mul;

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;

impl Tensor {
    /// 实现矩阵乘法`self · other`。
    /// 需要保证前一个矩阵的列数（col）等于后一个矩阵的行数（row），否则会触发panic。
    pub fn mat_mul(&self, other: &Self) -> Self {
        let mut result = Self::zeros(&[self.rows(), other.cols()]);
        multiply_and_add(self, false, other, false, &mut result);
        result
    }
}

/// `c += op(a) · op(b)`，其中`op`按`transpose_*`决定是否转置。
///
/// BPTT 里几乎所有的梯度都是“逐帧累加”的，例如`grdToWho += grdBeforeGo · prevOutputᵀ`、
/// `grdToObs += Wxoᵀ · grdBeforeGo`，所以这里直接提供带累加的版本，避免中间矩阵。
pub fn multiply_and_add(a: &Tensor, transpose_a: bool, b: &Tensor, transpose_b: bool, c: &mut Tensor) {
    let a_view = if transpose_a { a.data.t() } else { a.data.view() };
    let b_view = if transpose_b { b.data.t() } else { b.data.view() };

    let (m, k1) = a_view.dim();
    let (k2, n) = b_view.dim();
    assert!(
        k1 == k2 && c.shape() == [m, n],
        "{}",
        TensorError::OperatorError {
            operator: Operator::MatMul,
            tensor1_shape: vec![m, k1],
            tensor2_shape: vec![k2, n],
        }
    );

    general_mat_mul(1.0, &a_view, &b_view, 1.0, &mut c.data);
}
