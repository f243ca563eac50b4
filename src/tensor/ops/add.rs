/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-11 10:12:03
 * @Description  : 矩阵的加法，实现了两个矩阵“逐元素”（或矩阵与纯数）相加的运算。
 *                 右操作数允许是行数相同的列向量`[rows, 1]`，此时会被广播到每一列（用于加偏置）。
 */

use crate::errors::{Operator, TensorError};
use crate::tensor::Tensor;
use std::ops::{Add, AddAssign};

/// 右操作数与左操作数形状一致，或是可以按列广播的`[rows, 1]`
pub(in crate::tensor) fn assert_broadcastable(operator: Operator, lhs: &Tensor, rhs: &Tensor) {
    let ok = lhs.is_same_shape(rhs) || (rhs.cols() == 1 && rhs.rows() == lhs.rows());
    assert!(
        ok,
        "{}",
        TensorError::OperatorError {
            operator,
            tensor1_shape: lhs.shape().to_vec(),
            tensor2_shape: rhs.shape().to_vec(),
        }
    );
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓矩阵 + f32↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl Add<f32> for &Tensor {
    type Output = Tensor;

    fn add(self, scalar: f32) -> Tensor {
        Tensor::from_array(&self.data + scalar)
    }
}
impl Add<f32> for Tensor {
    type Output = Self;

    fn add(self, scalar: f32) -> Self {
        Self::from_array(self.data + scalar)
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑矩阵 + f32↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓（不）带引用的矩阵 +（不）带引用的矩阵↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
impl<'a> Add<&'a Tensor> for &'a Tensor {
    type Output = Tensor;

    fn add(self, other: &'a Tensor) -> Tensor {
        assert_broadcastable(Operator::Add, self, other);
        Tensor::from_array(&self.data + &other.data)
    }
}
impl Add for Tensor {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        &self + &other
    }
}
impl<'a> Add<&'a Self> for Tensor {
    type Output = Self;

    fn add(mut self, other: &'a Self) -> Self {
        self += other;
        self
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑（不）带引用的矩阵 +（不）带引用的矩阵↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

impl<'a> AddAssign<&'a Self> for Tensor {
    fn add_assign(&mut self, other: &'a Self) {
        assert_broadcastable(Operator::AddAssign, self, other);
        self.data += &other.data;
    }
}

impl AddAssign for Tensor {
    fn add_assign(&mut self, other: Self) {
        *self += &other;
    }
}

impl AddAssign<f32> for Tensor {
    fn add_assign(&mut self, scalar: f32) {
        self.data += scalar;
    }
}
