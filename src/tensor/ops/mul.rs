/*
 * @Author       : 老董
 * @Description  : 矩阵的乘法：这里的`*`是“逐元素”相乘（Hadamard积），矩阵乘法请用`mat_mul`。
 */

use crate::errors::Operator;
use crate::tensor::Tensor;
use std::ops::{Mul, MulAssign};

use super::add::assert_broadcastable;

impl Mul<f32> for &Tensor {
    type Output = Tensor;

    fn mul(self, scalar: f32) -> Tensor {
        Tensor::from_array(&self.data * scalar)
    }
}
impl Mul<f32> for Tensor {
    type Output = Self;

    fn mul(self, scalar: f32) -> Self {
        Self::from_array(self.data * scalar)
    }
}

impl<'a> Mul<&'a Tensor> for &'a Tensor {
    type Output = Tensor;

    fn mul(self, other: &'a Tensor) -> Tensor {
        assert_broadcastable(Operator::Mul, self, other);
        Tensor::from_array(&self.data * &other.data)
    }
}
impl Mul for Tensor {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        &self * &other
    }
}

impl<'a> MulAssign<&'a Self> for Tensor {
    fn mul_assign(&mut self, other: &'a Self) {
        assert_broadcastable(Operator::MulAssign, self, other);
        self.data *= &other.data;
    }
}

impl MulAssign<f32> for Tensor {
    fn mul_assign(&mut self, scalar: f32) {
        self.data *= scalar;
    }
}
