use crate::errors::Operator;
use crate::tensor::Tensor;
use std::ops::{Sub, SubAssign};

use super::add::assert_broadcastable;

// f32 - 矩阵，常用于`1 - v`这类导数计算
impl<'a> Sub<&'a Tensor> for f32 {
    type Output = Tensor;

    fn sub(self, tensor: &'a Tensor) -> Tensor {
        Tensor::from_array(self - &tensor.data)
    }
}

impl<'a> Sub<&'a Tensor> for &'a Tensor {
    type Output = Tensor;

    fn sub(self, other: &'a Tensor) -> Tensor {
        assert_broadcastable(Operator::Sub, self, other);
        Tensor::from_array(&self.data - &other.data)
    }
}

impl Sub for Tensor {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        &self - &other
    }
}

impl<'a> SubAssign<&'a Self> for Tensor {
    fn sub_assign(&mut self, other: &'a Self) {
        assert_broadcastable(Operator::SubAssign, self, other);
        self.data -= &other.data;
    }
}
