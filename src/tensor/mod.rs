/*
 * @Author       : 老董
 * @Date         : 2023-08-17 17:24:24
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-11 10:12:03
 * @Description  : 循环核心所用的稠密矩阵。
 *                 与框架中任意阶的张量不同，这里只有2阶：[特征数（行）, 帧数×并行流数（列）]，
 *                 列按“时间优先”排布：第`t`帧第`s`条流位于第`t * 流数 + s`列。
 */

use ndarray::Array2;
use rand::distributions::{Distribution, Uniform};
use serde::{Deserialize, Serialize};

use crate::errors::TensorError;

mod ops {
    pub mod activation;
    pub mod add;
    pub mod mat_mul;
    pub mod mul;
    pub mod others;
    pub mod sub;
}

mod print;
mod property;
mod save_load;
mod slice;

pub use ops::mat_mul::multiply_and_add;

#[cfg(test)]
mod tests;

/// 定义矩阵的结构体。
/// 注：本库中的数据与梯度缓冲区都是`[行, 列]`的2阶矩阵，向量用`[n, 1]`表示。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tensor {
    data: Array2<f32>,
}

impl Tensor {
    /// 创建一个矩阵，`data`按行优先排列，`shape`必须是`[行, 列]`。
    /// `data`的长度必须等于行数与列数之积，否则会panic。
    pub fn new(data: &[f32], shape: &[usize]) -> Self {
        let (rows, cols) = Self::check_shape(shape);
        assert!(
            data.len() == rows * cols,
            "{}",
            TensorError::DataLengthMismatch {
                data_len: data.len(),
                shape: shape.to_vec(),
            }
        );
        let data = Array2::from_shape_vec((rows, cols), data.to_vec())
            .unwrap_or_else(|_| Array2::zeros((rows, cols)));
        Self { data }
    }

    /// 创建一个全为`value`的矩阵
    pub fn filled(shape: &[usize], value: f32) -> Self {
        let (rows, cols) = Self::check_shape(shape);
        Self {
            data: Array2::from_elem((rows, cols), value),
        }
    }

    pub fn zeros(shape: &[usize]) -> Self {
        Self::filled(shape, 0.0)
    }

    pub fn ones(shape: &[usize]) -> Self {
        Self::filled(shape, 1.0)
    }

    /// 形状为`[0, 0]`的空矩阵，用于尚未分配的缓冲区
    pub fn empty() -> Self {
        Self {
            data: Array2::zeros((0, 0)),
        }
    }

    /// 创建一个随机矩阵，其值在[min, max]的闭区间
    pub fn new_random(min: f32, max: f32, shape: &[usize]) -> Self {
        let (rows, cols) = Self::check_shape(shape);
        let mut rng = rand::thread_rng();
        let uniform = Uniform::from(min..=max);
        Self {
            data: Array2::from_shape_fn((rows, cols), |_| uniform.sample(&mut rng)),
        }
    }

    pub(crate) const fn from_array(data: Array2<f32>) -> Self {
        Self { data }
    }
}

// 私有方法
impl Tensor {
    fn check_shape(shape: &[usize]) -> (usize, usize) {
        assert!(
            shape.len() == 2,
            "{}",
            TensorError::NotAMatrix(shape.to_vec())
        );
        (shape[0], shape[1])
    }
}
