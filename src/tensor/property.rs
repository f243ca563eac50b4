/*
 * @Author       : 老董
 * @Date         : 2023-10-21 03:22:26
 * @Description  : 本类仅包含一些属性方法，不包含任何运算方法，所以不会需要用到mut
 * @LastEditors  : 老董
 * @LastEditTime : 2026-02-11 10:12:03
 */

use super::Tensor;
use ndarray::{ArrayView2, ArrayViewMut2};

impl Tensor {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓快照/view(_mut)↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub fn view(&self) -> ArrayView2<'_, f32> {
        self.data.view()
    }
    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, f32> {
        self.data.view_mut()
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑快照/view(_mut)↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /// 形状总是`[行, 列]`
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// 计算矩阵中所有元素的数量
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 没有任何元素（行或列为0）
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 判断两个矩阵的形状是否严格一致
    pub fn is_same_shape(&self, other: &Self) -> bool {
        self.shape() == other.shape()
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.data[[row, col]]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        self.data[[row, col]] = value;
    }

    /// 转化为纯数（number）。若为`[1, 1]`，则返回Some(number)，否则返回None
    pub fn number(&self) -> Option<f32> {
        if self.shape() == [1, 1] {
            Some(self.data[[0, 0]])
        } else {
            None
        }
    }

    /// 按行优先顺序导出全部元素
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }

    /// 导出第`col`列的全部元素
    pub fn column_to_vec(&self, col: usize) -> Vec<f32> {
        self.data.column(col).iter().copied().collect()
    }
}
