use ndarray::{Array2, ArrayView2, ArrayViewMut2, Axis, s};

use crate::errors::TensorError;

impl super::Tensor {
    /// 获取从第`start`列起、共`len`列的视图。
    ///
    /// 循环节点以“帧”为单位访问缓冲区：第`t`帧对应列区间`[t * 流数, (t + 1) * 流数)`，
    /// 所以这里只提供按列的切片（行总是完整保留）。
    ///
    /// # 错误
    /// 列区间超出矩阵列数时会触发panic。
    pub fn column_slice_view(&self, start: usize, len: usize) -> ArrayView2<'_, f32> {
        self.check_column_range(start, len);
        self.data.slice(s![.., start..start + len])
    }

    pub fn column_slice_view_mut(&mut self, start: usize, len: usize) -> ArrayViewMut2<'_, f32> {
        self.check_column_range(start, len);
        self.data.slice_mut(s![.., start..start + len])
    }

    /// `column_slice_view`的拥有所有权版本
    pub fn column_slice(&self, start: usize, len: usize) -> Self {
        Self::from_array(self.column_slice_view(start, len).to_owned())
    }

    /// 用`src`覆盖从第`start`列起的若干列（列数等于`src`的列数）
    pub fn set_column_slice(&mut self, start: usize, src: &Self) {
        self.check_rows(src);
        self.column_slice_view_mut(start, src.cols()).assign(&src.data);
    }

    /// 把`src`累加到从第`start`列起的若干列上（`+=`，不会覆盖已有的值）
    pub fn add_to_column_slice(&mut self, start: usize, src: &Self) {
        self.check_rows(src);
        let mut target = self.column_slice_view_mut(start, src.cols());
        target += &src.data;
    }

    /// 把`src`中从第`src_start`列起的`len`列复制到本矩阵第`dst_start`列起的位置
    pub fn copy_columns_from(&mut self, dst_start: usize, src: &Self, src_start: usize, len: usize) {
        self.check_rows(src);
        let from = src.column_slice_view(src_start, len);
        self.column_slice_view_mut(dst_start, len).assign(&from);
    }

    /// 同`copy_columns_from`，但为累加
    pub fn add_columns_from(&mut self, dst_start: usize, src: &Self, src_start: usize, len: usize) {
        self.check_rows(src);
        let from = src.column_slice_view(src_start, len);
        let mut target = self.column_slice_view_mut(dst_start, len);
        target += &from;
    }

    /// 用常数填充从第`start`列起的`len`列
    pub fn fill_column_slice(&mut self, start: usize, len: usize, value: f32) {
        self.column_slice_view_mut(start, len).fill(value);
    }

    /// 把多个行数相同的矩阵按列拼接，如`[pastOutput | pastState]`
    pub fn concat_columns(parts: &[&Self]) -> Self {
        let views: Vec<ArrayView2<'_, f32>> = parts.iter().map(|p| p.data.view()).collect();
        let data = ndarray::concatenate(Axis(1), &views).unwrap_or_else(|_| {
            panic!(
                "{}",
                TensorError::OperatorError {
                    operator: crate::errors::Operator::ConcatColumns,
                    tensor1_shape: parts.first().map(|p| p.shape().to_vec()).unwrap_or_default(),
                    tensor2_shape: parts.last().map(|p| p.shape().to_vec()).unwrap_or_default(),
                }
            )
        });
        Self::from_array(data)
    }

    /// 重新分配为`[rows, cols]`并填充`value`；形状不变时只做填充
    pub fn resize_filled(&mut self, rows: usize, cols: usize, value: f32) {
        if self.shape() == [rows, cols] {
            self.data.fill(value);
        } else {
            self.data = Array2::from_elem((rows, cols), value);
        }
    }

    fn check_column_range(&self, start: usize, len: usize) {
        assert!(
            start + len <= self.cols(),
            "{}",
            TensorError::ColumnSliceOutOfRange {
                start,
                len,
                cols: self.cols(),
            }
        );
    }

    fn check_rows(&self, src: &Self) {
        assert!(
            self.rows() == src.rows(),
            "{}",
            TensorError::OperatorError {
                operator: crate::errors::Operator::AddAssign,
                tensor1_shape: self.shape().to_vec(),
                tensor2_shape: src.shape().to_vec(),
            }
        );
    }
}
