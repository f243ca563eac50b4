use thiserror::Error;
mod ops;
pub use self::ops::*;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TensorError {
    // 矩阵二元运算
    #[error(
        "形状不一致，故无法{operator}：第一个矩阵的形状为{tensor1_shape:?}，第二个矩阵的形状为{tensor2_shape:?}"
    )]
    OperatorError {
        operator: Operator,
        tensor1_shape: Vec<usize>,
        tensor2_shape: Vec<usize>,
    },
    // 列切片越界
    #[error("列切片[{start}, {start}+{len})超出矩阵的列数{cols}")]
    ColumnSliceOutOfRange { start: usize, len: usize, cols: usize },

    #[error("矩阵只能是2阶的，但收到的形状为{0:?}")]
    NotAMatrix(Vec<usize>),
    #[error("数据长度{data_len}与形状{shape:?}不一致")]
    DataLengthMismatch { data_len: usize, shape: Vec<usize> },
}
