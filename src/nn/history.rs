/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 跨小批（minibatch）的历史缓冲区，以及相邻两个小批之间显式传递的交接记录。
 *                 前向方向交接“最后的输出与细胞状态”，反向方向交接“传给上一个小批的误差”。
 *                 由调度者负责先后顺序；每个方向每轮只有一个写者。
 */

use crate::nn::GraphError;
use crate::tensor::Tensor;

/// 时延节点的历史：上一小批输入的完整值（或外部显式注入的历史）
#[derive(Debug, Clone)]
pub struct DelayedHistory {
    pub activation: Tensor,
    /// 为`true`时，下一次逐帧计算的首帧不会再用输入覆盖`activation`
    pub explicitly_set: bool,
}

impl DelayedHistory {
    pub(crate) fn filled(rows: usize, cols: usize, value: f32) -> Self {
        Self {
            activation: Tensor::filled(&[rows, cols], value),
            explicitly_set: false,
        }
    }
}

/// LSTM前向交接：各条流最后的输出与细胞状态，形状均为`[输出维度, 流数]`
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardHandoff {
    pub output: Tensor,
    pub state: Tensor,
}

/// LSTM反向交接：传给上一个小批末帧的输出误差与细胞状态误差
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorHandoff {
    pub output_error: Tensor,
    pub state_error: Tensor,
}

/// 把`[前半 | 后半]`拼成的矩阵拆开，列数必须为偶数
fn split_halves(matrix: &Tensor, what: &str) -> Result<(Tensor, Tensor), GraphError> {
    let cols = matrix.cols();
    if cols % 2 != 0 {
        return Err(GraphError::DimensionMismatch {
            expected: cols + 1,
            got: cols,
            message: format!("{what}的列数必须为偶数"),
        });
    }
    let half = cols / 2;
    Ok((matrix.column_slice(0, half), matrix.column_slice(half, half)))
}

impl ForwardHandoff {
    /// `[output | state]`
    pub fn to_matrix(&self) -> Tensor {
        Tensor::concat_columns(&[&self.output, &self.state])
    }

    pub fn from_matrix(matrix: &Tensor) -> Result<Self, GraphError> {
        let (output, state) = split_halves(matrix, "LSTM历史")?;
        Ok(Self { output, state })
    }
}

impl ErrorHandoff {
    /// `[output_error | state_error]`
    pub fn to_matrix(&self) -> Tensor {
        Tensor::concat_columns(&[&self.output_error, &self.state_error])
    }

    pub fn from_matrix(matrix: &Tensor) -> Result<Self, GraphError> {
        let (output_error, state_error) = split_halves(matrix, "LSTM误差")?;
        Ok(Self {
            output_error,
            state_error,
        })
    }

    pub(crate) fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            output_error: Tensor::zeros(&[rows, cols]),
            state_error: Tensor::zeros(&[rows, cols]),
        }
    }
}

/// LSTM的历史存储
#[derive(Debug, Clone)]
pub struct LstmHistory {
    /// 上一小批交接过来的输出（前向的入口）
    pub past_output: Tensor,
    /// 上一小批交接过来的细胞状态
    pub past_state: Tensor,
    /// 本小批各流最后一个有效帧的输出（前向的出口）
    pub last_output: Tensor,
    pub last_state: Tensor,
    /// 本小批首帧传给上一小批的误差（反向的出口）
    pub errors_to_previous: Option<ErrorHandoff>,
    /// 下一小批传过来的误差，只在紧接着的一次反向传播中使用（反向的入口）
    pub errors_from_future: Option<ErrorHandoff>,
}

impl Default for LstmHistory {
    fn default() -> Self {
        Self {
            past_output: Tensor::empty(),
            past_state: Tensor::empty(),
            last_output: Tensor::empty(),
            last_state: Tensor::empty(),
            errors_to_previous: None,
            errors_from_future: None,
        }
    }
}
