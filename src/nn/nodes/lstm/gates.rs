/*
 * @Author       : 老董
 * @Date         : 2026-02-13
 * @Description  : LSTM单帧的门控计算（前向与反向）。
 *                 这里只处理“一帧”（即`[维度, 流数]`的列块），与序列布局、跨小批历史无关；
 *                 帧的调度与边界掩码由上层的`Lstm`节点负责。
 *
 * 每个门的权重矩阵按列拼接为：
 *   [ 偏置(1列) | Wx(输入维度列) | Wh(输出维度列) | peephole(1列，仅输入/遗忘/输出门) ]
 */

use crate::nn::GraphError;
use crate::tensor::{Tensor, multiply_and_add};

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓权重↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 单个门拆开后的各部分权重
#[derive(Debug, Clone)]
pub(crate) struct GateBlocks {
    pub bias: Tensor,
    pub wx: Tensor,
    pub wh: Tensor,
    pub peephole: Option<Tensor>,
}

impl GateBlocks {
    /// 带peephole的门的总列数
    pub const fn gated_cols(input_dim: usize, output_dim: usize) -> usize {
        input_dim + output_dim + 2
    }

    /// 候选（细胞）块的总列数
    pub const fn candidate_cols(input_dim: usize, output_dim: usize) -> usize {
        input_dim + output_dim + 1
    }

    pub fn split(
        weights: &Tensor,
        input_dim: usize,
        output_dim: usize,
        with_peephole: bool,
    ) -> Result<Self, GraphError> {
        let expected_cols = if with_peephole {
            Self::gated_cols(input_dim, output_dim)
        } else {
            Self::candidate_cols(input_dim, output_dim)
        };
        if weights.rows() != output_dim {
            return Err(GraphError::DimensionMismatch {
                expected: output_dim,
                got: weights.rows(),
                message: "门权重的行数须等于输出维度".to_string(),
            });
        }
        if weights.cols() != expected_cols {
            return Err(GraphError::DimensionMismatch {
                expected: expected_cols,
                got: weights.cols(),
                message: "门权重的列数须为 输入维度+输出维度+1（带peephole时再加1）".to_string(),
            });
        }
        Ok(Self {
            bias: weights.column_slice(0, 1),
            wx: weights.column_slice(1, input_dim),
            wh: weights.column_slice(1 + input_dim, output_dim),
            peephole: with_peephole.then(|| weights.column_slice(1 + input_dim + output_dim, 1)),
        })
    }

    /// `Wx·x + Wh·h_prev + b (+ Wc∘c)`
    pub fn pre_activation(&self, obs: &Tensor, prev_output: &Tensor, cell: &Tensor) -> Tensor {
        let mut z = Tensor::zeros(&[self.wx.rows(), obs.cols()]);
        multiply_and_add(&self.wx, false, obs, false, &mut z);
        multiply_and_add(&self.wh, false, prev_output, false, &mut z);
        z += &self.bias;
        if let Some(peephole) = &self.peephole {
            z += &cell.scale_rows_by(peephole);
        }
        z
    }

    /// 把门的误差`grd`经`Whᵀ`、`Wxᵀ`传回上一帧输出与观测
    fn propagate(&self, grd: &Tensor, to_prev_output: &mut Tensor, to_obs: &mut Tensor) {
        multiply_and_add(&self.wh, true, grd, false, to_prev_output);
        multiply_and_add(&self.wx, true, grd, false, to_obs);
    }

    /// peephole路径上的误差：`Wc∘grd`
    fn add_peephole_error(&self, grd: &Tensor, target: &mut Tensor) {
        if let Some(peephole) = &self.peephole {
            *target += &grd.scale_rows_by(peephole);
        }
    }
}

/// 四个门的权重
#[derive(Debug, Clone)]
pub(crate) struct LstmWeights {
    pub input: GateBlocks,
    pub forget: GateBlocks,
    pub output: GateBlocks,
    pub cell: GateBlocks,
}

impl LstmWeights {
    pub fn split(
        input_gate: &Tensor,
        forget_gate: &Tensor,
        output_gate: &Tensor,
        cell: &Tensor,
        input_dim: usize,
        output_dim: usize,
    ) -> Result<Self, GraphError> {
        Ok(Self {
            input: GateBlocks::split(input_gate, input_dim, output_dim, true)?,
            forget: GateBlocks::split(forget_gate, input_dim, output_dim, true)?,
            output: GateBlocks::split(output_gate, input_dim, output_dim, true)?,
            cell: GateBlocks::split(cell, input_dim, output_dim, false)?,
        })
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑权重↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓前向↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 一帧的前向中间量，反向时全部要用到
#[derive(Debug, Clone)]
pub(crate) struct FrameActivations {
    pub input_gate: Tensor,
    pub forget_gate: Tensor,
    pub output_gate: Tensor,
    pub state: Tensor,
    pub tanh_state: Tensor,
    pub tanh_candidate: Tensor,
    pub output: Tensor,
}

/// 按“输入门、遗忘门、候选/细胞、输出门”的顺序计算一帧
pub(crate) fn forward_frame(
    weights: &LstmWeights,
    obs: &Tensor,
    prev_output: &Tensor,
    prev_state: &Tensor,
) -> FrameActivations {
    let input_gate = weights
        .input
        .pre_activation(obs, prev_output, prev_state)
        .sigmoid();
    let forget_gate = weights
        .forget
        .pre_activation(obs, prev_output, prev_state)
        .sigmoid();
    let tanh_candidate = weights
        .cell
        .pre_activation(obs, prev_output, prev_state)
        .tanh();
    let state = &forget_gate * prev_state + &(&input_gate * &tanh_candidate);

    // 输出门的peephole看的是本帧新的细胞状态
    let output_gate = weights
        .output
        .pre_activation(obs, prev_output, &state)
        .sigmoid();
    let tanh_state = state.tanh();
    let output = &output_gate * &tanh_state;

    FrameActivations {
        input_gate,
        forget_gate,
        output_gate,
        state,
        tanh_state,
        tanh_candidate,
        output,
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑前向↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓反向↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 反向时一帧所需的全部上下文
#[derive(Debug, Clone)]
pub(crate) struct FrameTrace {
    pub obs: Tensor,
    pub prev_output: Tensor,
    pub prev_state: Tensor,
    pub activations: FrameActivations,
}

/// 单个门的权重梯度，布局与`GateBlocks`相同
#[derive(Debug, Clone)]
pub(crate) struct GateGrads {
    pub bias: Tensor,
    pub wx: Tensor,
    pub wh: Tensor,
    pub peephole: Option<Tensor>,
}

impl GateGrads {
    pub fn zeros(input_dim: usize, output_dim: usize, with_peephole: bool) -> Self {
        Self {
            bias: Tensor::zeros(&[output_dim, 1]),
            wx: Tensor::zeros(&[output_dim, input_dim]),
            wh: Tensor::zeros(&[output_dim, output_dim]),
            peephole: with_peephole.then(|| Tensor::zeros(&[output_dim, 1])),
        }
    }

    /// 累加一帧的贡献；peephole梯度取`grd`与`peephole_source`的按行内积
    fn accumulate(&mut self, grd: &Tensor, obs: &Tensor, prev_output: &Tensor, peephole_source: &Tensor) {
        self.bias += grd.sum_columns();
        multiply_and_add(grd, false, obs, true, &mut self.wx);
        multiply_and_add(grd, false, prev_output, true, &mut self.wh);
        if let Some(peephole) = &mut self.peephole {
            *peephole += Tensor::row_inner_product(grd, peephole_source);
        }
    }

    /// 拼回与门权重同样布局的完整梯度矩阵
    pub fn assemble(&self) -> Tensor {
        match &self.peephole {
            Some(peephole) => Tensor::concat_columns(&[&self.bias, &self.wx, &self.wh, peephole]),
            None => Tensor::concat_columns(&[&self.bias, &self.wx, &self.wh]),
        }
    }
}

/// 四个门的权重梯度（跨帧累加）
#[derive(Debug, Clone)]
pub(crate) struct LstmWeightGrads {
    pub input: GateGrads,
    pub forget: GateGrads,
    pub output: GateGrads,
    pub cell: GateGrads,
}

impl LstmWeightGrads {
    pub fn zeros(input_dim: usize, output_dim: usize) -> Self {
        Self {
            input: GateGrads::zeros(input_dim, output_dim, true),
            forget: GateGrads::zeros(input_dim, output_dim, true),
            output: GateGrads::zeros(input_dim, output_dim, true),
            cell: GateGrads::zeros(input_dim, output_dim, false),
        }
    }
}

/// 一帧反向后传给“上一帧”与观测的误差
#[derive(Debug, Clone)]
pub(crate) struct FrameErrors {
    pub to_prev_output: Tensor,
    pub to_prev_state: Tensor,
    pub to_obs: Tensor,
}

/// 单帧反向。
///
/// `output_error`是本帧输出上的误差（已含下一帧经各门传回的部分），
/// `state_error`是下一帧经遗忘门传回的细胞误差。
pub(crate) fn backward_frame(
    weights: &LstmWeights,
    trace: &FrameTrace,
    output_error: &Tensor,
    state_error: &Tensor,
    grads: &mut LstmWeightGrads,
) -> FrameErrors {
    let FrameTrace {
        obs,
        prev_output,
        prev_state,
        activations: act,
    } = trace;
    let mut to_prev_output = Tensor::zeros(prev_output.shape());
    let mut to_obs = Tensor::zeros(obs.shape());

    // 1.输出门
    let grd_before_go =
        &(output_error * &act.tanh_state) * &act.output_gate.sigmoid_derivative();
    weights
        .output
        .propagate(&grd_before_go, &mut to_prev_output, &mut to_obs);
    let mut grd_to_cell = Tensor::zeros(prev_state.shape());
    weights
        .output
        .add_peephole_error(&grd_before_go, &mut grd_to_cell);
    grads
        .output
        .accumulate(&grd_before_go, obs, prev_output, &act.state);
    grd_to_cell += &act.tanh_state.tanh_derivative() * &(output_error * &act.output_gate);

    // 2.下一帧传回的细胞误差
    grd_to_cell += state_error;
    let mut to_prev_state = &act.forget_gate * &grd_to_cell;

    // 3.遗忘门
    let grd_before_gf =
        &(&act.forget_gate.sigmoid_derivative() * prev_state) * &grd_to_cell;
    weights
        .forget
        .propagate(&grd_before_gf, &mut to_prev_output, &mut to_obs);
    weights
        .forget
        .add_peephole_error(&grd_before_gf, &mut to_prev_state);
    grads
        .forget
        .accumulate(&grd_before_gf, obs, prev_output, prev_state);

    // 4.输入门
    let grd_before_gi =
        &(&act.input_gate.sigmoid_derivative() * &act.tanh_candidate) * &grd_to_cell;
    weights
        .input
        .propagate(&grd_before_gi, &mut to_prev_output, &mut to_obs);
    weights
        .input
        .add_peephole_error(&grd_before_gi, &mut to_prev_state);
    grads
        .input
        .accumulate(&grd_before_gi, obs, prev_output, prev_state);

    // 5.候选
    let grd_before_tanh_candidate =
        &act.tanh_candidate.tanh_derivative() * &(&act.input_gate * &grd_to_cell);
    weights
        .cell
        .propagate(&grd_before_tanh_candidate, &mut to_prev_output, &mut to_obs);
    grads
        .cell
        .accumulate(&grd_before_tanh_candidate, obs, prev_output, prev_state);

    FrameErrors {
        to_prev_output,
        to_prev_state,
        to_obs,
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑反向↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
