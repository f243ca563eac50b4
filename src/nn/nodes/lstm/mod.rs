/*
 * @Author       : 老董
 * @Date         : 2026-02-13
 * @Description  : 融合的LSTM单元：一次处理整个小批（内部逐帧循环），含完整的BPTT。
 *                 输入依次为：观测、输入门权重、遗忘门权重、输出门权重、细胞（候选）权重。
 *                 跨小批的状态与误差通过`LstmHistory`及交接记录显式传递。
 */

pub(crate) mod gates;

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::{debug, trace};

use gates::{FrameActivations, FrameTrace, LstmWeightGrads, LstmWeights, backward_frame, forward_frame};

use super::{
    CopyNodeFlags, DEFAULT_HIDDEN_ACTIVATION, NodeInput, NodeType, StorageKind, TraitNode,
    check_input_count, fill_sentinel,
};
use crate::nn::device::Residency;
use crate::nn::persist::{read_field, write_field};
use crate::nn::{
    DeviceId, DevicePlacement, ErrorHandoff, ForwardHandoff, FormatVersion, GraphError,
    LstmHistory, MinibatchPackingFlags, NodeDescriptor, NodeTypeDescriptor, SequenceLayout,
    frame_order,
};
use crate::tensor::Tensor;

const NUM_INPUTS: usize = 5;
const INPUT_NAMES: [&str; NUM_INPUTS] = ["观测", "输入门权重", "遗忘门权重", "输出门权重", "细胞权重"];
/// 各输入的梯度缓冲区在设备搬移时使用的名字
const PARTIAL_NAMES: [&str; NUM_INPUTS] = [
    "grad_to_obs",
    "grad_to_input_gate",
    "grad_to_forget_gate",
    "grad_to_output_gate",
    "grad_to_cell",
];

/// 这些标志所在的流，上一帧的输出与状态不参与本帧（重置为初始值）
const RESET_FLAGS: MinibatchPackingFlags = MinibatchPackingFlags::SEQUENCE_START
    .union(MinibatchPackingFlags::NO_FEATURE);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LstmConfig {
    /// 序列开头处细胞状态的初始值
    pub default_state: f32,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            default_state: DEFAULT_HIDDEN_ACTIVATION,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Lstm {
    name: String,
    config: LstmConfig,
    input_dim: usize,
    output_dim: usize,
    layout: Option<SequenceLayout>,

    value: Tensor,
    grad: Tensor,
    state: Tensor,
    input_gate: Tensor,
    forget_gate: Tensor,
    output_gate: Tensor,
    tanh_state: Tensor,
    tanh_candidate: Tensor,

    history: LstmHistory,

    // 反向一次性算出全部5个输入的梯度，之后按输入逐个交付
    partials: [Tensor; NUM_INPUTS],
    gradient_computed: bool,
    delivered: [bool; NUM_INPUTS],

    residency: Residency,
}

impl Lstm {
    pub fn new(
        name: &str,
        input_dim: usize,
        output_dim: usize,
        config: LstmConfig,
    ) -> Result<Self, GraphError> {
        if input_dim == 0 || output_dim == 0 {
            return Err(GraphError::InvalidConfig(format!(
                "LSTM的输入维度与输出维度都必须大于0，但收到的是{input_dim}与{output_dim}"
            )));
        }
        Ok(Self::blank(name, input_dim, output_dim, config))
    }

    fn blank(name: &str, input_dim: usize, output_dim: usize, config: LstmConfig) -> Self {
        Self {
            name: name.to_string(),
            config,
            input_dim,
            output_dim,
            layout: None,
            value: Tensor::empty(),
            grad: Tensor::empty(),
            state: Tensor::empty(),
            input_gate: Tensor::empty(),
            forget_gate: Tensor::empty(),
            output_gate: Tensor::empty(),
            tanh_state: Tensor::empty(),
            tanh_candidate: Tensor::empty(),
            history: LstmHistory::default(),
            partials: std::array::from_fn(|_| Tensor::empty()),
            gradient_computed: false,
            delivered: [false; NUM_INPUTS],
            residency: Residency::default(),
        }
    }

    pub const fn input_dim(&self) -> usize {
        self.input_dim
    }

    pub const fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub const fn config(&self) -> &LstmConfig {
        &self.config
    }

    pub const fn default_state(&self) -> f32 {
        self.config.default_state
    }

    pub fn set_default_state(&mut self, default_state: f32) {
        self.config.default_state = default_state;
    }

    /// 各帧的细胞状态
    pub const fn state(&self) -> &Tensor {
        &self.state
    }

    pub const fn input_gate(&self) -> &Tensor {
        &self.input_gate
    }

    pub const fn forget_gate(&self) -> &Tensor {
        &self.forget_gate
    }

    pub const fn output_gate(&self) -> &Tensor {
        &self.output_gate
    }

    pub const fn history(&self) -> &LstmHistory {
        &self.history
    }

    pub const fn is_gradient_computed(&self) -> bool {
        self.gradient_computed
    }

    /// 第`t`帧第`stream`条流的边界标志
    pub fn segment_info(&self, t: usize, stream: usize) -> Result<MinibatchPackingFlags, GraphError> {
        self.layout
            .as_ref()
            .ok_or_else(|| self.not_ready())?
            .checked_flag(t, stream)
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓跨小批历史↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    /// `[pastOutput | pastState]`；`last`为`true`时返回最近一次前向结束时的`[lastOutput | lastState]`
    pub fn get_history(&self, last: bool) -> Tensor {
        let history = if last {
            Tensor::concat_columns(&[&self.history.last_output, &self.history.last_state])
        } else {
            Tensor::concat_columns(&[&self.history.past_output, &self.history.past_state])
        };
        trace!(node = %self.name, last, cols = history.cols(), "读取LSTM历史");
        history
    }

    /// 按列对半拆成过去的输出与细胞状态
    pub fn set_history(&mut self, history: &Tensor) -> Result<(), GraphError> {
        self.check_rows(history, "LSTM历史")?;
        self.accept_forward_handoff(ForwardHandoff::from_matrix(history)?)
    }

    /// 交给下一个小批的前向状态
    pub fn forward_handoff(&self) -> ForwardHandoff {
        ForwardHandoff {
            output: self.history.last_output.clone(),
            state: self.history.last_state.clone(),
        }
    }

    pub fn accept_forward_handoff(&mut self, handoff: ForwardHandoff) -> Result<(), GraphError> {
        self.check_rows(&handoff.output, "交接的输出")?;
        self.check_rows(&handoff.state, "交接的细胞状态")?;
        debug!(
            node = %self.name,
            output_norm = handoff.output.frobenius_norm(),
            state_norm = handoff.state.frobenius_norm(),
            "LSTM接收上一小批的状态"
        );
        self.history.past_output = handoff.output;
        self.history.past_state = handoff.state;
        Ok(())
    }

    /// `[outputError | stateError]`，须在反向传播之后调用
    pub fn get_errors_to_previous_minibatch(&self) -> Result<Tensor, GraphError> {
        Ok(self.backward_handoff()?.to_matrix())
    }

    /// 安装下一小批传回的误差，并在紧接着的一次反向传播中使用它
    pub fn set_errors_from_future_minibatch(&mut self, errors: &Tensor) -> Result<(), GraphError> {
        self.check_rows(errors, "下一小批传回的误差")?;
        self.accept_error_handoff(ErrorHandoff::from_matrix(errors)?)
    }

    pub fn backward_handoff(&self) -> Result<ErrorHandoff, GraphError> {
        self.history.errors_to_previous.clone().ok_or_else(|| {
            GraphError::InvalidOperation(format!(
                "{}尚未完成反向传播，没有可交给上一小批的误差",
                self.name
            ))
        })
    }

    pub fn accept_error_handoff(&mut self, handoff: ErrorHandoff) -> Result<(), GraphError> {
        self.check_rows(&handoff.output_error, "输出误差")?;
        self.check_rows(&handoff.state_error, "细胞状态误差")?;
        if !handoff.output_error.is_same_shape(&handoff.state_error) {
            return Err(GraphError::ShapeMismatch {
                expected: handoff.output_error.shape().to_vec(),
                got: handoff.state_error.shape().to_vec(),
                message: "输出误差与细胞状态误差的形状须一致".to_string(),
            });
        }
        self.history.errors_from_future = Some(handoff);
        Ok(())
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑跨小批历史↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    fn not_ready(&self) -> GraphError {
        GraphError::InvalidOperation(format!("{}尚未设置序列布局", self.name))
    }

    fn check_rows(&self, matrix: &Tensor, what: &str) -> Result<(), GraphError> {
        if matrix.rows() != self.output_dim {
            return Err(GraphError::DimensionMismatch {
                expected: self.output_dim,
                got: matrix.rows(),
                message: format!("{what}的行数须等于输出维度"),
            });
        }
        Ok(())
    }

    fn check_observation(&self, obs: &Tensor) -> Result<(), GraphError> {
        if obs.rows() != self.input_dim {
            return Err(GraphError::DimensionMismatch {
                expected: self.input_dim,
                got: obs.rows(),
                message: "观测的行数须等于输入维度".to_string(),
            });
        }
        Ok(())
    }

    /// 4个权重输入须为可学习参数、稠密、非空，且尺寸与输入/输出维度一致
    fn split_weights(&self, inputs: &[NodeInput]) -> Result<LstmWeights, GraphError> {
        for (input, what) in inputs.iter().zip(INPUT_NAMES).skip(1) {
            if !input.is_learnable() {
                return Err(GraphError::InvalidOperation(format!(
                    "LSTM的{what}`{}`必须是可学习参数",
                    input.name()
                )));
            }
            if input.storage() != StorageKind::Dense {
                return Err(GraphError::InvalidOperation(format!(
                    "LSTM的{what}`{}`必须是稠密矩阵",
                    input.name()
                )));
            }
            if input.value().is_empty() {
                return Err(GraphError::InvalidConfig(format!(
                    "LSTM的{what}`{}`为空",
                    input.name()
                )));
            }
        }
        LstmWeights::split(
            inputs[1].value(),
            inputs[2].value(),
            inputs[3].value(),
            inputs[4].value(),
            self.input_dim,
            self.output_dim,
        )
    }

    /// 取第`t`帧的“上一帧”输出与状态：首帧取自跨小批历史，否则取自上一帧。
    /// 序列开头或无输入的流重置为0与`default_state`
    fn prepare_history(&self, t: usize, layout: &SequenceLayout) -> (Tensor, Tensor) {
        let num_streams = layout.num_streams();
        let (mut prev_output, mut prev_state) = if t == 0 {
            (
                self.history.past_output.clone(),
                self.history.past_state.clone(),
            )
        } else {
            let start = layout.frame(t - 1).start_col();
            (
                self.value.column_slice(start, num_streams),
                self.state.column_slice(start, num_streams),
            )
        };
        for (s, flag) in layout.stream_flags(t).iter().enumerate() {
            if flag.intersects(RESET_FLAGS) {
                prev_output.fill_column_slice(s, 1, 0.);
                prev_state.fill_column_slice(s, 1, self.config.default_state);
            }
        }
        (prev_output, prev_state)
    }

    fn frame_activations(&self, start: usize, len: usize) -> FrameActivations {
        FrameActivations {
            input_gate: self.input_gate.column_slice(start, len),
            forget_gate: self.forget_gate.column_slice(start, len),
            output_gate: self.output_gate.column_slice(start, len),
            state: self.state.column_slice(start, len),
            tanh_state: self.tanh_state.column_slice(start, len),
            tanh_candidate: self.tanh_candidate.column_slice(start, len),
            output: self.value.column_slice(start, len),
        }
    }

    fn store_frame(&mut self, start: usize, act: &FrameActivations) {
        self.input_gate.set_column_slice(start, &act.input_gate);
        self.forget_gate.set_column_slice(start, &act.forget_gate);
        self.output_gate.set_column_slice(start, &act.output_gate);
        self.state.set_column_slice(start, &act.state);
        self.tanh_state.set_column_slice(start, &act.tanh_state);
        self.tanh_candidate.set_column_slice(start, &act.tanh_candidate);
        self.value.set_column_slice(start, &act.output);
    }

    /// 前向缓冲区按`[输出维度, 列数]`重新分配，并填上哨兵值
    fn allocate_buffers(&mut self, cols: usize) {
        let shape = [self.output_dim, cols];
        for buffer in [
            &mut self.value,
            &mut self.state,
            &mut self.input_gate,
            &mut self.forget_gate,
            &mut self.output_gate,
            &mut self.tanh_state,
            &mut self.tanh_candidate,
        ] {
            if buffer.shape() != shape {
                *buffer = Tensor::zeros(&shape);
            }
            fill_sentinel(buffer);
        }
        if self.grad.shape() != shape {
            self.grad = Tensor::zeros(&shape);
        }
    }

    /// 跨小批历史的列数须等于流数；不一致时重新初始化
    fn ensure_past(&mut self, num_streams: usize) {
        let shape = [self.output_dim, num_streams];
        if self.history.past_state.shape() != shape {
            self.history.past_state = Tensor::filled(&shape, self.config.default_state);
        }
        if self.history.past_output.shape() != shape {
            self.history.past_output = Tensor::zeros(&shape);
        }
    }

    /// 每条流最后一个有输入的帧，作为下一小批的起点；整条流都无输入时沿用过去的值
    fn save_last_state(&mut self, layout: &SequenceLayout) {
        let mut last_output = self.history.past_output.clone();
        let mut last_state = self.history.past_state.clone();
        for s in 0..layout.num_streams() {
            let last_active = (0..layout.num_frames())
                .rev()
                .find(|&t| !layout.flag(t, s).is_no_input());
            if let Some(t) = last_active {
                let col = layout.frame(t).start_col() + s;
                last_output.copy_columns_from(s, &self.value, col, 1);
                last_state.copy_columns_from(s, &self.state, col, 1);
            }
        }
        self.history.last_output = last_output;
        self.history.last_state = last_state;
    }

    /// 按时间逆序扫完整个小批，得到全部输入的梯度以及交给上一小批的误差
    fn backward_sweep(
        &self,
        inputs: &[NodeInput],
        layout: &SequenceLayout,
        errors_from_future: Option<&ErrorHandoff>,
    ) -> Result<([Tensor; NUM_INPUTS], ErrorHandoff), GraphError> {
        if !self.grad.is_same_shape(&self.value) {
            return Err(GraphError::ShapeMismatch {
                expected: self.value.shape().to_vec(),
                got: self.grad.shape().to_vec(),
                message: format!("{}的梯度与值的形状不一致", self.name),
            });
        }
        let weights = self.split_weights(inputs)?;
        let obs = inputs[0].value();
        if obs.shape() != [self.input_dim, self.value.cols()] {
            return Err(GraphError::ShapeMismatch {
                expected: vec![self.input_dim, self.value.cols()],
                got: obs.shape().to_vec(),
                message: "反向时的观测与前向时不一致".to_string(),
            });
        }
        // 前向之后换过布局时，缓冲区与新布局对不上
        layout.check_columns(self.value.cols(), "LSTM的输出")?;
        let num_streams = layout.num_streams();
        let num_frames = layout.num_frames();
        for past in [&self.history.past_output, &self.history.past_state] {
            if past.cols() != num_streams {
                return Err(GraphError::DimensionMismatch {
                    expected: num_streams,
                    got: past.cols(),
                    message: "上一小批交接过来的历史的列数须等于流数".to_string(),
                });
            }
        }
        if let Some(future) = errors_from_future {
            if future.output_error.cols() != num_streams {
                return Err(GraphError::DimensionMismatch {
                    expected: num_streams,
                    got: future.output_error.cols(),
                    message: "下一小批传回的误差的列数须等于流数".to_string(),
                });
            }
        }

        let mut grads = LstmWeightGrads::zeros(self.input_dim, self.output_dim);
        let mut grad_to_obs = Tensor::zeros(obs.shape());
        let mut carried = ErrorHandoff::zeros(self.output_dim, num_streams);

        for t in frame_order(num_frames, false) {
            let start = layout.frame(t).start_col();
            let flags = layout.stream_flags(t);

            let mut output_error = self.grad.column_slice(start, num_streams) + &carried.output_error;
            let mut state_error = carried.state_error;

            // 下一小批的误差只注入到序列在本小批中真正结束的那一帧
            if let Some(future) = errors_from_future {
                for (s, flag) in flags.iter().enumerate() {
                    let next_absent = t + 1 == num_frames || layout.flag(t + 1, s).is_no_input();
                    if flag.is_plain() && next_absent {
                        output_error.add_columns_from(s, &future.output_error, s, 1);
                        state_error.add_columns_from(s, &future.state_error, s, 1);
                    }
                }
            }
            for (s, flag) in flags.iter().enumerate() {
                if flag.is_no_input() {
                    output_error.fill_column_slice(s, 1, 0.);
                    state_error.fill_column_slice(s, 1, 0.);
                }
            }
            trace!(
                node = %self.name,
                t,
                output_error_norm = output_error.frobenius_norm(),
                state_error_norm = state_error.frobenius_norm(),
                "LSTM反向"
            );

            let (prev_output, prev_state) = self.prepare_history(t, layout);
            let frame_trace = FrameTrace {
                obs: obs.column_slice(start, num_streams),
                prev_output,
                prev_state,
                activations: self.frame_activations(start, num_streams),
            };
            let errors = backward_frame(&weights, &frame_trace, &output_error, &state_error, &mut grads);
            grad_to_obs.set_column_slice(start, &errors.to_obs);

            carried = ErrorHandoff {
                output_error: errors.to_prev_output,
                state_error: errors.to_prev_state,
            };
            // 被重置的流与上一帧无关
            for (s, flag) in flags.iter().enumerate() {
                if flag.intersects(RESET_FLAGS) {
                    carried.output_error.fill_column_slice(s, 1, 0.);
                    carried.state_error.fill_column_slice(s, 1, 0.);
                }
            }
        }

        let partials = [
            grad_to_obs,
            grads.input.assemble(),
            grads.forget.assemble(),
            grads.output.assemble(),
            grads.cell.assemble(),
        ];
        Ok((partials, carried))
    }
}

impl TraitNode for Lstm {
    fn name(&self) -> &str {
        &self.name
    }

    fn operation_name(&self) -> &'static str {
        "LSTM"
    }

    fn value(&self) -> &Tensor {
        &self.value
    }

    fn grad(&self) -> &Tensor {
        &self.grad
    }

    fn grad_mut(&mut self) -> &mut Tensor {
        &mut self.grad
    }

    fn layout(&self) -> Option<&SequenceLayout> {
        self.layout.as_ref()
    }

    fn set_layout(&mut self, layout: SequenceLayout) -> Result<(), GraphError> {
        debug!(
            node = %self.name,
            streams = layout.num_streams(),
            frames = layout.num_frames(),
            "LSTM安装序列布局"
        );
        self.layout = Some(layout);
        Ok(())
    }

    fn validate(&mut self, inputs: &[NodeInput]) -> Result<(), GraphError> {
        check_input_count(inputs, NUM_INPUTS)?;
        let obs = inputs[0].value();
        if obs.is_empty() {
            return Err(GraphError::InvalidConfig(format!(
                "LSTM的观测`{}`为空",
                inputs[0].name()
            )));
        }
        self.check_observation(obs)?;
        self.split_weights(inputs)?;
        Ok(())
    }

    fn evaluate(&mut self, inputs: &[NodeInput]) -> Result<(), GraphError> {
        check_input_count(inputs, NUM_INPUTS)?;
        let layout = self.layout.clone().ok_or_else(|| self.not_ready())?;
        let weights = self.split_weights(inputs)?;
        let obs = inputs[0].value();
        self.check_observation(obs)?;
        layout.check_columns(obs.cols(), "LSTM的观测")?;

        let num_streams = layout.num_streams();
        self.allocate_buffers(obs.cols());
        self.ensure_past(num_streams);
        debug!(
            node = %self.name,
            past_output_norm = self.history.past_output.frobenius_norm(),
            past_state_norm = self.history.past_state.frobenius_norm(),
            "LSTM前向开始"
        );

        for t in frame_order(layout.num_frames(), true) {
            let start = layout.frame(t).start_col();
            let (prev_output, prev_state) = self.prepare_history(t, &layout);
            let activations = forward_frame(
                &weights,
                &obs.column_slice(start, num_streams),
                &prev_output,
                &prev_state,
            );
            self.store_frame(start, &activations);
        }

        self.save_last_state(&layout);
        self.gradient_computed = false;
        self.delivered = [false; NUM_INPUTS];
        debug!(
            node = %self.name,
            last_output_norm = self.history.last_output.frobenius_norm(),
            last_state_norm = self.history.last_state.frobenius_norm(),
            "LSTM前向完成"
        );
        Ok(())
    }

    fn evaluate_frame(&mut self, t: usize, _inputs: &[NodeInput]) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "LSTM只支持对整个小批前向计算，不支持单独计算第{t}帧"
        )))
    }

    fn compute_input_partial(
        &mut self,
        input_index: usize,
        inputs: &mut [NodeInput],
    ) -> Result<(), GraphError> {
        if input_index >= NUM_INPUTS {
            return Err(GraphError::InvalidOperation(format!(
                "LSTM只有{NUM_INPUTS}个输入，不存在第{input_index}个输入"
            )));
        }
        check_input_count(inputs, NUM_INPUTS)?;

        if !self.gradient_computed {
            let layout = self.layout.as_ref().ok_or_else(|| self.not_ready())?;
            let (partials, errors_to_previous) =
                self.backward_sweep(inputs, layout, self.history.errors_from_future.as_ref())?;
            debug!(
                node = %self.name,
                output_error_norm = errors_to_previous.output_error.frobenius_norm(),
                state_error_norm = errors_to_previous.state_error.frobenius_norm(),
                "LSTM交给上一小批的误差"
            );
            self.partials = partials;
            self.history.errors_to_previous = Some(errors_to_previous);
            self.history.errors_from_future = None;
            self.gradient_computed = true;
        }

        // 同一小批内重复请求同一个输入的梯度时不再累加
        if self.delivered[input_index] {
            return Ok(());
        }
        let partial = &self.partials[input_index];
        let input = &mut inputs[input_index];
        *input.grad_accumulator()? += partial;
        self.delivered[input_index] = true;
        debug!(
            node = %self.name,
            input = INPUT_NAMES[input_index],
            norm = partial.frobenius_norm(),
            "LSTM的输入梯度"
        );
        Ok(())
    }

    fn compute_input_partial_frame(
        &mut self,
        _input_index: usize,
        t: usize,
        _inputs: &mut [NodeInput],
    ) -> Result<(), GraphError> {
        Err(GraphError::InvalidOperation(format!(
            "LSTM只支持对整个小批反向传播，不支持单独处理第{t}帧"
        )))
    }

    fn save_state_as(&self, sink: &mut dyn Write, version: FormatVersion) -> Result<(), GraphError> {
        if version >= FormatVersion::V2 {
            write_field(sink, &self.input_dim)?;
            write_field(sink, &self.output_dim)?;
        }
        write_field(sink, &self.config.default_state)
    }

    fn load_state(&mut self, source: &mut dyn Read, version: FormatVersion) -> Result<(), GraphError> {
        if version >= FormatVersion::V2 {
            let input_dim: usize = read_field(source)?;
            let output_dim: usize = read_field(source)?;
            if input_dim == 0 || output_dim == 0 {
                return Err(GraphError::InvalidConfig(format!(
                    "LSTM的输入维度与输出维度都必须大于0，但读到的是{input_dim}与{output_dim}"
                )));
            }
            self.input_dim = input_dim;
            self.output_dim = output_dim;
        }
        self.config.default_state = read_field(source)?;
        debug!(
            node = %self.name,
            ?version,
            input_dim = self.input_dim,
            output_dim = self.output_dim,
            default_state = self.config.default_state,
            "LSTM加载完成"
        );
        Ok(())
    }

    fn copy_to(&self, new_name: &str, flags: CopyNodeFlags) -> NodeType {
        let mut node = if flags.contains(CopyNodeFlags::COPY_VALUE) {
            Self {
                name: new_name.to_string(),
                ..self.clone()
            }
        } else {
            let mut node = Self::blank(new_name, self.input_dim, self.output_dim, self.config);
            node.layout = self.layout.clone();
            node
        };
        // 复制出的节点尚未做过反向
        node.gradient_computed = false;
        node.delivered = [false; NUM_INPUTS];
        node.partials = std::array::from_fn(|_| Tensor::empty());
        node.into()
    }

    fn device(&self) -> DeviceId {
        self.residency.device()
    }

    fn move_to_device(
        &mut self,
        target: DeviceId,
        placement: &mut dyn DevicePlacement,
    ) -> Result<(), GraphError> {
        let history = &mut self.history;
        let mut buffers: Vec<(&str, &mut Tensor)> = vec![
            ("value", &mut self.value),
            ("grad", &mut self.grad),
            ("state", &mut self.state),
            ("input_gate", &mut self.input_gate),
            ("forget_gate", &mut self.forget_gate),
            ("output_gate", &mut self.output_gate),
            ("tanh_state", &mut self.tanh_state),
            ("tanh_candidate", &mut self.tanh_candidate),
            ("past_output", &mut history.past_output),
            ("past_state", &mut history.past_state),
            ("last_output", &mut history.last_output),
            ("last_state", &mut history.last_state),
        ];
        buffers.extend(PARTIAL_NAMES.into_iter().zip(self.partials.iter_mut()));
        if let Some(errors) = history.errors_to_previous.as_mut() {
            buffers.push(("errors_to_previous.output", &mut errors.output_error));
            buffers.push(("errors_to_previous.state", &mut errors.state_error));
        }
        if let Some(errors) = history.errors_from_future.as_mut() {
            buffers.push(("errors_from_future.output", &mut errors.output_error));
            buffers.push(("errors_from_future.state", &mut errors.state_error));
        }
        let moved = self.residency.move_buffers(target, placement, &mut buffers)?;
        if moved {
            debug!(node = %self.name, device = %target, "LSTM的缓冲区已搬到目标设备");
        }
        Ok(())
    }

    fn describe(&self) -> NodeDescriptor {
        NodeDescriptor {
            name: self.name.clone(),
            node_type: NodeTypeDescriptor::Lstm {
                input_dim: self.input_dim,
                output_dim: self.output_dim,
                default_state: self.config.default_state,
            },
            output_shape: self.value.shape().to_vec(),
            input_width: self.input_dim,
            output_width: self.output_dim,
        }
    }
}
