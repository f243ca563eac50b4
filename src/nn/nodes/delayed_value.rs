/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 时延节点（PastValue / FutureValue）。
 *                 第`t`帧的输出取自输入第`t + 方向·S`帧的值；越过小批边界时取自上一小批留下的历史，
 *                 遇到序列边界（移位边界表中带触发标志的格子）时输出初始激活值。
 *                 过去与未来两个方向共用同一套前向/反向逻辑，只是步长符号、触发标志与遍历顺序不同。
 */

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::{debug, trace};

use super::{
    CopyNodeFlags, DEFAULT_HIDDEN_ACTIVATION, NodeInput, NodeType, TraitNode, check_input_count,
    fill_sentinel,
};
use crate::nn::device::Residency;
use crate::nn::persist::{read_field, write_field};
use crate::nn::{
    DelayedHistory, DeviceId, DevicePlacement, FormatVersion, FrameRange, GraphError,
    MinibatchPackingFlags, NodeDescriptor, NodeTypeDescriptor, SequenceLayout,
    build_shifted_layout, frame_order,
};
use crate::tensor::Tensor;

/// 时延的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// 取过去的值，序列开头处重置
    #[default]
    Past,
    /// 取未来的值，序列结尾处重置
    Future,
}

impl Direction {
    pub const fn sign(self) -> isize {
        match self {
            Self::Past => -1,
            Self::Future => 1,
        }
    }

    /// 触发重置的边界标志
    pub const fn trigger(self) -> MinibatchPackingFlags {
        match self {
            Self::Past => MinibatchPackingFlags::SEQUENCE_START,
            Self::Future => MinibatchPackingFlags::SEQUENCE_END,
        }
    }

    pub const fn operation_name(self) -> &'static str {
        match self {
            Self::Past => "PastValue",
            Self::Future => "FutureValue",
        }
    }

    // 前向按时间正序，反向按逆序；未来方向正好相反
    const fn evaluates_ascending(self) -> bool {
        matches!(self, Self::Past)
    }
}

/// 时延节点的配置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayedValueConfig {
    pub direction: Direction,
    /// 时延的帧数`S`，须≥1
    pub time_step: usize,
    /// 边界帧上输出的常数
    pub initial_activation: f32,
    pub rows: usize,
    pub cols: usize,
}

impl Default for DelayedValueConfig {
    fn default() -> Self {
        Self {
            direction: Direction::Past,
            time_step: 1,
            initial_activation: DEFAULT_HIDDEN_ACTIVATION,
            rows: 1,
            cols: 1,
        }
    }
}

impl DelayedValueConfig {
    pub fn past(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            ..Self::default()
        }
    }

    pub fn future(rows: usize, cols: usize) -> Self {
        Self {
            direction: Direction::Future,
            ..Self::past(rows, cols)
        }
    }

    pub const fn with_time_step(mut self, time_step: usize) -> Self {
        self.time_step = time_step;
        self
    }

    pub const fn with_initial_activation(mut self, initial_activation: f32) -> Self {
        self.initial_activation = initial_activation;
        self
    }
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓单帧计算（纯函数）↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
fn check_source(source: &Tensor, rows: usize, start: usize, len: usize) -> Result<(), GraphError> {
    if source.rows() != rows {
        return Err(GraphError::DimensionMismatch {
            expected: rows,
            got: source.rows(),
            message: "时延节点的数据来源与输出的行数不一致".to_string(),
        });
    }
    if start + len > source.cols() {
        return Err(GraphError::ComputationError(format!(
            "时延读取的列区间[{start}, {})超出了数据来源的列数{}",
            start + len,
            source.cols()
        )));
    }
    Ok(())
}

/// 计算第`frame`帧的输出。
///
/// 设`d = (t + 方向·S) · 流数`：
/// - 带触发标志的流直接写入`initial_activation`；
/// - 其余流在`d`落在本小批内时复制输入的第`d`列，否则复制历史缓冲区中的对应列
///   （对历史宽度取模，仅作为越界保护）。
///
/// 整帧都没有触发标志时，一次性按整帧复制。
pub(crate) fn evaluate_frame_srp(
    frame: FrameRange,
    config: &DelayedValueConfig,
    output: &mut Tensor,
    delayed_activation: &Tensor,
    input: &Tensor,
    stream_flags: &[MinibatchPackingFlags],
) -> Result<(), GraphError> {
    let num_streams = frame.num_streams;
    let trigger = config.direction.trigger();
    let delayed_index = (frame.t as isize + config.direction.sign() * config.time_step as isize)
        * num_streams as isize;

    let in_range = delayed_index >= 0 && (delayed_index as usize) < input.cols();
    let (source, d) = if in_range {
        (input, delayed_index as usize)
    } else {
        let width = delayed_activation.cols();
        if width == 0 {
            return Err(GraphError::ComputationError(
                "历史缓冲区为空，无法读取本小批之外的帧".to_string(),
            ));
        }
        (
            delayed_activation,
            delayed_index.rem_euclid(width as isize) as usize,
        )
    };

    let frame_flags = stream_flags
        .iter()
        .fold(MinibatchPackingFlags::NONE, |acc, &f| acc | f);
    if frame_flags.intersects(trigger) {
        for (s, flag) in stream_flags.iter().enumerate() {
            let col = frame.start_col() + s;
            if flag.intersects(trigger) {
                output.fill_column_slice(col, 1, config.initial_activation);
            } else {
                check_source(source, output.rows(), d + s, 1)?;
                output.copy_columns_from(col, source, d + s, 1);
            }
        }
    } else {
        check_source(source, output.rows(), d, num_streams)?;
        output.copy_columns_from(frame.start_col(), source, d, num_streams);
    }
    Ok(())
}

/// 把第`frame`帧的梯度累加到输入梯度的第`t + 方向·S`帧上。
///
/// 目标帧超出本小批时丢弃；带触发标志或无输入的流也丢弃（边界帧不向被时延的帧传梯度）。
pub(crate) fn compute_input_partial_srp(
    frame: FrameRange,
    config: &DelayedValueConfig,
    input_grad: &mut Tensor,
    grad: &Tensor,
    stream_flags: &[MinibatchPackingFlags],
) {
    let num_streams = frame.num_streams;
    if num_streams == 0 {
        return;
    }
    let num_frames = grad.cols() / num_streams;
    let delayed_frame = frame.t as isize + config.direction.sign() * config.time_step as isize;
    if delayed_frame < 0 || delayed_frame as usize >= num_frames {
        return;
    }
    let d = delayed_frame as usize * num_streams;

    let skip = config.direction.trigger() | MinibatchPackingFlags::NO_FEATURE;
    let frame_flags = stream_flags
        .iter()
        .fold(MinibatchPackingFlags::NONE, |acc, &f| acc | f);
    if frame_flags.intersects(skip) {
        for (s, flag) in stream_flags.iter().enumerate() {
            if !flag.intersects(skip) {
                input_grad.add_columns_from(d + s, grad, frame.start_col() + s, 1);
            }
        }
    } else {
        input_grad.add_columns_from(d, grad, frame.start_col(), num_streams);
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑单帧计算（纯函数）↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/// 时延节点。首次`set_layout`之前处于未就绪状态，之后一直就绪，直到显式`reset`。
#[derive(Debug, Clone)]
pub struct DelayedValue {
    name: String,
    config: DelayedValueConfig,
    value: Tensor,
    grad: Tensor,
    history: DelayedHistory,
    layout: Option<SequenceLayout>,
    shifted: Option<SequenceLayout>,
    residency: Residency,
}

impl DelayedValue {
    pub fn new(name: &str, config: DelayedValueConfig) -> Result<Self, GraphError> {
        if config.time_step == 0 {
            return Err(GraphError::InvalidConfig("时间步长必须大于0".to_string()));
        }
        let shape = [config.rows, config.cols];
        Ok(Self {
            name: name.to_string(),
            config,
            value: Tensor::filled(&shape, config.initial_activation),
            grad: Tensor::zeros(&shape),
            history: DelayedHistory::filled(config.rows, config.cols, config.initial_activation),
            layout: None,
            shifted: None,
            residency: Residency::default(),
        })
    }

    pub const fn config(&self) -> &DelayedValueConfig {
        &self.config
    }

    pub const fn direction(&self) -> Direction {
        self.config.direction
    }

    pub const fn time_step(&self) -> usize {
        self.config.time_step
    }

    pub const fn initial_activation(&self) -> f32 {
        self.config.initial_activation
    }

    /// 修改时延步长；已安装布局时会重建移位边界表
    pub fn set_time_step(&mut self, time_step: usize) -> Result<(), GraphError> {
        if time_step == 0 {
            return Err(GraphError::InvalidConfig("时间步长必须大于0".to_string()));
        }
        self.config.time_step = time_step;
        if let Some(layout) = &self.layout {
            self.shifted = Some(self.build_shifted(layout)?);
        }
        Ok(())
    }

    pub const fn is_ready(&self) -> bool {
        self.shifted.is_some()
    }

    /// 按步长处理后的边界表
    pub const fn shifted_layout(&self) -> Option<&SequenceLayout> {
        self.shifted.as_ref()
    }

    /// 第`t`帧第`stream`条流在移位边界表中的标志
    pub fn segment_info(&self, t: usize, stream: usize) -> Result<MinibatchPackingFlags, GraphError> {
        self.shifted
            .as_ref()
            .ok_or_else(|| self.not_ready())?
            .checked_flag(t, stream)
    }

    /// 回到未就绪状态，并把输出与历史恢复为初始激活值
    pub fn reset(&mut self) {
        let (rows, cols) = (self.value.rows(), self.value.cols());
        self.layout = None;
        self.shifted = None;
        self.value.fill(self.config.initial_activation);
        self.grad.fill(0.);
        self.history = DelayedHistory::filled(rows, cols, self.config.initial_activation);
    }

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓历史↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    pub const fn get_history(&self) -> &Tensor {
        &self.history.activation
    }

    /// 显式注入历史（逐步解码等场景）。下一次逐帧计算的首帧将直接使用它，而不会用输入覆盖
    pub fn set_history(&mut self, history: &Tensor) -> Result<(), GraphError> {
        if history.rows() != self.value.rows() {
            return Err(GraphError::DimensionMismatch {
                expected: self.value.rows(),
                got: history.rows(),
                message: "历史的行数须与节点输出一致".to_string(),
            });
        }
        self.history.activation = history.clone();
        self.history.explicitly_set = true;
        trace!(node = %self.name, cols = history.cols(), "时延节点的历史被显式设置");
        Ok(())
    }

    /// 交给下一个小批使用的历史
    pub fn handoff(&self) -> DelayedHistory {
        DelayedHistory {
            activation: self.history.activation.clone(),
            explicitly_set: false,
        }
    }

    pub fn accept_handoff(&mut self, handoff: DelayedHistory) -> Result<(), GraphError> {
        self.set_history(&handoff.activation)
    }
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑历史↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    fn build_shifted(&self, layout: &SequenceLayout) -> Result<SequenceLayout, GraphError> {
        build_shifted_layout(
            layout,
            self.config.time_step,
            self.config.direction.trigger(),
        )
    }

    fn not_ready(&self) -> GraphError {
        GraphError::InvalidOperation(format!("{}尚未设置序列布局", self.name))
    }

    // 输出的形状跟随输入；重新分配时先填哨兵值
    fn prepare_value(value: &mut Tensor, grad: &mut Tensor, input: &Tensor) {
        if !value.is_same_shape(input) {
            *value = Tensor::zeros(input.shape());
            fill_sentinel(value);
            *grad = Tensor::zeros(input.shape());
        }
    }

    fn check_gradient_inputs(&self, input_index: usize, inputs: &[NodeInput]) -> Result<(), GraphError> {
        if input_index != 0 {
            return Err(GraphError::InvalidOperation(format!(
                "{}只有1个输入，不存在第{input_index}个输入",
                self.config.direction.operation_name()
            )));
        }
        check_input_count(inputs, 1)?;
        if !self.grad.is_same_shape(&self.value) {
            return Err(GraphError::ShapeMismatch {
                expected: self.value.shape().to_vec(),
                got: self.grad.shape().to_vec(),
                message: format!("{}的梯度与值的形状不一致", self.name),
            });
        }
        if !inputs[0].value().is_same_shape(&self.value) {
            return Err(GraphError::ShapeMismatch {
                expected: self.value.shape().to_vec(),
                got: inputs[0].value().shape().to_vec(),
                message: format!("{}的输入与输出的形状不一致", self.name),
            });
        }
        Ok(())
    }
}

impl TraitNode for DelayedValue {
    fn name(&self) -> &str {
        &self.name
    }

    fn operation_name(&self) -> &'static str {
        self.config.direction.operation_name()
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
        let shifted = self.build_shifted(&layout)?;
        debug!(
            node = %self.name,
            streams = layout.num_streams(),
            frames = layout.num_frames(),
            time_step = self.config.time_step,
            "时延节点安装序列布局"
        );
        self.layout = Some(layout);
        self.shifted = Some(shifted);
        Ok(())
    }

    fn validate(&mut self, inputs: &[NodeInput]) -> Result<(), GraphError> {
        check_input_count(inputs, 1)?;
        let input = inputs[0].value();
        if !input.is_empty() {
            let (rows, cols) = (input.rows(), input.cols());
            if !self.value.is_same_shape(input) {
                self.value.resize_filled(rows, cols, self.config.initial_activation);
                self.grad.resize_filled(rows, cols, 0.);
            }
            if self.history.activation.rows() != rows {
                self.history =
                    DelayedHistory::filled(rows, cols, self.config.initial_activation);
            }
            self.config.rows = rows;
            self.config.cols = cols;
        }
        Ok(())
    }

    fn evaluate(&mut self, inputs: &[NodeInput]) -> Result<(), GraphError> {
        check_input_count(inputs, 1)?;
        let input = inputs[0].value();
        let shifted = self.shifted.as_ref().ok_or_else(|| self.not_ready())?;
        shifted.check_columns(input.cols(), "时延节点的输入")?;
        Self::prepare_value(&mut self.value, &mut self.grad, input);

        let ascending = self.config.direction.evaluates_ascending();
        for t in frame_order(shifted.num_frames(), ascending) {
            evaluate_frame_srp(
                shifted.frame(t),
                &self.config,
                &mut self.value,
                &self.history.activation,
                input,
                shifted.stream_flags(t),
            )?;
        }

        // 留给下一个小批
        self.history.activation = input.clone();
        self.history.explicitly_set = false;
        trace!(node = %self.name, norm = self.value.frobenius_norm(), "时延节点前向完成");
        Ok(())
    }

    fn evaluate_frame(&mut self, t: usize, inputs: &[NodeInput]) -> Result<(), GraphError> {
        check_input_count(inputs, 1)?;
        let input = inputs[0].value();
        let shifted = self.shifted.as_ref().ok_or_else(|| self.not_ready())?;
        shifted.check_columns(input.cols(), "时延节点的输入")?;
        let num_frames = shifted.num_frames();
        if t >= num_frames {
            return Err(GraphError::InvalidOperation(format!(
                "帧{t}超出本小批的帧数{num_frames}"
            )));
        }
        Self::prepare_value(&mut self.value, &mut self.grad, input);

        // 走到小批的起点时，输入尚未更新，它的值就是“上一小批”的值
        let refresh_at = match self.config.direction {
            Direction::Past => 0,
            Direction::Future => num_frames - 1,
        };
        if t == refresh_at {
            if self.history.explicitly_set {
                self.history.explicitly_set = false;
            } else {
                self.history.activation = input.clone();
            }
        }

        evaluate_frame_srp(
            shifted.frame(t),
            &self.config,
            &mut self.value,
            &self.history.activation,
            input,
            shifted.stream_flags(t),
        )
    }

    fn compute_input_partial(
        &mut self,
        input_index: usize,
        inputs: &mut [NodeInput],
    ) -> Result<(), GraphError> {
        self.check_gradient_inputs(input_index, inputs)?;
        let shifted = self.shifted.as_ref().ok_or_else(|| self.not_ready())?;
        shifted.check_columns(self.grad.cols(), "时延节点的梯度")?;

        let input_grad = inputs[0].grad_accumulator()?;
        let ascending = !self.config.direction.evaluates_ascending();
        for t in frame_order(shifted.num_frames(), ascending) {
            compute_input_partial_srp(
                shifted.frame(t),
                &self.config,
                input_grad,
                &self.grad,
                shifted.stream_flags(t),
            );
        }
        debug!(
            node = %self.name,
            norm = input_grad.frobenius_norm(),
            "时延节点的输入梯度"
        );
        Ok(())
    }

    fn compute_input_partial_frame(
        &mut self,
        input_index: usize,
        t: usize,
        inputs: &mut [NodeInput],
    ) -> Result<(), GraphError> {
        self.check_gradient_inputs(input_index, inputs)?;
        let shifted = self.shifted.as_ref().ok_or_else(|| self.not_ready())?;
        shifted.check_columns(self.grad.cols(), "时延节点的梯度")?;
        if t >= shifted.num_frames() {
            return Err(GraphError::InvalidOperation(format!(
                "帧{t}超出本小批的帧数{}",
                shifted.num_frames()
            )));
        }

        let input_grad = inputs[0].grad_accumulator()?;
        compute_input_partial_srp(
            shifted.frame(t),
            &self.config,
            input_grad,
            &self.grad,
            shifted.stream_flags(t),
        );
        Ok(())
    }

    fn save_state_as(&self, sink: &mut dyn Write, version: FormatVersion) -> Result<(), GraphError> {
        write_field(sink, &self.config.time_step)?;
        write_field(sink, &self.value.rows())?;
        write_field(sink, &self.value.cols())?;
        if version >= FormatVersion::V2 {
            write_field(sink, &self.config.initial_activation)?;
        }
        Ok(())
    }

    fn load_state(&mut self, source: &mut dyn Read, version: FormatVersion) -> Result<(), GraphError> {
        let time_step: usize = read_field(source)?;
        if time_step == 0 {
            return Err(GraphError::InvalidConfig("时间步长必须大于0".to_string()));
        }
        let rows: usize = read_field(source)?;
        let cols: usize = read_field(source)?;
        let initial_activation = if version >= FormatVersion::V2 {
            read_field(source)?
        } else {
            DEFAULT_HIDDEN_ACTIVATION
        };

        self.config.time_step = time_step;
        self.config.rows = rows;
        self.config.cols = cols;
        self.config.initial_activation = initial_activation;
        self.value = Tensor::filled(&[rows, cols], initial_activation);
        self.grad = Tensor::zeros(&[rows, cols]);
        self.history = DelayedHistory::filled(rows, cols, initial_activation);
        if let Some(layout) = &self.layout {
            self.shifted = Some(self.build_shifted(layout)?);
        }
        debug!(node = %self.name, ?version, time_step, rows, cols, "时延节点加载完成");
        Ok(())
    }

    fn copy_to(&self, new_name: &str, flags: CopyNodeFlags) -> NodeType {
        let shape = self.value.shape().to_vec();
        let mut node = Self {
            name: new_name.to_string(),
            config: self.config,
            value: Tensor::filled(&shape, self.config.initial_activation),
            grad: Tensor::zeros(&shape),
            history: DelayedHistory::filled(shape[0], shape[1], self.config.initial_activation),
            layout: None,
            shifted: None,
            residency: self.residency,
        };
        if flags.contains(CopyNodeFlags::COPY_VALUE) {
            node.value = self.value.clone();
            node.history = self.handoff();
            node.layout = self.layout.clone();
            node.shifted = self.shifted.clone();
        }
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
        let moved = self.residency.move_buffers(
            target,
            placement,
            &mut [
                ("value", &mut self.value),
                ("grad", &mut self.grad),
                ("delayed_activation", &mut self.history.activation),
            ],
        )?;
        if moved {
            debug!(node = %self.name, device = %target, "时延节点的缓冲区已搬到目标设备");
        }
        Ok(())
    }

    fn describe(&self) -> NodeDescriptor {
        NodeDescriptor {
            name: self.name.clone(),
            node_type: NodeTypeDescriptor::DelayedValue {
                direction: self.config.direction,
                time_step: self.config.time_step,
                initial_activation: self.config.initial_activation,
            },
            output_shape: self.value.shape().to_vec(),
            input_width: self.value.rows(),
            output_width: self.value.rows(),
        }
    }
}
