/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 循环节点的公共契约。
 *                 外部调度者每个小批调用一次`evaluate`（节点内部自己遍历各帧），
 *                 在整张图前向/反向都走完后，再对每个相连的输入调用一次`compute_input_partial`。
 *                 输入以`NodeInput`显式传入，节点不会去访问某个全局的图。
 */

mod delayed_value;
mod lstm;

pub use delayed_value::{DelayedValue, DelayedValueConfig, Direction};
pub use lstm::{Lstm, LstmConfig};
#[cfg(test)]
pub(crate) use lstm::gates;

use enum_dispatch::enum_dispatch;
use std::io::{Read, Write};
use std::ops::BitOr;

use super::{
    DeviceId, DevicePlacement, FormatVersion, GraphError, NodeDescriptor, SequenceLayout,
};
use crate::tensor::Tensor;

/// 边界帧的默认隐层激活值，也是LSTM默认的初始细胞状态
pub const DEFAULT_HIDDEN_ACTIVATION: f32 = 0.1;

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓节点输入↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 输入矩阵的存储方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Dense,
    Sparse,
}

/// 传给节点的一个输入：值、梯度累加器、存储方式、是否为可学习参数
#[derive(Debug, Clone)]
pub struct NodeInput {
    name: String,
    value: Tensor,
    grad: Tensor,
    storage: StorageKind,
    learnable: bool,
}

impl NodeInput {
    /// 普通输入（如观测值、上游节点的输出）
    pub fn new(name: &str, value: Tensor) -> Self {
        Self {
            name: name.to_string(),
            value,
            grad: Tensor::empty(),
            storage: StorageKind::Dense,
            learnable: false,
        }
    }

    /// 可学习参数（如LSTM的各个门权重）
    pub fn parameter(name: &str, value: Tensor) -> Self {
        Self {
            learnable: true,
            ..Self::new(name, value)
        }
    }

    pub fn with_storage(mut self, storage: StorageKind) -> Self {
        self.storage = storage;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn value(&self) -> &Tensor {
        &self.value
    }

    pub fn set_value(&mut self, value: Tensor) {
        self.value = value;
    }

    /// 尚未有梯度时为空矩阵
    pub const fn grad(&self) -> &Tensor {
        &self.grad
    }

    pub fn clear_grad(&mut self) {
        self.grad = Tensor::empty();
    }

    pub const fn storage(&self) -> StorageKind {
        self.storage
    }

    pub const fn is_learnable(&self) -> bool {
        self.learnable
    }

    /// 梯度累加器：首次使用时按值的形状置零，形状不一致则报错
    pub(crate) fn grad_accumulator(&mut self) -> Result<&mut Tensor, GraphError> {
        if self.grad.is_empty() {
            self.grad = Tensor::zeros(self.value.shape());
        } else if !self.grad.is_same_shape(&self.value) {
            return Err(GraphError::ShapeMismatch {
                expected: self.value.shape().to_vec(),
                got: self.grad.shape().to_vec(),
                message: format!("输入`{}`的梯度与其值的形状不一致", self.name),
            });
        }
        Ok(&mut self.grad)
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑节点输入↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/// 复制节点时的选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CopyNodeFlags {
    bits: u8,
}

impl CopyNodeFlags {
    pub const NONE: Self = Self { bits: 0 };
    /// 同时复制值、历史与配置
    pub const COPY_VALUE: Self = Self { bits: 1 };

    pub const fn contains(self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }
}

impl BitOr for CopyNodeFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

/// 新分配（或重新分配）的前向缓冲区先填上哨兵值，任何未被写到的格子在调试时都能被发现。
/// 仅在debug构建中生效。
pub(crate) fn fill_sentinel(buffer: &mut Tensor) {
    if cfg!(debug_assertions) {
        buffer.fill(f32::NAN);
    }
}

/// 检查输入个数
pub(crate) fn check_input_count(inputs: &[NodeInput], expected: usize) -> Result<(), GraphError> {
    if inputs.len() != expected {
        return Err(GraphError::InvalidInputCount {
            expected,
            got: inputs.len(),
        });
    }
    Ok(())
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓节点（Node）特性↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
#[enum_dispatch]
#[derive(Debug, Clone)]
pub enum NodeType {
    DelayedValue(DelayedValue),
    Lstm(Lstm),
}

#[enum_dispatch(NodeType)]
pub trait TraitNode {
    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓基本↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    fn name(&self) -> &str;

    fn operation_name(&self) -> &'static str;

    fn value(&self) -> &Tensor;

    /// 下游节点写入的、关于本节点输出的梯度
    fn grad(&self) -> &Tensor;

    fn grad_mut(&mut self) -> &mut Tensor;

    /// 设置关于本节点输出的梯度，形状须与值一致
    fn set_grad(&mut self, grad: &Tensor) -> Result<(), GraphError> {
        if !grad.is_same_shape(self.value()) {
            return Err(GraphError::ShapeMismatch {
                expected: self.value().shape().to_vec(),
                got: grad.shape().to_vec(),
                message: format!("{}的梯度", self.name()),
            });
        }
        *self.grad_mut() = grad.clone();
        Ok(())
    }

    fn layout(&self) -> Option<&SequenceLayout>;

    /// 安装（或刷新）本小批的序列布局
    fn set_layout(&mut self, layout: SequenceLayout) -> Result<(), GraphError>;

    /// 构图时的结构与维度检查
    fn validate(&mut self, inputs: &[NodeInput]) -> Result<(), GraphError>;
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑基本↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓前向/反向↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    /// 对整个小批做前向计算
    fn evaluate(&mut self, inputs: &[NodeInput]) -> Result<(), GraphError>;

    /// 只计算第`t`帧
    fn evaluate_frame(&mut self, t: usize, inputs: &[NodeInput]) -> Result<(), GraphError>;

    /// 把关于第`input_index`个输入的梯度累加进该输入的梯度中
    fn compute_input_partial(
        &mut self,
        input_index: usize,
        inputs: &mut [NodeInput],
    ) -> Result<(), GraphError>;

    /// 只处理第`t`帧的梯度
    fn compute_input_partial_frame(
        &mut self,
        input_index: usize,
        t: usize,
        inputs: &mut [NodeInput],
    ) -> Result<(), GraphError>;
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑前向/反向↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

    /*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓持久化/复制/设备↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
    fn save_state(&self, sink: &mut dyn Write) -> Result<(), GraphError> {
        self.save_state_as(sink, FormatVersion::CURRENT)
    }

    /// 按指定的格式版本写出（用于生成旧版本的模型）
    fn save_state_as(&self, sink: &mut dyn Write, version: FormatVersion)
    -> Result<(), GraphError>;

    fn load_state(&mut self, source: &mut dyn Read, version: FormatVersion)
    -> Result<(), GraphError>;

    fn copy_to(&self, new_name: &str, flags: CopyNodeFlags) -> NodeType;

    fn device(&self) -> DeviceId;

    /// 把本节点拥有的所有缓冲区搬到`target`上；已在该设备上时什么也不做
    fn move_to_device(
        &mut self,
        target: DeviceId,
        placement: &mut dyn DevicePlacement,
    ) -> Result<(), GraphError>;

    fn describe(&self) -> NodeDescriptor;
    /*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑持久化/复制/设备↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑节点（Node）特性↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/
