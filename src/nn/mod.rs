/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 循环计算核心：序列布局、时延节点、LSTM单元与跨小批历史
 */

mod descriptor;
mod device;
mod error;
mod history;
mod layout;
mod nodes;
mod persist;

pub use descriptor::{NodeDescriptor, NodeTypeDescriptor};
pub use device::{DeviceId, DevicePlacement, HostPlacement};
pub use error::GraphError;
pub use history::{DelayedHistory, ErrorHandoff, ForwardHandoff, LstmHistory};
pub(crate) use layout::frame_order;
pub use layout::{FrameRange, MinibatchPackingFlags, SequenceLayout, build_shifted_layout};
pub use nodes::{
    CopyNodeFlags, DEFAULT_HIDDEN_ACTIVATION, DelayedValue, DelayedValueConfig, Direction, Lstm,
    LstmConfig, NodeInput, NodeType, StorageKind, TraitNode,
};
pub use persist::FormatVersion;

#[cfg(test)]
mod tests;
