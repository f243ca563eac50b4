//! # Only RNN
//!
//! `only_rnn`是静态图序列学习引擎的循环计算核心：
//! 时延节点（`PastValue`/`FutureValue`）用于一步（或多步）滞后的递推，
//! 融合的LSTM单元一次处理整个小批并完成BPTT。
//! 多条变长序列按列打包在同一个小批中，序列边界由`SequenceLayout`描述，
//! 跨小批的状态与误差通过显式的交接记录传递。
//!

pub mod errors;
pub mod nn;
pub mod tensor;
pub mod utils;
