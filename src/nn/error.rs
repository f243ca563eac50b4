/*
 * @Author       : 老董
 * @Date         : 2026-01-27
 * @Description  : 循环节点的错误类型。
 *                 这里的错误都是结构性的致命错误（输入个数、稠密性、维度、步长、布局），
 *                 没有重试语义：一旦出错，整个计算图的本轮运行就应中止。
 */

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GraphError {
    #[error("非法操作：{0}")]
    InvalidOperation(String),
    #[error("形状不匹配（{message}）：期望{expected:?}，实际为{got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
        message: String,
    },
    #[error("维度不匹配（{message}）：期望{expected}，实际为{got}")]
    DimensionMismatch {
        expected: usize,
        got: usize,
        message: String,
    },
    #[error("输入节点个数不对：期望{expected}个，实际为{got}个")]
    InvalidInputCount { expected: usize, got: usize },
    #[error("配置错误：{0}")]
    InvalidConfig(String),
    #[error("计算错误：{0}")]
    ComputationError(String),
    #[error("（反）序列化失败：{0}")]
    Serialization(String),
}

impl From<bincode::Error> for GraphError {
    fn from(e: bincode::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
