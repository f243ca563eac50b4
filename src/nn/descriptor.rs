/*
 * @Author       : 老董
 * @Date         : 2025-12-27
 * @Description  : 节点描述符：可序列化为JSON的节点信息，用于调试输出与模型检查
 */

use serde::{Deserialize, Serialize};

use crate::nn::GraphError;
use crate::nn::nodes::Direction;

/// 节点描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    /// 节点名称
    pub name: String,
    /// 节点类型
    pub node_type: NodeTypeDescriptor,
    /// 输出形状
    pub output_shape: Vec<usize>,
    /// 输入宽度（行数）
    pub input_width: usize,
    /// 输出宽度（行数）
    pub output_width: usize,
}

/// 节点类型描述（包含类型特定参数）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeTypeDescriptor {
    DelayedValue {
        direction: Direction,
        time_step: usize,
        initial_activation: f32,
    },
    Lstm {
        input_dim: usize,
        output_dim: usize,
        default_state: f32,
    },
}

impl NodeDescriptor {
    /// 转换为 JSON 字符串
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 从 JSON 字符串解析
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }
}
