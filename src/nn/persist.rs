/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 节点标量状态的持久化。
 *                 只保存少数几个标量字段（步长、形状、初始值等），模型文件的其余封装不在这里处理。
 *                 字段依次用bincode写出，读入时按格式版本决定是否存在某个字段。
 */

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::nn::GraphError;

/// 持久化格式版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FormatVersion {
    /// 早期格式：时延节点不含初始激活值，LSTM不含输入/输出维度
    V1,
    V2,
}

impl FormatVersion {
    pub const CURRENT: Self = Self::V2;
}

pub(crate) fn write_field<T: Serialize>(sink: &mut dyn Write, field: &T) -> Result<(), GraphError> {
    bincode::serialize_into(sink, field)?;
    Ok(())
}

pub(crate) fn read_field<T: DeserializeOwned>(source: &mut dyn Read) -> Result<T, GraphError> {
    Ok(bincode::deserialize_from(source)?)
}
