/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 计算设备与缓冲区驻留。
 *                 缓冲区放在哪个设备上由外部的资源管理者决定，节点只在使用前请求“确保驻留在设备D上”。
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::nn::GraphError;
use crate::tensor::Tensor;

/// 计算设备编号，`HOST`表示主机内存
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub i32);

impl DeviceId {
    pub const HOST: Self = Self(-1);

    pub const fn is_host(self) -> bool {
        self.0 < 0
    }
}

impl Default for DeviceId {
    fn default() -> Self {
        Self::HOST
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_host() {
            write!(f, "host")
        } else {
            write!(f, "device:{}", self.0)
        }
    }
}

/// 外部资源管理者提供的能力：把一个缓冲区搬到目标设备上
pub trait DevicePlacement {
    /// `buffer_name`仅用于诊断
    fn ensure_resident(
        &mut self,
        buffer_name: &str,
        buffer: &mut Tensor,
        target: DeviceId,
    ) -> Result<(), GraphError>;
}

/// 只有主机内存的默认实现
#[derive(Debug, Default, Clone, Copy)]
pub struct HostPlacement;

impl DevicePlacement for HostPlacement {
    fn ensure_resident(
        &mut self,
        buffer_name: &str,
        _buffer: &mut Tensor,
        target: DeviceId,
    ) -> Result<(), GraphError> {
        if target.is_host() {
            Ok(())
        } else {
            Err(GraphError::InvalidOperation(format!(
                "HostPlacement无法把缓冲区`{buffer_name}`放到{target}上"
            )))
        }
    }
}

/// 节点一侧的驻留记录：已在目标设备上时不做任何事
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Residency {
    device: DeviceId,
}

impl Residency {
    pub(crate) const fn device(&self) -> DeviceId {
        self.device
    }

    /// 返回`true`表示确实发生了搬移
    pub(crate) fn move_buffers(
        &mut self,
        target: DeviceId,
        placement: &mut dyn DevicePlacement,
        buffers: &mut [(&str, &mut Tensor)],
    ) -> Result<bool, GraphError> {
        if self.device == target {
            return Ok(false);
        }
        for (name, buffer) in buffers.iter_mut() {
            placement.ensure_resident(name, &mut **buffer, target)?;
        }
        self.device = target;
        Ok(true)
    }
}
