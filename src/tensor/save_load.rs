use std::io::{Read, Write};

use super::Tensor;

// 保存和加载矩阵
impl Tensor {
    /// 将单个矩阵写入`writer`
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<(), bincode::Error> {
        bincode::serialize_into(writer, &self.data)
    }
    /// 从`reader`加载单个矩阵
    pub fn load<R: Read>(reader: &mut R) -> Result<Self, bincode::Error> {
        let data = bincode::deserialize_from(reader)?;
        Ok(Self { data })
    }
}
