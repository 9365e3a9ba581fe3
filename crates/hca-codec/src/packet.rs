//! 压缩数据包 (Packet).
//!
//! 表示从 HCA 文件中切出的一个数据块.

use bytes::Bytes;

/// 压缩数据包
///
/// 一个 Packet 对应一个完整的数据块 (含末尾 CRC-16), 解码后得到 1024 个采样.
#[derive(Debug, Clone)]
pub struct Packet {
    /// 块数据
    pub data: Bytes,
    /// 块序号
    pub block_index: u32,
    /// 首个采样的序号 (以采样为单位的时间戳)
    pub pts: i64,
    /// 在文件中的字节偏移量 (-1 表示未知)
    pub pos: i64,
}

impl Packet {
    /// 创建空数据包
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            block_index: 0,
            pts: 0,
            pos: -1,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包 (flush packet)
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
