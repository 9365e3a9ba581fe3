//! 比特流写入器.
//!
//! 向固定容量的字节缓冲区按位写入 (MSB first), 与 [`BitReader`](crate::bitreader::BitReader) 对应.
//! HCA 帧的大小由头部固定, 写入超出容量时返回 [`HcaError::BufferExhausted`].

use crate::{HcaError, HcaResult};

/// 比特流写入器
///
/// # 示例
/// ```
/// use hca_core::bitwriter::BitWriter;
///
/// let mut buf = [0u8; 2];
/// let mut bw = BitWriter::new(&mut buf);
/// bw.write_bits(0b1011, 4).unwrap();
/// bw.write_bits(0b0001, 4).unwrap();
/// bw.write_bits(0b01010101, 8).unwrap();
/// assert!(bw.write_bits(1, 1).is_err());
/// assert_eq!(buf, [0b10110001, 0b01010101]);
/// ```
pub struct BitWriter<'a> {
    /// 输出缓冲区
    data: &'a mut [u8],
    /// 当前位位置
    position: usize,
}

impl<'a> BitWriter<'a> {
    /// 在给定缓冲区上创建写入器, 从第 0 位开始
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// 缓冲区总位数
    pub fn length_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// 当前位位置
    pub fn position(&self) -> usize {
        self.position
    }

    /// 设置当前位位置
    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// 剩余可写位数
    pub fn remaining(&self) -> usize {
        self.length_bits().saturating_sub(self.position)
    }

    /// 写入 N 个位 (最多 32 位)
    ///
    /// 值的低 N 位被写入, 高位在前. 目标位置原有的位被覆盖.
    pub fn write_bits(&mut self, value: u32, n: u32) -> HcaResult<()> {
        debug_assert!(n <= 32, "write_bits: n={} 超过 32 位", n);
        if n as usize > self.remaining() {
            return Err(HcaError::BufferExhausted {
                requested: n as usize,
                remaining: self.remaining(),
            });
        }

        let mut remaining = n;
        while remaining > 0 {
            let byte_index = self.position / 8;
            let bit_index = (self.position % 8) as u32;
            let to_write = remaining.min(8 - bit_index);

            // 取出 value 中接下来要写入的 to_write 位
            let shift = remaining - to_write;
            let bits = ((u64::from(value) >> shift) & ((1u64 << to_write) - 1)) as u8;
            let offset = 8 - bit_index - to_write;
            let mask = (((1u16 << to_write) - 1) as u8) << offset;

            let byte = &mut self.data[byte_index];
            *byte = (*byte & !mask) | (bits << offset);

            self.position += to_write as usize;
            remaining -= to_write;
        }
        Ok(())
    }

    /// 写入 1 个位
    pub fn write_bool(&mut self, bit: bool) -> HcaResult<()> {
        self.write_bits(u32::from(bit), 1)
    }

    /// 用 0 填充到 `multiple` 位的整数倍
    pub fn align_position(&mut self, multiple: usize) -> HcaResult<()> {
        if multiple <= 1 {
            return Ok(());
        }
        let target = self.position.div_ceil(multiple) * multiple;
        let mut pad = target - self.position;
        while pad > 0 {
            let n = pad.min(32);
            self.write_bits(0, n as u32)?;
            pad -= n;
        }
        Ok(())
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &[u8] {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitreader::BitReader;

    #[test]
    fn test_write_bits_basic() {
        let mut buf = [0u8; 1];
        let mut bw = BitWriter::new(&mut buf);
        bw.write_bits(0b1011, 4).unwrap();
        bw.write_bits(0b0001, 4).unwrap();
        assert_eq!(buf, [0b10110001]);
    }

    #[test]
    fn test_write_bits_32_bit() {
        let mut buf = [0u8; 5];
        let mut bw = BitWriter::new(&mut buf);
        bw.write_bits(0b1, 1).unwrap();
        bw.write_bits(0xFF00FF00, 32).unwrap();
        assert_eq!(buf, [0xFF, 0x80, 0x7F, 0x80, 0x00]);
    }

    #[test]
    fn test_覆盖已有数据() {
        let mut buf = [0xFFu8; 2];
        let mut bw = BitWriter::new(&mut buf);
        bw.set_position(4);
        bw.write_bits(0, 8).unwrap();
        assert_eq!(buf, [0xF0, 0x0F]);
    }

    #[test]
    fn test_容量不足() {
        let mut buf = [0u8; 1];
        let mut bw = BitWriter::new(&mut buf);
        bw.write_bits(0, 5).unwrap();
        let err = bw.write_bits(0, 4).unwrap_err();
        assert!(matches!(
            err,
            HcaError::BufferExhausted {
                requested: 4,
                remaining: 3
            }
        ));
    }

    #[test]
    fn test_align_position() {
        let mut buf = [0xAAu8; 2];
        let mut bw = BitWriter::new(&mut buf);
        bw.write_bits(0b101, 3).unwrap();
        bw.align_position(8).unwrap();
        assert_eq!(bw.position(), 8);
        bw.write_bits(0xFF, 8).unwrap();
        assert_eq!(buf, [0b10100000, 0xFF]);
    }

    #[test]
    fn test_read_write_roundtrip_bits() {
        let mut buf = [0u8; 4];
        let mut bw = BitWriter::new(&mut buf);
        bw.write_bits(0b10110, 5).unwrap();
        bw.write_bits(0xFFFF, 16).unwrap();
        bw.write_bool(false).unwrap();
        bw.write_bits(0x2A, 6).unwrap();

        let mut br = BitReader::new(&buf);
        assert_eq!(br.read_bits(5), 0b10110);
        assert_eq!(br.read_bits(16), 0xFFFF);
        assert!(!br.read_bool());
        assert_eq!(br.read_bits(6), 0x2A);
    }
}
