//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从字节缓冲区读取, 供 HCA 帧解包使用.
//!
//! 读取越过缓冲区末尾时按 0 补齐而不是报错: 帧解包在结束后统一检查剩余位数,
//! 因此读取位置允许超过数据长度, 此时 [`BitReader::remaining`] 为负.

/// 偏移二进制的偏置方向
///
/// 正偏置可以多表示一个正值, 负偏置可以多表示一个负值.
/// 例如 4 位正偏置可表示 8 到 -7, 4 位负偏置可表示 7 到 -8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffsetBias {
    /// 正偏置
    Positive = 1,
    /// 负偏置
    Negative = 0,
}

/// 比特流读取器
///
/// # 示例
/// ```
/// use hca_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4), 0b1011);
/// assert_eq!(br.read_bits(4), 0b0001);
/// assert_eq!(br.read_bits(8), 0b01010101);
/// assert_eq!(br.remaining(), 0);
/// ```
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前位位置
    position: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// 数据总位数
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

    /// 剩余位数, 读取越界后为负
    pub fn remaining(&self) -> i64 {
        self.length_bits() as i64 - self.position as i64
    }

    /// 窥视 N 个位 (最多 32 位, 不移动位置)
    ///
    /// 超出数据末尾的位按 0 补齐.
    pub fn peek_bits(&self, n: u32) -> u32 {
        debug_assert!(n <= 32, "peek_bits: n={} 超过 32 位", n);
        if n == 0 {
            return 0;
        }

        let mut value: u64 = 0;
        let mut pos = self.position;
        let mut remaining = n;
        while remaining > 0 {
            let byte_index = pos / 8;
            let bit_index = (pos % 8) as u32;
            let to_read = remaining.min(8 - bit_index);
            let byte = self.data.get(byte_index).copied().unwrap_or(0);
            let bits = (byte >> (8 - bit_index - to_read)) & (0xFF >> (8 - to_read));
            value = (value << to_read) | u64::from(bits);
            pos += to_read as usize;
            remaining -= to_read;
        }
        value as u32
    }

    /// 读取 N 个位 (最多 32 位)
    pub fn read_bits(&mut self, n: u32) -> u32 {
        let value = self.peek_bits(n);
        self.position += n as usize;
        value
    }

    /// 读取 1 个位并转为布尔值
    pub fn read_bool(&mut self) -> bool {
        self.read_bits(1) == 1
    }

    /// 读取偏移二进制编码的有符号值
    ///
    /// 偏移量为 `(1 << (n - 1)) - bias`. `n` 为 0 时不消耗位, 返回 0.
    pub fn read_offset_binary(&mut self, n: u32, bias: OffsetBias) -> i32 {
        if n == 0 {
            return 0;
        }
        let offset = (1i32 << (n - 1)) - bias as i32;
        let value = self.peek_bits(n) as i32 - offset;
        self.position += n as usize;
        value
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: u32) {
        self.position += n as usize;
    }

    /// 将位置对齐到 `multiple` 的整数倍
    pub fn align_position(&mut self, multiple: usize) {
        if multiple > 1 {
            self.position = self.position.div_ceil(multiple) * multiple;
        }
    }

    /// 获取底层数据的引用
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}
