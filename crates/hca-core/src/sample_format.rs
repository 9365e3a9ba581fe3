//! 输出 PCM 采样格式定义.

use std::fmt;
use std::str::FromStr;

use crate::HcaError;

/// 输出 PCM 采样格式
///
/// 所有格式均为交错排列 (LRLR...), 多字节格式为小端序.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleFormat {
    /// 无符号 8 位整数
    U8,
    /// 有符号 16 位整数
    S16,
    /// 有符号 24 位整数 (3 字节)
    S24,
    /// 有符号 32 位整数
    #[default]
    S32,
    /// 32 位浮点
    F32,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::S32 | Self::F32 => 4,
        }
    }

    /// 每个采样点的位数
    pub const fn bits_per_sample(&self) -> u32 {
        self.bytes_per_sample() * 8
    }

    /// 是否为浮点格式
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F32)
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::U8 => "u8",
            Self::S16 => "s16",
            Self::S24 => "s24",
            Self::S32 => "s32",
            Self::F32 => "f32",
        };
        write!(f, "{name}")
    }
}

impl FromStr for SampleFormat {
    type Err = HcaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "u8" | "8" => Ok(Self::U8),
            "s16" | "16" => Ok(Self::S16),
            "s24" | "24" => Ok(Self::S24),
            "s32" | "32" => Ok(Self::S32),
            "f32" | "flt" | "float" | "0" => Ok(Self::F32),
            other => Err(HcaError::InvalidArgument(format!(
                "未知采样格式: {other}"
            ))),
        }
    }
}
