//! # hca
//!
//! 纯 Rust 实现的 CRI HCA 音频库: 头部解析与编辑、数据块加解密、
//! 帧解包/重打包、解码为 PCM/WAV.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use hca::format::{CipherConfig, DecodeOptions};
//! use hca::core::SampleFormat;
//!
//! let mut data = std::fs::read("voice.hca").unwrap();
//! hca::format::decrypt(&mut data, &CipherConfig::from_u64(0x0000_0000_0139_5C51)).unwrap();
//! let options = DecodeOptions::new().with_sample_format(SampleFormat::S16);
//! let wav = hca::format::decode(&data, &options).unwrap();
//! std::fs::write("voice.wav", wav).unwrap();
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `hca-core` | 错误类型、比特流读写、CRC-16、采样格式 |
//! | `hca-codec` | 头部、置换加密、帧解包/打包、IMDCT、流式解码器 |
//! | `hca-format` | 文件级加解密、校验和修复、WAV 输出 |

/// 核心类型与工具
pub use hca_core as core;

/// 头部与帧编解码
pub use hca_codec as codec;

/// 文件级操作
pub use hca_format as format;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
