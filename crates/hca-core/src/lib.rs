//! # hca-core
//!
//! HCA 库核心, 提供错误类型、比特流读写、CRC-16 校验和采样格式定义.

pub mod bitreader;
pub mod bitwriter;
pub mod crc;
pub mod error;
pub mod sample_format;

// 重导出常用类型
pub use bitreader::{BitReader, OffsetBias};
pub use bitwriter::BitWriter;
pub use error::{HcaError, HcaResult};
pub use sample_format::SampleFormat;
