//! # hca-format
//!
//! HCA 文件级操作: 加密/解密、校验和修复、解码为 WAV.
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use hca_format::{CipherConfig, DecodeOptions};
//!
//! let mut data = std::fs::read("bgm.hca").unwrap();
//! hca_format::decrypt(&mut data, &CipherConfig::DefaultKeys).unwrap();
//! let wav = hca_format::decode(&data, &DecodeOptions::default()).unwrap();
//! std::fs::write("bgm.wav", wav).unwrap();
//! ```

pub mod checksum;
pub mod crypt;
pub mod decode;
pub mod pcm;
pub mod wav;

// 重导出常用类型
pub use checksum::fix_checksum;
pub use crypt::{decrypt, encrypt};
pub use decode::{DecodeOptions, FrameErrorPolicy, decode, decode_many, decode_with_cache};
pub use hca_codec::{CipherConfig, CipherKey, HcaInfo, fix_header_checksum};
pub use wav::{WavLoop, WavMuxer, WavSpec};
