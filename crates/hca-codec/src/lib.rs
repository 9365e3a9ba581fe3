//! # hca-codec
//!
//! CRI HCA 编解码核心: 头部解析与修改、置换加密、帧解包/打包、
//! 频谱重建与 IMDCT 合成.
//!
//! ## 使用示例
//!
//! ```rust
//! use hca_codec::{Decoder, HcaDecoder, HcaInfo, HeaderBuilder};
//!
//! let header = HeaderBuilder::new(2, 44100).build().unwrap();
//! let info = HcaInfo::parse(&header).unwrap();
//! let decoder = HcaDecoder::new(&info).unwrap();
//! assert_eq!(decoder.name(), "hca");
//! ```

pub mod audio_frame;
pub mod channel;
pub mod cipher;
pub mod decoder;
pub mod decoders;
pub mod frame;
pub mod header;
pub mod mdct;
pub mod packet;
pub mod packing;
pub mod synthesis;
pub mod tables;

/// 每帧采样数
pub const SAMPLES_PER_FRAME: usize = 1024;
/// 每帧子帧数
pub const SUBFRAMES_PER_FRAME: usize = 8;
/// 子帧采样数的位数
pub const SUBFRAME_SAMPLES_BITS: u32 = 7;
/// 每个子帧的采样数
pub const SAMPLES_PER_SUBFRAME: usize = 1 << SUBFRAME_SAMPLES_BITS;

// 重导出常用类型
pub use audio_frame::AudioFrame;
pub use channel::{Channel, ChannelType};
pub use cipher::{Cipher, CipherConfig, CipherKey, is_header_masked};
pub use decoder::Decoder;
pub use decoders::HcaDecoder;
pub use frame::HcaFrame;
pub use header::{HcaInfo, HeaderBuilder, fix_header_checksum};
pub use mdct::{Mdct, MdctTableCache};
pub use packet::Packet;
pub use packing::{calculate_resolution, pack_frame, unpack_frame};
pub use synthesis::decode_frame;
