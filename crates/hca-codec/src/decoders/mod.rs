//! 解码器实现.

pub mod hca;

pub use hca::HcaDecoder;
