//! 浮点采样到 PCM 字节的转换.
//!
//! 每个采样先乘以音量并裁剪到 `[-1, 1]`, 再按采样格式量化:
//! - U8: `f * 127 + 128`
//! - S16/S24/S32: `f * (2^(n-1) - 1)`, 小端序
//! - F32: IEEE 754 单精度, 小端序

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use hca_core::{HcaResult, SampleFormat};

/// 将交错的浮点采样写为 PCM 字节
pub fn write_samples<W: Write>(
    samples: &[f64],
    format: SampleFormat,
    volume: f64,
    out: &mut W,
) -> HcaResult<()> {
    for &sample in samples {
        let f = (sample * volume).clamp(-1.0, 1.0);
        match format {
            SampleFormat::U8 => out.write_u8((f * 127.0 + 128.0) as u8)?,
            SampleFormat::S16 => out.write_i16::<LittleEndian>((f * 32767.0) as i16)?,
            SampleFormat::S24 => out.write_i24::<LittleEndian>((f * 8_388_607.0) as i32)?,
            SampleFormat::S32 => out.write_i32::<LittleEndian>((f * 2_147_483_647.0) as i32)?,
            SampleFormat::F32 => out.write_f32::<LittleEndian>(f as f32)?,
        }
    }
    Ok(())
}

/// 将交错的浮点采样转换为新的 PCM 缓冲区
pub fn to_pcm_bytes(samples: &[f64], format: SampleFormat, volume: f64) -> HcaResult<Vec<u8>> {
    let mut out = Vec::with_capacity(samples.len() * format.bytes_per_sample() as usize);
    write_samples(samples, format, volume, &mut out)?;
    Ok(out)
}
