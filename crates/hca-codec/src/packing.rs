//! 帧的解包与打包.
//!
//! 帧布局 (大端位序):
//! - 同步字 `0xFFFF` (16 位), 可接受噪声电平 (9 位), 评估边界 (7 位)
//! - 每声道: 比例因子差分位数 (3 位) 与比例因子, 从声道的强度值或高频重建组缩放
//! - 8 个子帧 x 每声道的量化频谱
//! - 0 填充, 末尾 2 字节 CRC-16

use hca_core::{BitReader, BitWriter, HcaError, HcaResult, OffsetBias};

use crate::SUBFRAMES_PER_FRAME;
use crate::channel::{Channel, ChannelType};
use crate::frame::HcaFrame;
use crate::tables::{
    QUANTIZED_SPECTRUM_BITS, QUANTIZED_SPECTRUM_MAX_BITS, QUANTIZED_SPECTRUM_VALUE,
    RESOLUTION_MAX_VALUES, SCALE_TO_RESOLUTION_CURVE, quantized_spectrum_code,
};

const SYNC_WORD: u32 = 0xFFFF;
const SCALE_FACTOR_BITS: u32 = 6;

/// 由比例因子与噪声电平计算分辨率
pub fn calculate_resolution(scale_factor: i32, noise_level: i32) -> i32 {
    if scale_factor == 0 {
        return 0;
    }
    let position = (noise_level - ((5 * scale_factor) >> 1) + 2).clamp(0, 58);
    i32::from(SCALE_TO_RESOLUTION_CURVE[position as usize])
}

/// 解包一个数据块到帧状态
///
/// `data` 为完整的块 (含末尾校验). 成功后各声道的比例因子、分辨率、
/// 强度/高频缩放和量化频谱均已更新.
pub fn unpack_frame(frame: &mut HcaFrame, data: &[u8]) -> HcaResult<()> {
    let mut reader = BitReader::new(data);
    unpack_frame_header(frame, &mut reader)?;
    read_spectral_coefficients(frame, &mut reader);
    check_unpacking(frame, &reader)
}

fn unpack_frame_header(frame: &mut HcaFrame, reader: &mut BitReader<'_>) -> HcaResult<()> {
    let sync = reader.read_bits(16);
    if sync != SYNC_WORD {
        return Err(HcaError::InvalidFrameHeader(sync));
    }

    frame.acceptable_noise_level = reader.read_bits(9) as i32;
    frame.evaluation_boundary = reader.read_bits(7) as i32;

    let anl = frame.acceptable_noise_level;
    let boundary = frame.evaluation_boundary as usize;
    let hfr_group_count = hfr_group_count(frame)?;

    for channel in &mut frame.channels {
        read_scale_factors(channel, reader)?;

        for i in 0..boundary {
            channel.resolution[i] =
                calculate_resolution(channel.scale_factors[i], i32::from(frame.ath_curve[i]) + anl - 1);
        }
        for i in boundary..channel.coded_scale_factor_count {
            channel.resolution[i] =
                calculate_resolution(channel.scale_factors[i], i32::from(frame.ath_curve[i]) + anl);
        }

        if channel.channel_type == ChannelType::StereoSecondary {
            for v in channel.intensity.iter_mut() {
                *v = reader.read_bits(4) as i32;
            }
        } else {
            for v in channel.hfr_scales.iter_mut().take(hfr_group_count) {
                *v = reader.read_bits(SCALE_FACTOR_BITS) as i32;
            }
        }
    }
    Ok(())
}

fn hfr_group_count(frame: &HcaFrame) -> HcaResult<usize> {
    let count = frame.info.hfr_group_count as usize;
    match frame.channels.first() {
        Some(c) if count > c.hfr_scales.len() => Err(HcaError::CorruptFrame(format!(
            "高频重建组数 {count} 超出范围"
        ))),
        _ => Ok(count),
    }
}

fn read_scale_factors(channel: &mut Channel, reader: &mut BitReader<'_>) -> HcaResult<()> {
    let delta_bits = reader.read_bits(3);
    channel.scale_factor_delta_bits = delta_bits;
    let count = channel.coded_scale_factor_count;

    if delta_bits == 0 {
        channel.scale_factors.fill(0);
        return Ok(());
    }

    if delta_bits >= 6 {
        for v in channel.scale_factors.iter_mut().take(count) {
            *v = reader.read_bits(SCALE_FACTOR_BITS) as i32;
        }
        return Ok(());
    }

    delta_decode(reader, delta_bits, count, &mut channel.scale_factors)
}

/// 差分解码: 首个值直接存储, 其后每个值为前一个值加差分, 差分取到上限时为转义,
/// 后跟直接存储的值
fn delta_decode(
    reader: &mut BitReader<'_>,
    delta_bits: u32,
    count: usize,
    output: &mut [i32],
) -> HcaResult<()> {
    let max_value = (1i32 << SCALE_FACTOR_BITS) - 1;
    let max_delta = 1i32 << (delta_bits - 1);

    output[0] = reader.read_bits(SCALE_FACTOR_BITS) as i32;
    for i in 1..count {
        let delta = reader.read_offset_binary(delta_bits, OffsetBias::Positive);
        if delta < max_delta {
            let value = output[i - 1] + delta;
            if !(0..=max_value).contains(&value) {
                return Err(HcaError::InvalidDelta { index: i, value });
            }
            output[i] = value;
        } else {
            output[i] = reader.read_bits(SCALE_FACTOR_BITS) as i32;
        }
    }
    Ok(())
}

fn read_spectral_coefficients(frame: &mut HcaFrame, reader: &mut BitReader<'_>) {
    for sf in 0..SUBFRAMES_PER_FRAME {
        for channel in &mut frame.channels {
            let coded = channel.coded_scale_factor_count;
            for s in 0..coded {
                let resolution = channel.resolution[s] as usize;
                let mut bits = u32::from(QUANTIZED_SPECTRUM_MAX_BITS[resolution]);
                let code = reader.peek_bits(bits) as usize;
                if resolution < 8 {
                    bits = u32::from(QUANTIZED_SPECTRUM_BITS[resolution][code]);
                    channel.quantized_spectra[sf][s] =
                        i32::from(QUANTIZED_SPECTRUM_VALUE[resolution][code]);
                } else {
                    // 符号-幅值, 最低位为符号; 0 少占 1 位
                    let magnitude = (code >> 1) as i32;
                    let value = if code & 1 == 1 { -magnitude } else { magnitude };
                    if value == 0 {
                        bits -= 1;
                    }
                    channel.quantized_spectra[sf][s] = value;
                }
                reader.skip_bits(bits);
            }
            channel.spectra[sf][coded..].fill(0.0);
        }
    }
}

fn check_unpacking(frame: &HcaFrame, reader: &BitReader<'_>) -> HcaResult<()> {
    let remaining = reader.remaining();
    // 剩余位数的合理区间是经验值, 用于识别损坏的块或错误的密钥
    let plausible = (16..=128).contains(&remaining)
        || is_empty_frame(frame)
        || (frame.acceptable_noise_level == 0 && remaining >= 16);
    if plausible {
        Ok(())
    } else {
        Err(HcaError::UnpackingFailed {
            remaining_bits: remaining,
        })
    }
}

/// 噪声电平为 0 且所有声道比例因子全零
fn is_empty_frame(frame: &HcaFrame) -> bool {
    frame.acceptable_noise_level == 0
        && frame
            .channels
            .iter()
            .all(|c| c.scale_factor_delta_bits == 0)
}

/// 将帧状态打包为一个数据块
///
/// `out` 至少为块大小; 只写入前 `block_size` 字节, 末尾 2 字节为 CRC-16.
/// 返回有效载荷的位数 (不含填充与校验).
pub fn pack_frame(frame: &HcaFrame, out: &mut [u8]) -> HcaResult<usize> {
    let block_size = frame.info.block_size;
    if block_size < 2 || out.len() < block_size {
        return Err(HcaError::InvalidArgument(format!(
            "输出缓冲区 {} 字节, 块大小 {block_size}",
            out.len()
        )));
    }
    let block = &mut out[..block_size];
    let hfr_group_count = hfr_group_count(frame)?;

    let payload_bits = {
        let mut writer = BitWriter::new(&mut block[..block_size - 2]);
        writer.write_bits(SYNC_WORD, 16)?;
        writer.write_bits(frame.acceptable_noise_level as u32, 9)?;
        writer.write_bits(frame.evaluation_boundary as u32, 7)?;

        for channel in &frame.channels {
            write_scale_factors(&mut writer, channel)?;
            if channel.channel_type == ChannelType::StereoSecondary {
                for &v in &channel.intensity {
                    writer.write_bits(v as u32, 4)?;
                }
            } else {
                for &v in channel.hfr_scales.iter().take(hfr_group_count) {
                    writer.write_bits(v as u32, SCALE_FACTOR_BITS)?;
                }
            }
        }

        for sf in 0..SUBFRAMES_PER_FRAME {
            for channel in &frame.channels {
                write_spectra(&mut writer, channel, sf)?;
            }
        }

        let bits = writer.position();
        writer.align_position(8)?;
        bits
    };

    block[payload_bits.div_ceil(8)..block_size - 2].fill(0);
    hca_core::crc::fix_checksum(block, block_size - 2)?;
    Ok(payload_bits)
}

fn write_scale_factors(writer: &mut BitWriter<'_>, channel: &Channel) -> HcaResult<()> {
    let delta_bits = channel.scale_factor_delta_bits;
    let count = channel.coded_scale_factor_count;
    let scales = &channel.scale_factors;
    writer.write_bits(delta_bits, 3)?;
    if delta_bits == 0 {
        return Ok(());
    }

    if delta_bits >= 6 {
        for &v in scales.iter().take(count) {
            writer.write_bits(v as u32, SCALE_FACTOR_BITS)?;
        }
        return Ok(());
    }

    writer.write_bits(scales[0] as u32, SCALE_FACTOR_BITS)?;
    let max_delta = (1i32 << (delta_bits - 1)) - 1;
    let escape = (1u32 << delta_bits) - 1;
    for i in 1..count {
        let delta = scales[i] - scales[i - 1];
        if delta.abs() > max_delta {
            writer.write_bits(escape, delta_bits)?;
            writer.write_bits(scales[i] as u32, SCALE_FACTOR_BITS)?;
        } else {
            writer.write_bits((max_delta + delta) as u32, delta_bits)?;
        }
    }
    Ok(())
}

fn write_spectra(writer: &mut BitWriter<'_>, channel: &Channel, subframe: usize) -> HcaResult<()> {
    for i in 0..channel.coded_scale_factor_count {
        let resolution = channel.resolution[i] as usize;
        let value = channel.quantized_spectra[subframe][i];
        if resolution == 0 {
            continue;
        }
        if resolution < 8 {
            let (code, bits) = quantized_spectrum_code(resolution, value).ok_or_else(|| {
                HcaError::InvalidArgument(format!("量化值 {value} 超出分辨率 {resolution} 的范围"))
            })?;
            writer.write_bits(code, bits)?;
        } else if resolution < RESOLUTION_MAX_VALUES.len() {
            if value.abs() > RESOLUTION_MAX_VALUES[resolution] {
                return Err(HcaError::InvalidArgument(format!(
                    "量化值 {value} 超出分辨率 {resolution} 的范围"
                )));
            }
            let bits = u32::from(QUANTIZED_SPECTRUM_MAX_BITS[resolution]) - 1;
            writer.write_bits(value.unsigned_abs(), bits)?;
            if value != 0 {
                writer.write_bool(value < 0)?;
            }
        } else {
            return Err(HcaError::CorruptFrame(format!("分辨率 {resolution} 超出范围")));
        }
    }
    Ok(())
}
