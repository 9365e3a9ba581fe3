//! HCA 到 WAV 的整文件解码.

use std::sync::Arc;

use bytes::Bytes;
use hca_codec::{AudioFrame, Decoder, HcaDecoder, HcaInfo, MdctTableCache, Packet, SAMPLES_PER_FRAME};
use hca_core::{HcaError, HcaResult, SampleFormat};
use log::{debug, warn};
use rayon::prelude::*;

use crate::crypt::with_offset;
use crate::pcm::write_samples;
use crate::wav::{WavLoop, WavMuxer, WavSpec};

/// 单帧解码失败时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameErrorPolicy {
    /// 立即返回错误
    #[default]
    Abort,
    /// 记录警告并以静音代替该帧
    Silence,
}

/// 解码参数
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOptions {
    /// 输出采样格式
    pub sample_format: SampleFormat,
    /// 循环区间额外重复的次数
    pub loop_count: u32,
    /// 音量, 有效范围 `[0, 1]`
    pub volume: f64,
    pub frame_errors: FrameErrorPolicy,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            sample_format: SampleFormat::S32,
            loop_count: 0,
            volume: 1.0,
            frame_errors: FrameErrorPolicy::Abort,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_format(mut self, sample_format: SampleFormat) -> Self {
        self.sample_format = sample_format;
        self
    }

    pub fn with_loop_count(mut self, loop_count: u32) -> Self {
        self.loop_count = loop_count;
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_frame_errors(mut self, policy: FrameErrorPolicy) -> Self {
        self.frame_errors = policy;
        self
    }

    /// 将音量限制到 `[0, 1]`, NaN 视为 1
    pub fn validated(mut self) -> Self {
        self.volume = if self.volume.is_nan() {
            1.0
        } else {
            self.volume.clamp(0.0, 1.0)
        };
        self
    }
}

/// 解码整个 HCA 文件, 返回 WAV 文件字节
///
/// 文件必须未加密. 只输出 `[起始采样, 结束采样)` 内的采样; 有循环时结束于循环终点,
/// 并在其后追加 `loop_count` 份循环区间.
pub fn decode(data: &[u8], options: &DecodeOptions) -> HcaResult<Vec<u8>> {
    decode_with_cache(data, options, &Arc::new(MdctTableCache::new()))
}

/// 并行解码多个文件, 共享同一个变换表缓存
///
/// 结果与输入一一对应, 单个文件失败不影响其他文件.
pub fn decode_many<T>(inputs: &[T], options: &DecodeOptions) -> Vec<HcaResult<Vec<u8>>>
where
    T: AsRef<[u8]> + Sync,
{
    let cache = Arc::new(MdctTableCache::new());
    inputs
        .par_iter()
        .map(|data| decode_with_cache(data.as_ref(), options, &cache))
        .collect()
}

/// 使用给定的变换表缓存解码
pub fn decode_with_cache(
    data: &[u8],
    options: &DecodeOptions,
    cache: &Arc<MdctTableCache>,
) -> HcaResult<Vec<u8>> {
    let options = options.clone().validated();
    let info = HcaInfo::parse(data)?;
    if info.has_section("ciph") && info.cipher != 0 {
        return Err(HcaError::CipherStateConflict(format!(
            "文件已加密 (类型 0x{:X}), 请先解密",
            info.cipher
        )));
    }
    if data.len() < info.full_size {
        return Err(HcaError::InvalidFormat(format!(
            "文件被截断: 需要 {} 字节, 实际 {} 字节",
            info.full_size,
            data.len(),
        )));
    }
    if options.loop_count > 0 && !info.has_loop() {
        return Err(HcaError::InvalidArgument(
            "文件没有循环区间, 无法重复循环".into(),
        ));
    }

    let channels = info.format.channel_count as usize;
    let sample_bytes = (channels as u64) * u64::from(options.sample_format.bytes_per_sample());
    let loop_part = if info.has_loop() {
        info.loop_sample_count() * sample_bytes
    } else {
        0
    };
    let data_size = sample_bytes * info.sample_count + loop_part * u64::from(options.loop_count);

    let start = info.start_at_sample;
    let end = info.end_at_sample;
    let spec = WavSpec {
        channels: channels as u16,
        sample_rate: info.format.sampling_rate,
        sample_format: options.sample_format,
        comment: info.comment.clone(),
        loop_region: info.loop_info.as_ref().map(|_| WavLoop {
            start: (info.loop_start_at_sample - start) as u32,
            end: (info.loop_end_at_sample - start) as u32,
        }),
    };
    let mut muxer = WavMuxer::new(spec, data_size)?;
    let mut out = Vec::with_capacity(muxer.total_len() as usize);
    muxer.write_header(&mut out)?;
    let data_start = out.len();

    let mut decoder = HcaDecoder::with_cache(&info, cache)?;
    let frame_len = SAMPLES_PER_FRAME as u64;
    let mut pcm = Vec::with_capacity(SAMPLES_PER_FRAME * sample_bytes as usize);

    for i in 0..info.format.block_count as usize {
        let first = i as u64 * frame_len;
        let last = first + frame_len;
        if last <= start || first >= end {
            continue;
        }

        let range = info.block_range(i);
        let packet = Packet {
            data: Bytes::copy_from_slice(&data[range.clone()]),
            block_index: i as u32,
            pts: first as i64,
            pos: range.start as i64,
        };
        let frame = match decode_block(&mut decoder, &packet) {
            Ok(frame) => frame,
            Err(e) if options.frame_errors == FrameErrorPolicy::Silence => {
                warn!("第 {i} 块解码失败, 以静音代替: {e}");
                AudioFrame::silent(frame_len as u32, channels as u32, info.format.sampling_rate)
            }
            Err(e) => return Err(with_offset(e, range.start)),
        };

        // 裁掉起始采样之前和结束采样之后的部分
        let skip = start.saturating_sub(first) as usize;
        let take = (end.min(last) - first) as usize;
        pcm.clear();
        write_samples(
            &frame.samples[skip * channels..take * channels],
            options.sample_format,
            options.volume,
            &mut pcm,
        )?;
        muxer.write_samples(&mut out, &pcm)?;
    }

    if options.loop_count > 0 {
        let pre_loop = (sample_bytes * (info.loop_start_at_sample - start)) as usize;
        let src = data_start + pre_loop;
        let looped = out[src..src + loop_part as usize].to_vec();
        for _ in 0..options.loop_count {
            muxer.write_samples(&mut out, &looped)?;
        }
        debug!("追加 {} 次循环, 每次 {} 字节", options.loop_count, looped.len());
    }

    muxer.write_trailer(&mut out)?;
    Ok(out)
}

fn decode_block(decoder: &mut HcaDecoder, packet: &Packet) -> HcaResult<AudioFrame> {
    decoder.send_packet(packet)?;
    decoder.receive_frame()
}
