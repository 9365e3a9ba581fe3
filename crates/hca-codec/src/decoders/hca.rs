//! HCA 流式解码器.
//!
//! 每次送入一个已解密的数据块, 校验 CRC-16 后解包并合成 1024 个采样.
//! 块之间保留 MDCT 重叠状态, 因此必须按顺序送入; seek 后调用 `flush()`.

use std::sync::Arc;

use hca_core::{HcaError, HcaResult, crc};
use log::debug;

use crate::audio_frame::AudioFrame;
use crate::decoder::Decoder;
use crate::frame::HcaFrame;
use crate::header::HcaInfo;
use crate::mdct::MdctTableCache;
use crate::packet::Packet;
use crate::synthesis::decode_frame;
use crate::{SAMPLES_PER_FRAME, SAMPLES_PER_SUBFRAME, SUBFRAMES_PER_FRAME};

/// HCA 解码器
pub struct HcaDecoder {
    frame: HcaFrame,
    /// 已解码帧缓冲
    output_frame: Option<AudioFrame>,
    /// 是否已收到刷新信号
    flushing: bool,
}

impl HcaDecoder {
    /// 使用独立的变换表缓存创建解码器
    pub fn new(info: &HcaInfo) -> HcaResult<Self> {
        Self::with_cache(info, &Arc::new(MdctTableCache::new()))
    }

    /// 使用共享的变换表缓存创建解码器
    pub fn with_cache(info: &HcaInfo, cache: &Arc<MdctTableCache>) -> HcaResult<Self> {
        if info.cipher != 0 {
            return Err(HcaError::CipherStateConflict(format!(
                "数据块已加密 (类型 0x{:X}), 请先解密",
                info.cipher
            )));
        }
        let frame = HcaFrame::new(info, cache)?;
        debug!(
            "打开 HCA 解码器: {} Hz, {} 声道, 块大小 {}",
            info.format.sampling_rate, info.format.channel_count, info.block_size,
        );
        Ok(Self {
            frame,
            output_frame: None,
            flushing: false,
        })
    }

    /// 解码器对应的头部
    pub fn info(&self) -> &HcaInfo {
        &self.frame.info
    }

    fn interleave(&self, pts: i64) -> AudioFrame {
        let channels = self.frame.channels.len();
        let mut samples = Vec::with_capacity(SAMPLES_PER_FRAME * channels);
        for sf in 0..SUBFRAMES_PER_FRAME {
            for s in 0..SAMPLES_PER_SUBFRAME {
                for channel in &self.frame.channels {
                    samples.push(channel.pcm_float[sf][s]);
                }
            }
        }
        AudioFrame {
            samples,
            nb_samples: SAMPLES_PER_FRAME as u32,
            channels: channels as u32,
            sample_rate: self.frame.info.format.sampling_rate,
            pts,
        }
    }
}

impl Decoder for HcaDecoder {
    fn name(&self) -> &str {
        "hca"
    }

    fn send_packet(&mut self, packet: &Packet) -> HcaResult<()> {
        if self.output_frame.is_some() {
            return Err(HcaError::NeedMoreData);
        }

        // 空包 = flush
        if packet.is_empty() {
            self.flushing = true;
            return Ok(());
        }

        let block_size = self.frame.info.block_size;
        if packet.size() != block_size {
            return Err(HcaError::InvalidArgument(format!(
                "数据块大小 {} 与头部块大小 {} 不一致",
                packet.size(),
                block_size,
            )));
        }

        crc::verify_checksum(&packet.data, block_size - 2).map_err(|e| match e {
            HcaError::ChecksumMismatch {
                expected, actual, ..
            } => HcaError::ChecksumMismatch {
                offset: usize::try_from(packet.pos).unwrap_or(0),
                expected,
                actual,
            },
            other => other,
        })?;

        decode_frame(&packet.data, &mut self.frame)?;
        self.output_frame = Some(self.interleave(packet.pts));
        Ok(())
    }

    fn receive_frame(&mut self) -> HcaResult<AudioFrame> {
        if let Some(frame) = self.output_frame.take() {
            return Ok(frame);
        }
        if self.flushing {
            return Err(HcaError::Eof);
        }
        Err(HcaError::NeedMoreData)
    }

    fn flush(&mut self) {
        self.frame.reset();
        self.output_frame = None;
        self.flushing = false;
    }
}
