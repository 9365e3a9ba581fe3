//! 帧状态: 所有声道的工作缓冲以及按采样率缩放的 ATH 曲线.

use hca_core::{HcaError, HcaResult};

use crate::channel::{Channel, ChannelType, channel_types};
use crate::header::HcaInfo;
use crate::mdct::MdctTableCache;
use crate::tables::ATH_CURVE;
use crate::SAMPLES_PER_SUBFRAME;

/// 支持的最大声道数
pub const MAX_CHANNELS: u32 = 16;

/// 一个 HCA 流的帧解码状态
///
/// 帧之间保留 MDCT 重叠缓冲, 因此同一个流的块必须按顺序送入.
pub struct HcaFrame {
    pub info: HcaInfo,
    pub channels: Vec<Channel>,
    pub ath_curve: [u8; SAMPLES_PER_SUBFRAME],
    /// 可接受噪声电平 (帧头字段)
    pub acceptable_noise_level: i32,
    /// 评估边界 (帧头字段)
    pub evaluation_boundary: i32,
}

impl HcaFrame {
    pub fn new(info: &HcaInfo, cache: &MdctTableCache) -> HcaResult<Self> {
        let channel_count = info.format.channel_count;
        if channel_count == 0 || channel_count > MAX_CHANNELS {
            return Err(HcaError::HeaderInvariantViolation(format!(
                "声道数 {channel_count} 超出范围 1~{MAX_CHANNELS}"
            )));
        }
        if info.block_size < 2 {
            return Err(HcaError::HeaderInvariantViolation(format!(
                "块大小 {} 放不下校验和",
                info.block_size
            )));
        }
        let comp = &info.comp;
        if comp.total_band_count as usize > SAMPLES_PER_SUBFRAME
            || (comp.base_band_count + comp.stereo_band_count) as usize > SAMPLES_PER_SUBFRAME
        {
            return Err(HcaError::HeaderInvariantViolation(format!(
                "频带数超出范围: total={}, base={}, stereo={}",
                comp.total_band_count, comp.base_band_count, comp.stereo_band_count
            )));
        }

        let base = comp.base_band_count as usize;
        let stereo = comp.stereo_band_count as usize;
        let channels = channel_types(info)
            .into_iter()
            .map(|t| {
                let coded = if t == ChannelType::StereoSecondary {
                    base
                } else {
                    base + stereo
                };
                Channel::new(t, coded, cache)
            })
            .collect::<HcaResult<Vec<_>>>()?;

        let ath_curve = if info.use_ath_curve {
            scale_ath_curve(info.format.sampling_rate)
        } else {
            [0; SAMPLES_PER_SUBFRAME]
        };

        Ok(Self {
            info: info.clone(),
            channels,
            ath_curve,
            acceptable_noise_level: 0,
            evaluation_boundary: 0,
        })
    }

    /// 清空所有声道状态
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }
        self.acceptable_noise_level = 0;
        self.evaluation_boundary = 0;
    }
}

/// 将 ATH 曲线缩放到指定采样率
///
/// 原始曲线对应 41856 Hz; 超出曲线范围的部分填 0xFF.
pub fn scale_ath_curve(frequency: u32) -> [u8; SAMPLES_PER_SUBFRAME] {
    let mut ath = [0xFFu8; SAMPLES_PER_SUBFRAME];
    let mut acc: u64 = 0;
    for slot in ath.iter_mut() {
        acc += u64::from(frequency);
        let index = (acc >> 13) as usize;
        match ATH_CURVE.get(index) {
            Some(&v) => *slot = v,
            None => break,
        }
    }
    ath
}
