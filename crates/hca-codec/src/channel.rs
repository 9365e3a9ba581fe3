//! 声道状态与声道类型.

use hca_core::HcaResult;

use crate::header::HcaInfo;
use crate::mdct::{Mdct, MdctTableCache};
use crate::tables::mdct_window;
use crate::{SAMPLES_PER_SUBFRAME, SUBFRAME_SAMPLES_BITS, SUBFRAMES_PER_FRAME};

/// 声道在立体声编码中的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelType {
    /// 独立声道
    #[default]
    Discrete,
    /// 强度立体声的主声道
    StereoPrimary,
    /// 强度立体声的从声道, 只编码基础频带
    StereoSecondary,
}

/// 由头部推导每个声道的类型
///
/// 轨道数为 0 视为 1; 每轨声道数的模式按轨道重复.
pub fn channel_types(info: &HcaInfo) -> Vec<ChannelType> {
    use ChannelType::{Discrete as D, StereoPrimary as P, StereoSecondary as S};

    let channel_count = info.format.channel_count as usize;
    let track_count = info.comp.track_count.max(1) as usize;
    let per_track = channel_count / track_count;

    if info.comp.stereo_band_count == 0 || per_track <= 1 || channel_count % track_count != 0 {
        return vec![D; channel_count];
    }

    let config = info.comp.channel_config;
    let pattern: &[ChannelType] = match per_track {
        2 => &[P, S],
        3 => &[P, S, D],
        4 if config != 0 => &[P, S, D, D],
        4 => &[P, S, P, S],
        5 if config > 2 => &[P, S, D, D, D],
        5 => &[P, S, D, P, S],
        6 => &[P, S, D, D, P, S],
        7 => &[P, S, D, D, P, S, D],
        8 => &[P, S, D, D, P, S, P, S],
        _ => return vec![D; channel_count],
    };
    (0..channel_count).map(|i| pattern[i % per_track]).collect()
}

/// 单个声道的解码/打包状态
pub struct Channel {
    pub channel_type: ChannelType,
    /// 实际编码的比例因子个数
    pub coded_scale_factor_count: usize,
    /// 每个子帧的 PCM 输出
    pub pcm_float: [[f64; SAMPLES_PER_SUBFRAME]; SUBFRAMES_PER_FRAME],
    /// 每个子帧的频谱
    pub spectra: [[f64; SAMPLES_PER_SUBFRAME]; SUBFRAMES_PER_FRAME],
    /// 每个子帧的量化频谱
    pub quantized_spectra: [[i32; SAMPLES_PER_SUBFRAME]; SUBFRAMES_PER_FRAME],
    pub gain: [f64; SAMPLES_PER_SUBFRAME],
    /// 强度立体声比例索引 (仅从声道)
    pub intensity: [i32; SUBFRAMES_PER_FRAME],
    /// 高频重建组缩放
    pub hfr_scales: [i32; SAMPLES_PER_SUBFRAME],
    pub scale_factors: [i32; SAMPLES_PER_SUBFRAME],
    pub resolution: [i32; SAMPLES_PER_SUBFRAME],
    /// 比例因子差分位数 (0 表示全零, 大于等于 6 表示直接存储)
    pub scale_factor_delta_bits: u32,
    pub mdct: Mdct,
}

impl Channel {
    pub fn new(
        channel_type: ChannelType,
        coded_scale_factor_count: usize,
        cache: &MdctTableCache,
    ) -> HcaResult<Self> {
        let scale = (2.0 / SAMPLES_PER_SUBFRAME as f64).sqrt();
        Ok(Self {
            channel_type,
            coded_scale_factor_count,
            pcm_float: [[0.0; SAMPLES_PER_SUBFRAME]; SUBFRAMES_PER_FRAME],
            spectra: [[0.0; SAMPLES_PER_SUBFRAME]; SUBFRAMES_PER_FRAME],
            quantized_spectra: [[0; SAMPLES_PER_SUBFRAME]; SUBFRAMES_PER_FRAME],
            gain: [0.0; SAMPLES_PER_SUBFRAME],
            intensity: [0; SUBFRAMES_PER_FRAME],
            hfr_scales: [0; SAMPLES_PER_SUBFRAME],
            scale_factors: [0; SAMPLES_PER_SUBFRAME],
            resolution: [0; SAMPLES_PER_SUBFRAME],
            scale_factor_delta_bits: 0,
            mdct: Mdct::new(SUBFRAME_SAMPLES_BITS, mdct_window(), scale, cache)?,
        })
    }

    /// 清空帧内数据与重叠缓冲
    pub fn reset(&mut self) {
        self.pcm_float = [[0.0; SAMPLES_PER_SUBFRAME]; SUBFRAMES_PER_FRAME];
        self.spectra = [[0.0; SAMPLES_PER_SUBFRAME]; SUBFRAMES_PER_FRAME];
        self.quantized_spectra = [[0; SAMPLES_PER_SUBFRAME]; SUBFRAMES_PER_FRAME];
        self.intensity = [0; SUBFRAMES_PER_FRAME];
        self.hfr_scales = [0; SAMPLES_PER_SUBFRAME];
        self.scale_factors = [0; SAMPLES_PER_SUBFRAME];
        self.resolution = [0; SAMPLES_PER_SUBFRAME];
        self.scale_factor_delta_bits = 0;
        self.mdct.reset();
    }
}
