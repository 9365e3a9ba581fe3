//! 解码后的音频帧.

/// 音频帧
///
/// 采样以 `f64` 交错存储, 范围约为 `[-1, 1]`, 未做裁剪.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// 交错采样, 长度为 `nb_samples * channels`
    pub samples: Vec<f64>,
    /// 本帧包含的采样数 (每声道)
    pub nb_samples: u32,
    /// 声道数
    pub channels: u32,
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 首个采样的序号
    pub pts: i64,
}

impl AudioFrame {
    /// 创建全零的音频帧
    pub fn silent(nb_samples: u32, channels: u32, sample_rate: u32) -> Self {
        Self {
            samples: vec![0.0; nb_samples as usize * channels as usize],
            nb_samples,
            channels,
            sample_rate,
            pts: 0,
        }
    }

    /// 第 `index` 个采样时刻上第 `channel` 声道的值
    pub fn sample(&self, index: usize, channel: usize) -> f64 {
        self.samples[index * self.channels as usize + channel]
    }
}
