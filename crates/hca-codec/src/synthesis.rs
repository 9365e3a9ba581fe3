//! 帧解码: 反量化、高频重建、强度立体声与 IMDCT.

use hca_core::{HcaError, HcaResult};

use crate::SUBFRAMES_PER_FRAME;
use crate::channel::{Channel, ChannelType};
use crate::frame::HcaFrame;
use crate::packing::unpack_frame;
use crate::tables::{dequantizer_scaling, intensity_ratio, quantizer_step_size, scale_conversion};

/// 解码一个数据块, 结果写入各声道的 `pcm_float`
///
/// 块必须已经解密. 不检查块校验和.
pub fn decode_frame(data: &[u8], frame: &mut HcaFrame) -> HcaResult<()> {
    unpack_frame(frame, data)?;
    dequantize_frame(frame);
    reconstruct_high_frequency(frame)?;
    apply_intensity_stereo(frame)?;
    run_imdct(frame)
}

fn dequantize_frame(frame: &mut HcaFrame) {
    for channel in &mut frame.channels {
        calculate_gain(channel);
        let coded = channel.coded_scale_factor_count;
        for sf in 0..SUBFRAMES_PER_FRAME {
            for s in 0..coded {
                channel.spectra[sf][s] = f64::from(channel.quantized_spectra[sf][s]) * channel.gain[s];
            }
        }
    }
}

fn calculate_gain(channel: &mut Channel) {
    let scaling = dequantizer_scaling();
    let step = quantizer_step_size();
    for i in 0..channel.coded_scale_factor_count {
        let sf = channel.scale_factors[i] as usize;
        let res = channel.resolution[i] as usize;
        channel.gain[i] = scaling[sf] * step[res];
    }
}

/// 用镜像的低频频带按组缩放补出高频频带
fn reconstruct_high_frequency(frame: &mut HcaFrame) -> HcaResult<()> {
    let group_count = frame.info.hfr_group_count as usize;
    if group_count == 0 {
        return Ok(());
    }

    let comp = &frame.info.comp;
    // 最后一个频谱系数总为 0
    let total = comp.total_band_count.min(127) as i64;
    let start = (comp.base_band_count + comp.stereo_band_count) as i64;
    let hfr_bands = i64::from(comp.hfr_band_count).min(total - i64::from(comp.hfr_band_count));
    let per_group = comp.bands_per_hfr_group as i64;
    let conversion = scale_conversion();

    for channel in &mut frame.channels {
        if channel.channel_type == ChannelType::StereoSecondary {
            continue;
        }

        let mut band = 0i64;
        for group in 0..group_count {
            let mut i = 0;
            while i < per_group && band < hfr_bands {
                let high = start + band;
                let low = start - band - 1;
                if low < 0 || high >= channel.spectra[0].len() as i64 {
                    return Err(HcaError::CorruptFrame(format!(
                        "高频重建频带越界: high={high}, low={low}"
                    )));
                }
                let (high, low) = (high as usize, low as usize);
                let index = channel.hfr_scales[group] - channel.scale_factors[low] + 64;
                let ratio = usize::try_from(index)
                    .ok()
                    .and_then(|i| conversion.get(i))
                    .copied()
                    .ok_or_else(|| HcaError::CorruptFrame(format!("高频重建缩放索引越界: {index}")))?;
                for sf in 0..SUBFRAMES_PER_FRAME {
                    channel.spectra[sf][high] = ratio * channel.spectra[sf][low];
                }
                i += 1;
                band += 1;
            }
        }
    }
    Ok(())
}

/// 由主声道频谱与从声道的强度值重建立体声频带
fn apply_intensity_stereo(frame: &mut HcaFrame) -> HcaResult<()> {
    let comp = &frame.info.comp;
    if comp.stereo_band_count == 0 {
        return Ok(());
    }
    let base = comp.base_band_count as usize;
    let total = comp.total_band_count as usize;
    let ratios = intensity_ratio();

    for c in 0..frame.channels.len() {
        if frame.channels[c].channel_type != ChannelType::StereoPrimary {
            continue;
        }
        let (left, rest) = frame.channels[c..].split_at_mut(1);
        let primary = &mut left[0];
        let secondary = rest.first_mut().ok_or_else(|| {
            HcaError::CorruptFrame(format!("立体声主声道 {c} 之后没有从声道"))
        })?;

        for sf in 0..SUBFRAMES_PER_FRAME {
            let ratio_l = ratios
                .get(secondary.intensity[sf] as usize)
                .copied()
                .ok_or_else(|| {
                    HcaError::CorruptFrame(format!("强度值越界: {}", secondary.intensity[sf]))
                })?;
            let ratio_r = ratio_l - 2.0;
            let l = &mut primary.spectra[sf];
            let r = &mut secondary.spectra[sf];
            for b in base..total {
                r[b] = l[b] * ratio_r;
                l[b] *= ratio_l;
            }
        }
    }
    Ok(())
}

fn run_imdct(frame: &mut HcaFrame) -> HcaResult<()> {
    for channel in &mut frame.channels {
        for sf in 0..SUBFRAMES_PER_FRAME {
            channel
                .mdct
                .run_imdct(&channel.spectra[sf], &mut channel.pcm_float[sf])?;
        }
    }
    Ok(())
}
