//! 集成测试共用: 合成 HCA 文件.

#![allow(dead_code)]

use hca::codec::{HcaFrame, HcaInfo, HeaderBuilder, MdctTableCache, SUBFRAMES_PER_FRAME, pack_frame};

/// 初始化测试日志, 可重复调用
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub const SAMPLE_RATE: u32 = 44100;
pub const BLOCK_SIZE: u16 = 0x400;
pub const BANDS: u8 = 16;

/// 常用头部: 16 个频带, 各声道独立, 带类型为 0 的 ciph 段
pub fn builder(channels: u8, block_count: u32) -> HeaderBuilder {
    HeaderBuilder::new(channels, SAMPLE_RATE)
        .block_count(block_count)
        .block_size(BLOCK_SIZE)
        .bands(BANDS, BANDS, 0, 0)
        .cipher(0)
}

/// 按头部生成完整文件, 每块填入确定的非零频谱
pub fn build_file(builder: &HeaderBuilder) -> Vec<u8> {
    let mut data = builder.build().unwrap();
    let info = HcaInfo::parse(&data).unwrap();
    let mut frame = HcaFrame::new(&info, &MdctTableCache::new()).unwrap();
    let mut block = vec![0u8; info.block_size];
    for b in 0..info.format.block_count as usize {
        fill_frame(&mut frame, b);
        pack_frame(&frame, &mut block).unwrap();
        data.extend_from_slice(&block);
    }
    data
}

fn fill_frame(frame: &mut HcaFrame, block: usize) {
    frame.acceptable_noise_level = 0;
    frame.evaluation_boundary = 0;
    for (c, channel) in frame.channels.iter_mut().enumerate() {
        channel.scale_factor_delta_bits = 6;
        for s in 0..channel.coded_scale_factor_count {
            channel.scale_factors[s] = 20 + (s % 8) as i32;
            // 噪声电平为 0 且无 ATH 时, 非零比例因子的分辨率都是 15
            channel.resolution[s] = 15;
            for sf in 0..SUBFRAMES_PER_FRAME {
                let v = (block * 31 + sf * 7 + s * 13 + c * 5) % 41;
                channel.quantized_spectra[sf][s] = v as i32 - 20;
            }
        }
    }
}

pub fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

pub fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// 查找 WAV 子块, 返回块头偏移
pub fn find_chunk(wav: &[u8], id: &[u8; 4]) -> Option<usize> {
    let mut pos = 12;
    while pos + 8 <= wav.len() {
        if &wav[pos..pos + 4] == id {
            return Some(pos);
        }
        pos += 8 + u32_at(wav, pos + 4) as usize;
    }
    None
}

/// WAV 的 PCM 数据部分
pub fn pcm_data(wav: &[u8]) -> &[u8] {
    let pos = find_chunk(wav, b"data").unwrap();
    let size = u32_at(wav, pos + 4) as usize;
    &wav[pos + 8..pos + 8 + size]
}
