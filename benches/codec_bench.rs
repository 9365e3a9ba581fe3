//! HCA 性能基准测试.
//!
//! 覆盖置换加密、帧解包与合成、IMDCT 和整文件解码.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use hca::codec::tables::mdct_window;
use hca::codec::{
    Cipher, HcaFrame, HcaInfo, HeaderBuilder, Mdct, MdctTableCache, SAMPLES_PER_SUBFRAME,
    SUBFRAMES_PER_FRAME, decode_frame, pack_frame,
};
use hca::core::SampleFormat;
use hca::format::DecodeOptions;

/// 生成双声道合成文件, 频谱为确定的伪随机值
fn make_file(block_count: u32) -> Vec<u8> {
    let mut data = HeaderBuilder::new(2, 44100)
        .block_count(block_count)
        .block_size(0x400)
        .bands(16, 16, 0, 0)
        .build()
        .unwrap();
    let info = HcaInfo::parse(&data).unwrap();
    let mut frame = HcaFrame::new(&info, &MdctTableCache::new()).unwrap();
    let mut block = vec![0u8; info.block_size];
    for b in 0..block_count as usize {
        for (c, channel) in frame.channels.iter_mut().enumerate() {
            channel.scale_factor_delta_bits = 6;
            for s in 0..channel.coded_scale_factor_count {
                channel.scale_factors[s] = 24;
                channel.resolution[s] = 15;
                for sf in 0..SUBFRAMES_PER_FRAME {
                    channel.quantized_spectra[sf][s] = ((b * 17 + sf * 5 + s * 3 + c) % 61) as i32 - 30;
                }
            }
        }
        pack_frame(&frame, &mut block).unwrap();
        data.extend_from_slice(&block);
    }
    data
}

fn bench_cipher_mask(c: &mut Criterion) {
    c.bench_function("cipher_mask_0x400", |b| {
        let cipher = Cipher::with_keys(0x0139_5C51, 0);
        let mut block = vec![0x5Au8; 0x400];
        b.iter(|| {
            cipher.mask(black_box(&mut block));
        });
    });
}

fn bench_decode_frame(c: &mut Criterion) {
    c.bench_function("decode_frame_stereo", |b| {
        let data = make_file(1);
        let info = HcaInfo::parse(&data).unwrap();
        let block = data[info.block_range(0)].to_vec();
        let mut frame = HcaFrame::new(&info, &MdctTableCache::new()).unwrap();
        b.iter(|| {
            decode_frame(black_box(&block), &mut frame).unwrap();
        });
    });
}

fn bench_imdct(c: &mut Criterion) {
    c.bench_function("imdct_128", |b| {
        let cache = MdctTableCache::new();
        let scale = (2.0 / SAMPLES_PER_SUBFRAME as f64).sqrt();
        let mut mdct = Mdct::new(7, mdct_window(), scale, &cache).unwrap();
        let input: Vec<f64> = (0..SAMPLES_PER_SUBFRAME)
            .map(|i| (i as f64 * 0.1).sin())
            .collect();
        let mut output = vec![0.0; SAMPLES_PER_SUBFRAME];
        b.iter(|| {
            mdct.run_imdct(black_box(&input), &mut output).unwrap();
            black_box(&output);
        });
    });
}

fn bench_decode_file(c: &mut Criterion) {
    c.bench_function("decode_file_64_blocks_s16", |b| {
        let data = make_file(64);
        let options = DecodeOptions::new().with_sample_format(SampleFormat::S16);
        b.iter(|| {
            let wav = hca::format::decode(black_box(&data), &options).unwrap();
            black_box(wav);
        });
    });
}

criterion_group!(
    benches,
    bench_cipher_mask,
    bench_decode_frame,
    bench_imdct,
    bench_decode_file
);
criterion_main!(benches);
