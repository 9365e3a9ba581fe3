//! 端到端集成测试: 合成 HCA 文件的加密、解密、解码与 WAV 输出.

mod common;

use bytes::Bytes;
use common::{SAMPLE_RATE, build_file, builder, find_chunk, init_logger, pcm_data, u16_at, u32_at};
use hca::codec::{Decoder, HcaDecoder, HcaInfo, Packet, is_header_masked};
use hca::core::{HcaError, SampleFormat};
use hca::format::{CipherConfig, DecodeOptions, FrameErrorPolicy, decode};

fn options(format: SampleFormat) -> DecodeOptions {
    DecodeOptions::new().with_sample_format(format)
}

#[test]
fn test_加密解密还原原始文件() {
    init_logger();
    let original = build_file(&builder(2, 4));
    for config in [
        CipherConfig::DefaultKeys,
        CipherConfig::NoKey,
        CipherConfig::from_u64(0x0123_4567_89AB_CDEF),
    ] {
        let mut data = original.clone();
        let info = hca::format::encrypt(&mut data, &config).unwrap();
        assert_ne!(info.cipher, 0);
        assert!(is_header_masked(&data));
        assert_ne!(data, original);

        // 加密后的数据块校验仍然有效
        let info = HcaInfo::parse(&data).unwrap();
        for i in 0..info.format.block_count as usize {
            assert_eq!(hca::core::crc::crc16(&data[info.block_range(i)]), 0);
        }

        let info = hca::format::decrypt(&mut data, &config).unwrap();
        assert_eq!(info.cipher, 0);
        assert!(!is_header_masked(&data));
        assert_eq!(data, original);
    }
}

#[test]
fn test_加密文件不能直接解码() {
    let mut data = build_file(&builder(1, 2));
    hca::format::encrypt(&mut data, &CipherConfig::DefaultKeys).unwrap();
    assert!(matches!(
        decode(&data, &DecodeOptions::default()),
        Err(HcaError::CipherStateConflict(_))
    ));
}

#[test]
fn test_缺少_ciph_段时先添加() {
    let builder = hca::codec::HeaderBuilder::new(1, SAMPLE_RATE)
        .block_count(2)
        .block_size(common::BLOCK_SIZE)
        .bands(common::BANDS, common::BANDS, 0, 0);
    let mut data = build_file(&builder);
    assert!(matches!(
        hca::format::encrypt(&mut data, &CipherConfig::NoKey),
        Err(HcaError::CipherStateConflict(_))
    ));

    let plain = decode(&data, &DecodeOptions::default()).unwrap();
    let mut data = HcaInfo::add_cipher_section(&data, None).unwrap();
    hca::format::encrypt(&mut data, &CipherConfig::NoKey).unwrap();
    hca::format::decrypt(&mut data, &CipherConfig::NoKey).unwrap();
    assert_eq!(pcm_data(&decode(&data, &DecodeOptions::default()).unwrap()), pcm_data(&plain));
}

#[test]
fn test_流式解码与整文件解码一致() {
    let data = build_file(&builder(2, 3));
    let info = HcaInfo::parse(&data).unwrap();
    let mut decoder = HcaDecoder::new(&info).unwrap();
    let mut samples = Vec::new();
    for i in 0..info.format.block_count as usize {
        let range = info.block_range(i);
        let packet = Packet {
            data: Bytes::copy_from_slice(&data[range.clone()]),
            block_index: i as u32,
            pts: (i * 1024) as i64,
            pos: range.start as i64,
        };
        decoder.send_packet(&packet).unwrap();
        let frame = decoder.receive_frame().unwrap();
        assert_eq!(frame.nb_samples, 1024);
        assert_eq!(frame.channels, 2);
        samples.extend_from_slice(&frame.samples);
    }
    assert!(samples.iter().any(|&v| v != 0.0));

    let wav = decode(&data, &options(SampleFormat::F32)).unwrap();
    let pcm = pcm_data(&wav);
    assert_eq!(pcm.len(), samples.len() * 4);
    for (chunk, &expected) in pcm.chunks_exact(4).zip(&samples) {
        let v = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        assert_eq!(v, expected.clamp(-1.0, 1.0) as f32);
    }
}

#[test]
fn test_裁剪首尾采样() {
    let full = decode(&build_file(&builder(1, 3)), &options(SampleFormat::S16)).unwrap();
    let cropped = decode(
        &build_file(&builder(1, 3).dropped(100, 50)),
        &options(SampleFormat::S16),
    )
    .unwrap();
    let full_pcm = pcm_data(&full);
    let cropped_pcm = pcm_data(&cropped);
    assert_eq!(cropped_pcm.len(), (3 * 1024 - 150) * 2);
    assert_eq!(cropped_pcm, &full_pcm[100 * 2..(3 * 1024 - 50) * 2]);
}

#[test]
fn test_循环复制() {
    init_logger();
    // 循环 [1034, 3052), 结束于循环终点
    let data = build_file(&builder(1, 4).loop_region(1, 2, 10, 20));
    let info = HcaInfo::parse(&data).unwrap();
    assert_eq!(info.loop_start_at_sample, 1034);
    assert_eq!(info.loop_end_at_sample, 3052);

    let wav = decode(&data, &options(SampleFormat::S16).with_loop_count(2)).unwrap();
    let pcm = pcm_data(&wav);
    let body = 3052 * 2;
    let loop_part = (3052 - 1034) * 2;
    assert_eq!(pcm.len(), body + 2 * loop_part);
    let looped = &pcm[1034 * 2..body];
    assert_eq!(&pcm[body..body + loop_part], looped);
    assert_eq!(&pcm[body + loop_part..], looped);

    let smpl = find_chunk(&wav, b"smpl").unwrap();
    assert_eq!(u32_at(&wav, smpl + 4), 60);
    assert_eq!(u32_at(&wav, smpl + 8 + 8), 1_000_000_000 / SAMPLE_RATE);
    assert_eq!(u32_at(&wav, smpl + 8 + 28), 1);
    assert_eq!(u32_at(&wav, smpl + 8 + 44), 1034);
    assert_eq!(u32_at(&wav, smpl + 8 + 48), 3052);
    assert_eq!(wav.len(), smpl + 68);
}

#[test]
fn test_循环区间相对起始采样() {
    let data = build_file(&builder(1, 4).dropped(200, 0).loop_region(1, 2, 0, 0));
    let wav = decode(&data, &DecodeOptions::default()).unwrap();
    let smpl = find_chunk(&wav, b"smpl").unwrap();
    assert_eq!(u32_at(&wav, smpl + 8 + 44), 1024 - 200);
    assert_eq!(u32_at(&wav, smpl + 8 + 48), 3 * 1024 - 200);
    assert_eq!(pcm_data(&wav).len(), (3 * 1024 - 200) * 4);
}

#[test]
fn test_wav_字段() {
    let data = build_file(&builder(2, 2).comment("ループ曲"));
    let wav = decode(&data, &options(SampleFormat::S24)).unwrap();

    assert_eq!(&wav[..4], b"RIFF");
    assert_eq!(u32_at(&wav, 4) as usize, wav.len() - 8);
    assert_eq!(&wav[8..12], b"WAVE");

    let fmt = find_chunk(&wav, b"fmt ").unwrap();
    assert_eq!(u32_at(&wav, fmt + 4), 16);
    assert_eq!(u16_at(&wav, fmt + 8), 1);
    assert_eq!(u16_at(&wav, fmt + 10), 2);
    assert_eq!(u32_at(&wav, fmt + 12), SAMPLE_RATE);
    assert_eq!(u32_at(&wav, fmt + 16), SAMPLE_RATE * 6);
    assert_eq!(u16_at(&wav, fmt + 20), 6);
    assert_eq!(u16_at(&wav, fmt + 22), 24);

    let note = find_chunk(&wav, b"note").unwrap();
    let size = u32_at(&wav, note + 4) as usize;
    let comment = "ループ曲".as_bytes();
    assert_eq!(size % 4, 0);
    assert!(size >= comment.len() + 1);
    assert_eq!(&wav[note + 8..note + 8 + comment.len()], comment);
    assert!(wav[note + 8 + comment.len()..note + 8 + size].iter().all(|&b| b == 0));

    assert_eq!(pcm_data(&wav).len(), 2 * 1024 * 6);
    assert!(find_chunk(&wav, b"smpl").is_none());

    let wav = decode(&data, &options(SampleFormat::F32)).unwrap();
    let fmt = find_chunk(&wav, b"fmt ").unwrap();
    assert_eq!(u16_at(&wav, fmt + 8), 3);
    assert_eq!(u16_at(&wav, fmt + 22), 32);
}

#[test]
fn test_音量缩放() {
    let data = build_file(&builder(1, 2));
    let full = decode(&data, &options(SampleFormat::F32)).unwrap();
    let muted = decode(&data, &options(SampleFormat::F32).with_volume(0.0)).unwrap();
    assert!(pcm_data(&full).iter().any(|&b| b != 0));
    assert!(
        pcm_data(&muted)
            .chunks_exact(4)
            .all(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]) == 0.0)
    );
}

#[test]
fn test_坏块静音代替() {
    init_logger();
    let mut data = build_file(&builder(1, 3));
    let reference = decode(&data, &options(SampleFormat::S16)).unwrap();
    let info = HcaInfo::parse(&data).unwrap();
    let bad = info.block_range(1);
    data[bad.start + 100] ^= 0x5A;

    match decode(&data, &options(SampleFormat::S16)) {
        Err(HcaError::ChecksumMismatch { offset, .. }) => assert_eq!(offset, bad.start),
        other => panic!("应返回校验错误: {other:?}"),
    }

    let opts = options(SampleFormat::S16).with_frame_errors(FrameErrorPolicy::Silence);
    let wav = decode(&data, &opts).unwrap();
    let pcm = pcm_data(&wav);
    assert_eq!(pcm.len(), 3 * 1024 * 2);
    assert_eq!(&pcm[..1024 * 2], &pcm_data(&reference)[..1024 * 2]);
    assert!(pcm[1024 * 2..2048 * 2].iter().all(|&b| b == 0));
}

#[test]
fn test_修复校验和后可解码() {
    let mut data = build_file(&builder(1, 2));
    let info = HcaInfo::parse(&data).unwrap();
    let block = info.block_range(0);
    data[block.start + 100] ^= 0x01;
    assert!(decode(&data, &DecodeOptions::default()).is_err());

    hca::format::fix_checksum(&mut data).unwrap();
    let wav = decode(&data, &DecodeOptions::default()).unwrap();
    assert_eq!(pcm_data(&wav).len(), 2 * 1024 * 4);
}

#[test]
fn test_并行解码多个文件() {
    let files = vec![
        build_file(&builder(1, 2)),
        build_file(&builder(2, 3)),
        build_file(&builder(1, 1).loop_region(0, 0, 0, 0)),
    ];
    let opts = options(SampleFormat::S16);
    let results = hca::format::decode_many(&files, &opts);
    assert_eq!(results.len(), files.len());
    for (data, result) in files.iter().zip(results) {
        assert_eq!(result.unwrap(), decode(data, &opts).unwrap());
    }
}

#[test]
fn test_块放不下校验和时报错() {
    let mut data = hca::codec::HeaderBuilder::new(1, SAMPLE_RATE)
        .block_size(1)
        .cipher(0)
        .build()
        .unwrap();
    data.push(0);

    assert!(matches!(
        HcaInfo::parse(&data),
        Err(HcaError::HeaderInvariantViolation(_))
    ));
    assert!(decode(&data, &DecodeOptions::default()).is_err());
    assert!(hca::format::fix_checksum(&mut data.clone()).is_err());
    assert!(hca::format::decrypt(&mut data.clone(), &CipherConfig::NoKey).is_err());
    assert!(hca::format::encrypt(&mut data.clone(), &CipherConfig::NoKey).is_err());
}
