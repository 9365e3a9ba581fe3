//! WAV (RIFF WAVE) 封装器.
//!
//! 输出布局: `RIFF`/`WAVE` 头, `fmt ` 块, 可选的 `note` 块 (HCA 注释),
//! `data` 块, 可选的 `smpl` 块 (一个前向循环).
//!
//! 写入流程:
//! 1. `write_header()` - 写入 RIFF、fmt、note 和 data 块头
//! 2. `write_samples()` - 追加 PCM 数据
//! 3. `write_trailer()` - 检查数据量并写入 smpl 块

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use hca_core::{HcaError, HcaResult, SampleFormat};
use log::debug;

/// WAV 音频格式码: PCM 整数
const WAV_FORMAT_PCM: u16 = 0x0001;
/// WAV 音频格式码: IEEE 浮点
const WAV_FORMAT_IEEE_FLOAT: u16 = 0x0003;

/// fmt 块大小
const FMT_CHUNK_SIZE: u32 = 16;
/// smpl 块大小 (一个循环)
const SMPL_CHUNK_SIZE: u32 = 60;

/// smpl 块中的循环区间 (以输出采样为单位)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavLoop {
    pub start: u32,
    pub end: u32,
}

/// WAV 输出参数
#[derive(Debug, Clone, PartialEq)]
pub struct WavSpec {
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
    /// 写入 note 块的注释
    pub comment: Option<String>,
    /// 写入 smpl 块的循环
    pub loop_region: Option<WavLoop>,
}

impl WavSpec {
    /// 每个采样时刻 (所有声道) 的字节数
    pub fn block_align(&self) -> u16 {
        self.channels * self.sample_format.bytes_per_sample() as u16
    }
}

/// WAV 封装器
pub struct WavMuxer {
    spec: WavSpec,
    /// data 块声明的字节数
    data_size: u32,
    /// 已写入的数据字节数
    data_written: u64,
}

impl WavMuxer {
    /// 创建封装器, `data_size` 为将要写入的 PCM 字节数
    pub fn new(spec: WavSpec, data_size: u64) -> HcaResult<Self> {
        if spec.channels == 0 {
            return Err(HcaError::InvalidArgument("声道数不能为 0".into()));
        }
        let data_size = u32::try_from(data_size)
            .map_err(|_| HcaError::InvalidArgument(format!("WAV 数据过大: {data_size} 字节")))?;
        let muxer = Self {
            spec,
            data_size,
            data_written: 0,
        };
        u32::try_from(muxer.total_len() - 8).map_err(|_| {
            HcaError::InvalidArgument(format!("WAV 文件过大: {} 字节", muxer.total_len()))
        })?;
        Ok(muxer)
    }

    /// note 块的数据部分: UTF-8 注释, 补零到 4 字节对齐且至少留 4 字节
    fn note_payload(&self) -> Option<Vec<u8>> {
        self.spec.comment.as_ref().map(|comment| {
            let mut payload = comment.as_bytes().to_vec();
            let size = (payload.len() + 4).div_ceil(4) * 4;
            payload.resize(size, 0);
            payload
        })
    }

    /// data 块数据之前的字节数
    pub fn header_len(&self) -> u64 {
        let note = self.note_payload().map_or(0, |p| 8 + p.len() as u64);
        12 + 8 + u64::from(FMT_CHUNK_SIZE) + note + 8
    }

    /// 完整文件的字节数
    pub fn total_len(&self) -> u64 {
        let smpl = if self.spec.loop_region.is_some() {
            8 + u64::from(SMPL_CHUNK_SIZE)
        } else {
            0
        };
        self.header_len() + u64::from(self.data_size) + smpl
    }

    pub fn write_header<W: Write>(&self, w: &mut W) -> HcaResult<()> {
        let spec = &self.spec;
        let (audio_format, bits_per_sample) = if spec.sample_format.is_float() {
            (WAV_FORMAT_IEEE_FLOAT, 32u16)
        } else {
            (WAV_FORMAT_PCM, spec.sample_format.bits_per_sample() as u16)
        };
        let block_align = spec.block_align();
        let byte_rate = spec.sample_rate * u32::from(block_align);

        // RIFF header
        w.write_all(b"RIFF")?;
        w.write_u32::<LittleEndian>((self.total_len() - 8) as u32)?;
        w.write_all(b"WAVE")?;

        // fmt chunk
        w.write_all(b"fmt ")?;
        w.write_u32::<LittleEndian>(FMT_CHUNK_SIZE)?;
        w.write_u16::<LittleEndian>(audio_format)?;
        w.write_u16::<LittleEndian>(spec.channels)?;
        w.write_u32::<LittleEndian>(spec.sample_rate)?;
        w.write_u32::<LittleEndian>(byte_rate)?;
        w.write_u16::<LittleEndian>(block_align)?;
        w.write_u16::<LittleEndian>(bits_per_sample)?;

        if let Some(payload) = self.note_payload() {
            w.write_all(b"note")?;
            w.write_u32::<LittleEndian>(payload.len() as u32)?;
            w.write_all(&payload)?;
        }

        // data chunk header
        w.write_all(b"data")?;
        w.write_u32::<LittleEndian>(self.data_size)?;

        debug!(
            "WAV 写入头部: {} Hz, {} 声道, {} 位, 数据 {} 字节",
            spec.sample_rate, spec.channels, bits_per_sample, self.data_size,
        );
        Ok(())
    }

    /// 追加 PCM 数据
    pub fn write_samples<W: Write>(&mut self, w: &mut W, pcm: &[u8]) -> HcaResult<()> {
        w.write_all(pcm)?;
        self.data_written += pcm.len() as u64;
        Ok(())
    }

    pub fn write_trailer<W: Write>(&self, w: &mut W) -> HcaResult<()> {
        if self.data_written != u64::from(self.data_size) {
            return Err(HcaError::InvalidArgument(format!(
                "WAV 数据量不一致: 声明 {} 字节, 写入 {} 字节",
                self.data_size, self.data_written,
            )));
        }

        if let Some(lp) = self.spec.loop_region {
            let sample_period = (1e9 / f64::from(self.spec.sample_rate)) as u32;
            w.write_all(b"smpl")?;
            w.write_u32::<LittleEndian>(SMPL_CHUNK_SIZE)?;
            for v in [
                0,             // manufacturer
                0,             // product
                sample_period, // 纳秒
                0x3C,          // MIDI unity note
                0,             // MIDI pitch fraction
                0,             // SMPTE format
                1,             // SMPTE offset
                1,             // 循环数
                0x18,          // sampler data
                0,             // 循环 ID
                0,             // 前向循环
                lp.start,
                lp.end,
                0, // fraction
                0, // 无限循环
            ] {
                w.write_u32::<LittleEndian>(v)?;
            }
            debug!("WAV 写入 smpl 块: 循环 {}..{}", lp.start, lp.end);
        }
        Ok(())
    }
}
