//! HCA 文件头解析与修改.
//!
//! 头部结构 (所有多字节字段为大端序):
//! - 0..4: 魔数 `"HCA\0"`, 签名字符最高位可能置位 (加密文件的掩码)
//! - 4: 主版本号, 5: 次版本号
//! - 6..8: 数据偏移 (即头部长度)
//! - 8..: 若干段, 每段以 1~4 字符签名开头, 直到 `pad` 段或数据偏移 - 2
//! - 数据偏移 - 2: 头部 CRC-16
//!
//! [`HcaInfo`] 是对头部字节的一次纯解析结果; 修改头部的操作都遵循
//! "修改字节, 修复校验, 重新解析" 的流程, 返回新的 [`HcaInfo`].

use std::ops::Range;

use encoding_rs::SHIFT_JIS;
use hca_core::crc;
use hca_core::{HcaError, HcaResult};
use log::debug;
use serde::Serialize;

use crate::SAMPLES_PER_FRAME;

/// 头部段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    /// 基本格式: 声道数, 采样率, 块数
    Fmt,
    /// 压缩参数
    Comp,
    /// 旧版压缩参数
    Dec,
    /// 可变码率参数
    Vbr,
    /// 绝对听阈曲线开关
    Ath,
    /// 循环区间
    Loop,
    /// 加密类型
    Ciph,
    /// 音量调整
    Rva,
    /// 注释 (Shift-JIS)
    Comm,
    /// 填充, 总是最后一段
    Pad,
}

impl SectionKind {
    /// 段签名
    pub const fn signature(&self) -> &'static str {
        match self {
            Self::Fmt => "fmt",
            Self::Comp => "comp",
            Self::Dec => "dec",
            Self::Vbr => "vbr",
            Self::Ath => "ath",
            Self::Loop => "loop",
            Self::Ciph => "ciph",
            Self::Rva => "rva",
            Self::Comm => "comm",
            Self::Pad => "pad",
        }
    }

    /// 由签名识别段类型
    pub fn from_signature(signature: &str) -> Option<Self> {
        Some(match signature {
            "fmt" => Self::Fmt,
            "comp" => Self::Comp,
            "dec" => Self::Dec,
            "vbr" => Self::Vbr,
            "ath" => Self::Ath,
            "loop" => Self::Loop,
            "ciph" => Self::Ciph,
            "rva" => Self::Rva,
            "comm" => Self::Comm,
            "pad" => Self::Pad,
            _ => return None,
        })
    }

    /// 固定长度段的数据部分字节数 (不含 4 字节签名)
    pub const fn payload_len(&self) -> Option<usize> {
        match self {
            Self::Fmt | Self::Comp | Self::Loop => Some(12),
            Self::Dec => Some(8),
            Self::Vbr | Self::Rva => Some(4),
            Self::Ath | Self::Ciph => Some(2),
            Self::Comm | Self::Pad => None,
        }
    }
}

/// `fmt` 段
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormatInfo {
    /// 声道数
    pub channel_count: u32,
    /// 采样率 (Hz)
    pub sampling_rate: u32,
    /// 块 (帧) 数
    pub block_count: u32,
    /// 开头丢弃的采样数
    pub dropped_header: u32,
    /// 结尾丢弃的采样数
    pub dropped_footer: u32,
}

/// `comp` / `dec` 段
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompressionInfo {
    pub min_resolution: u32,
    pub max_resolution: u32,
    pub track_count: u32,
    pub channel_config: u32,
    pub total_band_count: u32,
    pub base_band_count: u32,
    pub stereo_band_count: u32,
    pub hfr_band_count: u32,
    pub bands_per_hfr_group: u32,
    pub reserved1: u32,
    pub reserved2: u32,
}

/// `loop` 段
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopInfo {
    /// 循环起始块
    pub start: u32,
    /// 循环结束块 (包含)
    pub end: u32,
    /// 起始块开头丢弃的采样数
    pub dropped_header: u32,
    /// 结束块末尾丢弃的采样数
    pub dropped_footer: u32,
}

/// `vbr` 段
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VbrInfo {
    pub max_block_size: u32,
    pub noise_level: i32,
}

/// 头部段在文件中的位置
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderSection {
    /// 去掉掩码位的签名
    pub signature: String,
    /// 段的字节范围 (含签名)
    pub range: Range<usize>,
}

/// 解析后的 HCA 文件头
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HcaInfo {
    /// 版本号, 如 `"2.0"`
    pub version: String,
    /// 数据偏移 (头部长度)
    pub data_offset: usize,
    pub format: FormatInfo,
    /// 每块字节数
    pub block_size: usize,
    pub comp: CompressionInfo,
    /// `dec` 段的立体声类型
    pub dec_stereo_type: u32,
    pub loop_info: Option<LoopInfo>,
    pub vbr: Option<VbrInfo>,
    /// 是否使用 ATH 曲线
    pub use_ath_curve: bool,
    /// 加密类型 (0 / 1 / 0x38)
    pub cipher: u16,
    /// 音量调整
    pub rva: Option<f32>,
    /// 注释
    pub comment: Option<String>,
    /// 各段的位置, 按出现顺序
    pub sections: Vec<HeaderSection>,
    /// 比特率 (kbps)
    pub kbps: f64,

    // 派生值
    pub hfr_group_count: u32,
    pub full_sample_count: u64,
    pub start_at_sample: u64,
    pub full_end_at_sample: u64,
    pub loop_start_at_sample: u64,
    pub loop_end_at_sample: u64,
    pub end_at_sample: u64,
    pub sample_count: u64,
    /// 所有数据块的总字节数
    pub data_size: usize,
    /// 完整文件字节数
    pub full_size: usize,
}

impl HcaInfo {
    /// 解析头部
    ///
    /// `data` 至少包含完整头部 (数据偏移之前的字节), 可以是整个文件.
    pub fn parse(data: &[u8]) -> HcaResult<Self> {
        let data_offset = read_data_offset(data)?;
        if data.len() < data_offset {
            return Err(HcaError::InvalidFormat(format!(
                "头部不完整: 需要 {} 字节, 实际 {} 字节",
                data_offset,
                data.len(),
            )));
        }
        crc::verify_checksum(data, data_offset - 2)?;

        let header = &data[..data_offset];
        let sections = walk_sections(header, data_offset)?;

        let mut info = Self {
            version: format!("{}.{}", header[4], header[5]),
            data_offset,
            format: FormatInfo::default(),
            block_size: 0,
            comp: CompressionInfo::default(),
            dec_stereo_type: 0,
            loop_info: None,
            vbr: None,
            use_ath_curve: false,
            cipher: 0,
            rva: None,
            comment: None,
            sections: Vec::new(),
            kbps: 0.0,
            hfr_group_count: 0,
            full_sample_count: 0,
            start_at_sample: 0,
            full_end_at_sample: 0,
            loop_start_at_sample: 0,
            loop_end_at_sample: 0,
            end_at_sample: 0,
            sample_count: 0,
            data_size: 0,
            full_size: 0,
        };

        for section in &sections {
            info.read_section(header, section)?;
        }
        info.sections = sections;
        info.derive()?;

        debug!(
            "HCA 头部: v{}, {} 声道, {} Hz, {} 块 x {} 字节, 加密类型 {}",
            info.version,
            info.format.channel_count,
            info.format.sampling_rate,
            info.format.block_count,
            info.block_size,
            info.cipher,
        );
        Ok(info)
    }

    fn read_section(&mut self, h: &[u8], section: &HeaderSection) -> HcaResult<()> {
        let p = section.range.start;
        match SectionKind::from_signature(&section.signature) {
            Some(SectionKind::Fmt) => {
                self.format.channel_count = u32::from(h[p + 4]);
                self.format.sampling_rate = be_u32(h, p + 4) & 0x00FF_FFFF;
                self.format.block_count = be_u32(h, p + 8);
                self.format.dropped_header = u32::from(be_u16(h, p + 12));
                self.format.dropped_footer = u32::from(be_u16(h, p + 14));
            }
            Some(SectionKind::Comp) => {
                self.block_size = usize::from(be_u16(h, p + 4));
                let c = &mut self.comp;
                c.min_resolution = u32::from(h[p + 6]);
                c.max_resolution = u32::from(h[p + 7]);
                c.track_count = u32::from(h[p + 8]);
                c.channel_config = u32::from(h[p + 9]);
                c.total_band_count = u32::from(h[p + 10]);
                c.base_band_count = u32::from(h[p + 11]);
                c.stereo_band_count = u32::from(h[p + 12]);
                c.bands_per_hfr_group = u32::from(h[p + 13]);
                c.reserved1 = u32::from(h[p + 14]);
                c.reserved2 = u32::from(h[p + 15]);
            }
            Some(SectionKind::Dec) => {
                self.block_size = usize::from(be_u16(h, p + 4));
                let c = &mut self.comp;
                c.min_resolution = u32::from(h[p + 6]);
                c.max_resolution = u32::from(h[p + 7]);
                c.total_band_count = u32::from(h[p + 8]) + 1;
                c.base_band_count = u32::from(h[p + 9]) + 1;
                c.track_count = u32::from(h[p + 10] >> 4);
                c.channel_config = u32::from(h[p + 10] & 0x0F);
                self.dec_stereo_type = u32::from(h[p + 11]);
                if self.dec_stereo_type == 0 {
                    c.base_band_count = c.total_band_count;
                } else {
                    c.stereo_band_count = c.total_band_count.saturating_sub(c.base_band_count);
                }
            }
            Some(SectionKind::Vbr) => {
                self.vbr = Some(VbrInfo {
                    max_block_size: u32::from(be_u16(h, p + 4)),
                    noise_level: i32::from(be_u16(h, p + 6) as i16),
                });
            }
            Some(SectionKind::Ath) => {
                self.use_ath_curve = be_u16(h, p + 4) == 1;
            }
            Some(SectionKind::Loop) => {
                self.loop_info = Some(LoopInfo {
                    start: be_u32(h, p + 4),
                    end: be_u32(h, p + 8),
                    dropped_header: u32::from(be_u16(h, p + 12)),
                    dropped_footer: u32::from(be_u16(h, p + 14)),
                });
            }
            Some(SectionKind::Ciph) => {
                self.cipher = be_u16(h, p + 4);
            }
            Some(SectionKind::Rva) => {
                self.rva = Some(f32::from_bits(be_u32(h, p + 4)));
            }
            Some(SectionKind::Comm) => {
                let text = &h[p + 5..section.range.end];
                let (decoded, _, _) = SHIFT_JIS.decode(text);
                self.comment = Some(decoded.into_owned());
            }
            Some(SectionKind::Pad) => {}
            None => {
                return Err(HcaError::UnknownHeaderSection(section.signature.clone()));
            }
        }
        Ok(())
    }

    /// 计算派生字段并检查约束
    fn derive(&mut self) -> HcaResult<()> {
        let c = &mut self.comp;
        if c.bands_per_hfr_group > 0 {
            let hfr = i64::from(c.total_band_count)
                - i64::from(c.base_band_count)
                - i64::from(c.stereo_band_count);
            if hfr < 0 {
                return Err(HcaError::HeaderInvariantViolation(format!(
                    "频带数不一致: total={}, base={}, stereo={}",
                    c.total_band_count, c.base_band_count, c.stereo_band_count,
                )));
            }
            c.hfr_band_count = hfr as u32;
            self.hfr_group_count = c.hfr_band_count.div_ceil(c.bands_per_hfr_group);
        }

        let frame = SAMPLES_PER_FRAME as i64;
        let full = i64::from(self.format.block_count) * frame;
        let start = i64::from(self.format.dropped_header);
        let full_end = full - i64::from(self.format.dropped_footer);

        self.kbps = f64::from(self.format.sampling_rate) * self.block_size as f64 / 128000.0;

        // 块至少要容纳末尾 2 字节的校验和
        check(self.block_size >= 2, "块大小小于 2")?;
        check(self.format.block_count > 0, "块数为 0")?;
        check(start < full_end, "起始采样不小于结束采样")?;
        check(full_end <= full, "结束采样超过总采样数")?;

        let mut end = full_end;
        if let Some(lp) = &self.loop_info {
            let loop_start = i64::from(lp.start) * frame + i64::from(lp.dropped_header);
            let loop_end = (i64::from(lp.end) + 1) * frame - i64::from(lp.dropped_footer);
            check(start <= loop_start, "循环起点早于起始采样")?;
            check(loop_start < loop_end, "循环区间为空")?;
            check(loop_end <= full_end, "循环终点超过结束采样")?;
            self.loop_start_at_sample = loop_start as u64;
            self.loop_end_at_sample = loop_end as u64;
            end = loop_end;
        }

        self.full_sample_count = full as u64;
        self.start_at_sample = start as u64;
        self.full_end_at_sample = full_end as u64;
        self.end_at_sample = end as u64;
        self.sample_count = (end - start) as u64;
        self.data_size = self.block_size * self.format.block_count as usize;
        self.full_size = self.data_offset + self.data_size;
        Ok(())
    }

    /// 是否包含指定签名的段
    pub fn has_section(&self, signature: &str) -> bool {
        self.section(signature).is_some()
    }

    /// 指定签名的段位置
    pub fn section(&self, signature: &str) -> Option<&Range<usize>> {
        self.sections
            .iter()
            .find(|s| s.signature == signature)
            .map(|s| &s.range)
    }

    /// 是否有循环区间
    pub fn has_loop(&self) -> bool {
        self.loop_info.is_some()
    }

    /// 循环区间的采样数
    pub fn loop_sample_count(&self) -> u64 {
        self.loop_end_at_sample - self.loop_start_at_sample
    }

    /// 第 `index` 块在文件中的字节范围
    pub fn block_range(&self, index: usize) -> Range<usize> {
        let start = self.data_offset + self.block_size * index;
        start..start + self.block_size
    }

    /// 原地修改一个段的数据部分, 返回重新解析的头部
    ///
    /// 修改后按新的加密状态重新设置所有签名的掩码位 (修改 `ciph` 段时以新值为准),
    /// 并修复头部校验和.
    pub fn modify(data: &mut [u8], signature: &str, payload: &[u8]) -> HcaResult<Self> {
        let info = Self::parse(data)?;
        let range = info.section(signature).cloned().ok_or_else(|| {
            HcaError::InvalidArgument(format!("头部段 {signature} 不存在"))
        })?;
        let capacity = range.len() - 4;
        if payload.len() > capacity {
            return Err(HcaError::SectionTooLarge {
                signature: signature.to_string(),
                capacity,
                requested: payload.len(),
            });
        }

        let masked = if signature == SectionKind::Ciph.signature() {
            match payload {
                [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]) != 0,
                _ => {
                    return Err(HcaError::InvalidArgument(
                        "ciph 段数据至少需要 2 字节".into(),
                    ));
                }
            }
        } else {
            info.cipher != 0
        };

        data[range.start + 4..range.start + 4 + payload.len()].copy_from_slice(payload);
        apply_signature_masks(data, info.data_offset, masked)?;
        crc::fix_checksum(data, info.data_offset - 2)?;
        Self::parse(data)
    }

    /// 插入一个新段, 返回新的文件字节
    ///
    /// 新段插在 `pad` 段之前, 没有 `pad` 段时插在头部校验和之前.
    pub fn add_section(data: &[u8], signature: &str, payload: &[u8]) -> HcaResult<Vec<u8>> {
        if signature.is_empty() || signature.len() > 4 || !signature.is_ascii() {
            return Err(HcaError::InvalidArgument(format!(
                "段签名必须为 1~4 个 ASCII 字符: {signature:?}"
            )));
        }
        let kind = SectionKind::from_signature(signature)
            .ok_or_else(|| HcaError::UnknownHeaderSection(signature.to_string()))?;
        if kind == SectionKind::Pad {
            return Err(HcaError::InvalidArgument("不能插入 pad 段".into()));
        }
        match kind.payload_len() {
            Some(len) if payload.len() != len => {
                return Err(HcaError::InvalidArgument(format!(
                    "{signature} 段数据应为 {len} 字节, 实际 {} 字节",
                    payload.len()
                )));
            }
            None if payload.first().map(|&n| usize::from(n) + 1) != Some(payload.len()) => {
                return Err(HcaError::InvalidArgument(
                    "comm 段数据应为 1 字节长度加文本".into(),
                ));
            }
            _ => {}
        }

        let info = Self::parse(data)?;
        if info.has_section(signature) {
            return Err(HcaError::InvalidArgument(format!(
                "头部段 {signature} 已存在"
            )));
        }

        let insert_at = info
            .section(SectionKind::Pad.signature())
            .map_or(info.data_offset - 2, |r| r.start);
        let inserted = 4 + payload.len();
        let new_offset = info.data_offset + inserted;
        let new_offset_u16 = u16::try_from(new_offset).map_err(|_| {
            HcaError::InvalidArgument(format!("头部长度 {new_offset} 超过 65535"))
        })?;

        let mut sig = [0u8; 4];
        sig[..signature.len()].copy_from_slice(signature.as_bytes());

        let mut out = Vec::with_capacity(data.len() + inserted);
        out.extend_from_slice(&data[..insert_at]);
        out.extend_from_slice(&sig);
        out.extend_from_slice(payload);
        out.extend_from_slice(&data[insert_at..]);
        out[6..8].copy_from_slice(&new_offset_u16.to_be_bytes());

        if info.cipher != 0 {
            apply_signature_masks(&mut out, new_offset, true)?;
        }
        crc::fix_checksum(&mut out, new_offset - 2)?;
        Self::parse(&out)?;
        Ok(out)
    }

    /// 插入 `ciph` 段, 缺省类型为 0
    pub fn add_cipher_section(data: &[u8], cipher_type: Option<u16>) -> HcaResult<Vec<u8>> {
        let payload = cipher_type.unwrap_or(0).to_be_bytes();
        Self::add_section(data, SectionKind::Ciph.signature(), &payload)
    }
}

/// 修复头部校验和, 只检查魔数, 不解析各段
pub fn fix_header_checksum(data: &mut [u8]) -> HcaResult<()> {
    let data_offset = read_data_offset(data)?;
    crc::fix_checksum(data, data_offset - 2)?;
    Ok(())
}

fn check(cond: bool, msg: &str) -> HcaResult<()> {
    if cond {
        Ok(())
    } else {
        Err(HcaError::HeaderInvariantViolation(msg.to_string()))
    }
}

fn be_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

fn be_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// 读取签名: 最多 4 字节, 遇到 0 结束, 去掉最高位. 返回 (签名, 字符数)
fn read_signature(data: &[u8], offset: usize) -> (String, usize) {
    let raw = &data[offset..offset + 4];
    let len = raw.iter().position(|&b| b == 0).unwrap_or(4);
    let sig = raw[..len].iter().map(|&b| char::from(b & 0x7F)).collect();
    (sig, len)
}

/// 设置或清除签名的掩码位
fn mask_signature(data: &mut [u8], offset: usize, masked: bool) {
    let raw = &mut data[offset..offset + 4];
    let len = raw.iter().position(|&b| b == 0).unwrap_or(4);
    if len == 0 {
        return;
    }
    for (i, b) in raw.iter_mut().enumerate() {
        *b &= 0x7F;
        if masked && i < len {
            *b |= 0x80;
        }
    }
}

/// 校验魔数并读取数据偏移
fn read_data_offset(data: &[u8]) -> HcaResult<usize> {
    if data.len() < 8 {
        return Err(HcaError::InvalidFormat("数据过短, 不是 HCA 文件".into()));
    }
    let (magic, _) = read_signature(data, 0);
    if magic != "HCA" {
        return Err(HcaError::InvalidFormat("不是 HCA 文件".into()));
    }
    let data_offset = usize::from(be_u16(data, 6));
    if data_offset < 10 {
        return Err(HcaError::InvalidFormat(format!(
            "数据偏移过小: {data_offset}"
        )));
    }
    Ok(data_offset)
}

/// 遍历头部各段, 得到签名与字节范围 (不解析内容)
fn walk_sections(header: &[u8], data_offset: usize) -> HcaResult<Vec<HeaderSection>> {
    let limit = data_offset - 2;
    let mut sections = Vec::new();
    let mut pos = 8;
    while pos < limit {
        if pos + 4 > limit {
            return Err(HcaError::InvalidFormat(format!("段签名越界: 偏移 {pos}")));
        }
        let (signature, _) = read_signature(header, pos);
        let kind = SectionKind::from_signature(&signature)
            .ok_or_else(|| HcaError::UnknownHeaderSection(signature.clone()))?;
        let end = match kind {
            SectionKind::Pad => limit,
            SectionKind::Comm => {
                let len = header.get(pos + 4).copied().ok_or_else(|| {
                    HcaError::InvalidFormat("comm 段越界".into())
                })?;
                pos + 5 + usize::from(len)
            }
            _ => pos + 4 + kind.payload_len().unwrap_or(0),
        };
        if end > limit {
            return Err(HcaError::InvalidFormat(format!(
                "{signature} 段越界: {pos}..{end} 超过 {limit}"
            )));
        }
        sections.push(HeaderSection {
            signature,
            range: pos..end,
        });
        if kind == SectionKind::Pad {
            break;
        }
        pos = end;
    }
    Ok(sections)
}

/// 按加密状态重新设置魔数与所有段签名的掩码位
fn apply_signature_masks(data: &mut [u8], data_offset: usize, masked: bool) -> HcaResult<()> {
    mask_signature(data, 0, masked);
    let starts: Vec<usize> = walk_sections(&data[..data_offset], data_offset)?
        .into_iter()
        .map(|s| s.range.start)
        .collect();
    for start in starts {
        mask_signature(data, start, masked);
    }
    Ok(())
}

/// 头部构造器
///
/// 生成一个带 `fmt`/`comp` 以及可选段的合法头部, 供工具和测试合成 HCA 文件.
///
/// ```
/// use hca_codec::header::{HcaInfo, HeaderBuilder};
///
/// let header = HeaderBuilder::new(2, 44100).block_count(10).build().unwrap();
/// let info = HcaInfo::parse(&header).unwrap();
/// assert_eq!(info.format.channel_count, 2);
/// assert_eq!(info.full_sample_count, 10 * 1024);
/// ```
#[derive(Debug, Clone)]
pub struct HeaderBuilder {
    version: (u8, u8),
    channel_count: u8,
    sampling_rate: u32,
    block_count: u32,
    dropped_header: u16,
    dropped_footer: u16,
    block_size: u16,
    min_resolution: u8,
    max_resolution: u8,
    track_count: u8,
    channel_config: u8,
    total_band_count: u8,
    base_band_count: u8,
    stereo_band_count: u8,
    bands_per_hfr_group: u8,
    loop_region: Option<LoopInfo>,
    ath: Option<u16>,
    cipher: Option<u16>,
    rva: Option<f32>,
    comment: Option<String>,
    pad: bool,
    min_data_offset: usize,
}

impl HeaderBuilder {
    /// 以声道数与采样率创建, 其他参数取常见默认值
    pub fn new(channel_count: u8, sampling_rate: u32) -> Self {
        Self {
            version: (2, 0),
            channel_count,
            sampling_rate,
            block_count: 1,
            dropped_header: 0,
            dropped_footer: 0,
            block_size: 0x155,
            min_resolution: 1,
            max_resolution: 15,
            track_count: 1,
            channel_config: 0,
            total_band_count: 128,
            base_band_count: 128,
            stereo_band_count: 0,
            bands_per_hfr_group: 0,
            loop_region: None,
            ath: None,
            cipher: None,
            rva: None,
            comment: None,
            pad: true,
            min_data_offset: 96,
        }
    }

    pub fn version(mut self, major: u8, minor: u8) -> Self {
        self.version = (major, minor);
        self
    }

    pub fn block_count(mut self, block_count: u32) -> Self {
        self.block_count = block_count;
        self
    }

    pub fn block_size(mut self, block_size: u16) -> Self {
        self.block_size = block_size;
        self
    }

    /// 开头与结尾丢弃的采样数
    pub fn dropped(mut self, header: u16, footer: u16) -> Self {
        self.dropped_header = header;
        self.dropped_footer = footer;
        self
    }

    /// 频带划分: 总频带, 基础频带, 立体声频带, 每个高频组的频带数
    pub fn bands(mut self, total: u8, base: u8, stereo: u8, per_hfr_group: u8) -> Self {
        self.total_band_count = total;
        self.base_band_count = base;
        self.stereo_band_count = stereo;
        self.bands_per_hfr_group = per_hfr_group;
        self
    }

    pub fn tracks(mut self, track_count: u8, channel_config: u8) -> Self {
        self.track_count = track_count;
        self.channel_config = channel_config;
        self
    }

    pub fn resolution(mut self, min: u8, max: u8) -> Self {
        self.min_resolution = min;
        self.max_resolution = max;
        self
    }

    /// 循环区间: 起始块, 结束块, 起始块丢弃采样, 结束块丢弃采样
    pub fn loop_region(mut self, start: u32, end: u32, dropped_header: u16, dropped_footer: u16) -> Self {
        self.loop_region = Some(LoopInfo {
            start,
            end,
            dropped_header: u32::from(dropped_header),
            dropped_footer: u32::from(dropped_footer),
        });
        self
    }

    pub fn ath(mut self, ath_type: u16) -> Self {
        self.ath = Some(ath_type);
        self
    }

    pub fn cipher(mut self, cipher_type: u16) -> Self {
        self.cipher = Some(cipher_type);
        self
    }

    pub fn rva(mut self, volume: f32) -> Self {
        self.rva = Some(volume);
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// 是否写 `pad` 段
    pub fn pad(mut self, pad: bool) -> Self {
        self.pad = pad;
        self
    }

    /// 生成头部字节 (长度即数据偏移), 加密类型非 0 时签名带掩码
    pub fn build(&self) -> HcaResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.min_data_offset);
        out.extend_from_slice(b"HCA\0");
        out.extend_from_slice(&[self.version.0, self.version.1, 0, 0]);

        out.extend_from_slice(b"fmt\0");
        let rate = self.sampling_rate & 0x00FF_FFFF;
        out.extend_from_slice(&((u32::from(self.channel_count) << 24) | rate).to_be_bytes());
        out.extend_from_slice(&self.block_count.to_be_bytes());
        out.extend_from_slice(&self.dropped_header.to_be_bytes());
        out.extend_from_slice(&self.dropped_footer.to_be_bytes());

        out.extend_from_slice(b"comp");
        out.extend_from_slice(&self.block_size.to_be_bytes());
        out.extend_from_slice(&[
            self.min_resolution,
            self.max_resolution,
            self.track_count,
            self.channel_config,
            self.total_band_count,
            self.base_band_count,
            self.stereo_band_count,
            self.bands_per_hfr_group,
            0,
            0,
        ]);

        if let Some(ath) = self.ath {
            out.extend_from_slice(b"ath\0");
            out.extend_from_slice(&ath.to_be_bytes());
        }
        if let Some(lp) = &self.loop_region {
            out.extend_from_slice(b"loop");
            out.extend_from_slice(&lp.start.to_be_bytes());
            out.extend_from_slice(&lp.end.to_be_bytes());
            out.extend_from_slice(&(lp.dropped_header as u16).to_be_bytes());
            out.extend_from_slice(&(lp.dropped_footer as u16).to_be_bytes());
        }
        if let Some(cipher) = self.cipher {
            out.extend_from_slice(b"ciph");
            out.extend_from_slice(&cipher.to_be_bytes());
        }
        if let Some(rva) = self.rva {
            out.extend_from_slice(b"rva\0");
            out.extend_from_slice(&rva.to_bits().to_be_bytes());
        }
        if let Some(comment) = &self.comment {
            let (encoded, _, _) = SHIFT_JIS.encode(comment);
            let len = u8::try_from(encoded.len()).map_err(|_| {
                HcaError::InvalidArgument(format!("注释过长: {} 字节", encoded.len()))
            })?;
            out.extend_from_slice(b"comm");
            out.push(len);
            out.extend_from_slice(&encoded);
        }
        if self.pad {
            out.extend_from_slice(b"pad\0");
            let target = self.min_data_offset.saturating_sub(2);
            if out.len() < target {
                out.resize(target, 0);
            }
        }
        out.extend_from_slice(&[0, 0]);

        let data_offset = u16::try_from(out.len()).map_err(|_| {
            HcaError::InvalidArgument(format!("头部长度 {} 超过 65535", out.len()))
        })?;
        out[6..8].copy_from_slice(&data_offset.to_be_bytes());

        if self.cipher.unwrap_or(0) != 0 {
            apply_signature_masks(&mut out, data_offset as usize, true)?;
        }
        let crc_offset = out.len() - 2;
        crc::fix_checksum(&mut out, crc_offset)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic() -> HeaderBuilder {
        HeaderBuilder::new(2, 44100)
            .block_count(10)
            .block_size(0x200)
            .dropped(512, 100)
    }

    #[test]
    fn test_构建的头部校验和为零() {
        for builder in [basic(), basic().tracks(1, 0).cipher(0x38), HeaderBuilder::new(1, 48000)] {
            let header = builder.build().unwrap();
            assert_eq!(crc::crc16(&header), 0);
            crc::verify_checksum(&header, header.len() - 2).unwrap();
        }
    }

    #[test]
    fn test_解析_基本字段() {
        let header = basic().bands(128, 96, 16, 4).tracks(1, 0).build().unwrap();
        let info = HcaInfo::parse(&header).unwrap();
        assert_eq!(info.version, "2.0");
        assert_eq!(info.data_offset, 96);
        assert_eq!(info.format.channel_count, 2);
        assert_eq!(info.format.sampling_rate, 44100);
        assert_eq!(info.block_size, 0x200);
        assert_eq!(info.comp.hfr_band_count, 16);
        assert_eq!(info.hfr_group_count, 4);
        assert_eq!(info.full_sample_count, 10240);
        assert_eq!(info.start_at_sample, 512);
        assert_eq!(info.full_end_at_sample, 10140);
        assert_eq!(info.end_at_sample, 10140);
        assert_eq!(info.sample_count, 10140 - 512);
        assert_eq!(info.data_size, 0x200 * 10);
        assert_eq!(info.full_size, 96 + 0x200 * 10);
        assert!(!info.has_loop());
        assert!(info.has_section("pad"));
        assert_eq!(info.section("pad").unwrap().end, 94);
    }

    #[test]
    fn test_解析_循环与可选段() {
        let header = basic()
            .loop_region(2, 5, 100, 24)
            .ath(1)
            .rva(0.5)
            .comment("テスト")
            .build()
            .unwrap();
        let info = HcaInfo::parse(&header).unwrap();
        assert_eq!(info.loop_start_at_sample, 2 * 1024 + 100);
        assert_eq!(info.loop_end_at_sample, 6 * 1024 - 24);
        assert_eq!(info.end_at_sample, info.loop_end_at_sample);
        assert_eq!(info.loop_sample_count(), 6 * 1024 - 24 - 2148);
        assert!(info.use_ath_curve);
        assert_eq!(info.rva, Some(0.5));
        assert_eq!(info.comment.as_deref(), Some("テスト"));
    }

    #[test]
    fn test_解析_dec_段() {
        // 用 dec 段替换 comp 段: 手工拼接
        let mut h = Vec::new();
        h.extend_from_slice(b"HCA\0\x01\x03\0\0");
        h.extend_from_slice(b"fmt\0");
        h.extend_from_slice(&((1u32 << 24) | 22050).to_be_bytes());
        h.extend_from_slice(&4u32.to_be_bytes());
        h.extend_from_slice(&[0, 0, 0, 0]);
        h.extend_from_slice(b"dec\0");
        h.extend_from_slice(&0x100u16.to_be_bytes());
        h.extend_from_slice(&[1, 15, 127, 63, 0x21, 1]);
        h.extend_from_slice(&[0, 0]);
        let len = h.len() as u16;
        h[6..8].copy_from_slice(&len.to_be_bytes());
        crc::fix_checksum(&mut h, len as usize - 2).unwrap();

        let info = HcaInfo::parse(&h).unwrap();
        assert_eq!(info.version, "1.3");
        assert_eq!(info.comp.total_band_count, 128);
        assert_eq!(info.comp.base_band_count, 64);
        assert_eq!(info.comp.stereo_band_count, 64);
        assert_eq!(info.comp.track_count, 2);
        assert_eq!(info.comp.channel_config, 1);
        assert!(!info.has_section("pad"));
    }

    #[test]
    fn test_解析_错误() {
        assert!(matches!(
            HcaInfo::parse(b"RIFF\0\0\0\0").unwrap_err(),
            HcaError::InvalidFormat(_)
        ));

        let mut header = basic().build().unwrap();
        header[20] ^= 1;
        assert!(matches!(
            HcaInfo::parse(&header).unwrap_err(),
            HcaError::ChecksumMismatch { .. }
        ));

        let header = HeaderBuilder::new(1, 48000).block_count(0).build().unwrap();
        assert!(matches!(
            HcaInfo::parse(&header).unwrap_err(),
            HcaError::HeaderInvariantViolation(_)
        ));

        // 块放不下校验和
        for size in [0, 1] {
            let header = HeaderBuilder::new(1, 44100).block_size(size).build().unwrap();
            assert!(matches!(
                HcaInfo::parse(&header).unwrap_err(),
                HcaError::HeaderInvariantViolation(_)
            ));
        }

        // 循环终点超过结束采样
        let header = basic().loop_region(2, 10, 0, 0).build().unwrap();
        assert!(matches!(
            HcaInfo::parse(&header).unwrap_err(),
            HcaError::HeaderInvariantViolation(_)
        ));
    }

    #[test]
    fn test_未知段() {
        let mut header = basic().build().unwrap();
        let pad = HcaInfo::parse(&header).unwrap().section("pad").unwrap().start;
        header[pad..pad + 4].copy_from_slice(b"xyz\0");
        fix_header_checksum(&mut header).unwrap();
        assert!(matches!(
            HcaInfo::parse(&header).unwrap_err(),
            HcaError::UnknownHeaderSection(s) if s == "xyz"
        ));
    }

    #[test]
    fn test_掩码签名() {
        let header = basic().cipher(0x38).build().unwrap();
        assert_eq!(header[0], b'H' | 0x80);
        assert_eq!(header[3], 0);
        let info = HcaInfo::parse(&header).unwrap();
        assert_eq!(info.cipher, 0x38);
        let fmt = info.section("fmt").unwrap().start;
        assert_eq!(header[fmt], b'f' | 0x80);
        assert_eq!(header[fmt + 3], 0);
    }

    #[test]
    fn test_修改_ciph_段切换掩码() {
        let mut header = basic().cipher(1).build().unwrap();
        let info = HcaInfo::modify(&mut header, "ciph", &[0, 0]).unwrap();
        assert_eq!(info.cipher, 0);
        assert!(header.iter().take(3).all(|&b| b & 0x80 == 0));
        let comp = info.section("comp").unwrap().start;
        assert_eq!(&header[comp..comp + 4], b"comp");

        let info = HcaInfo::modify(&mut header, "ciph", &[0, 0x38]).unwrap();
        assert_eq!(info.cipher, 0x38);
        assert_eq!(header[comp], b'c' | 0x80);
    }

    #[test]
    fn test_修改_段过大() {
        let mut header = basic().cipher(0).build().unwrap();
        let err = HcaInfo::modify(&mut header, "ciph", &[0, 0, 0]).unwrap_err();
        assert!(matches!(
            err,
            HcaError::SectionTooLarge {
                capacity: 2,
                requested: 3,
                ..
            }
        ));
        assert!(HcaInfo::modify(&mut header, "loop", &[0; 12]).is_err());
    }

    #[test]
    fn test_插入_ciph_段() {
        let mut file = basic().build().unwrap();
        file.extend_from_slice(&[0xAB; 16]);
        let out = HcaInfo::add_cipher_section(&file, None).unwrap();
        assert_eq!(out.len(), file.len() + 6);
        let info = HcaInfo::parse(&out).unwrap();
        assert_eq!(info.data_offset, 102);
        assert_eq!(info.cipher, 0);
        assert!(info.has_section("ciph"));
        // pad 仍是最后一段, 数据块内容不变
        assert_eq!(info.sections.last().unwrap().signature, "pad");
        assert_eq!(&out[102..], &[0xAB; 16]);

        let err = HcaInfo::add_cipher_section(&out, Some(1)).unwrap_err();
        assert!(matches!(err, HcaError::InvalidArgument(_)));
    }

    #[test]
    fn test_插入_无_pad_段() {
        let header = basic().pad(false).build().unwrap();
        let out = HcaInfo::add_cipher_section(&header, Some(0x38)).unwrap();
        let info = HcaInfo::parse(&out).unwrap();
        assert_eq!(info.cipher, 0x38);
        assert_eq!(info.section("ciph").unwrap().end, info.data_offset - 2);
    }

    #[test]
    fn test_插入_参数检查() {
        let header = basic().build().unwrap();
        assert!(HcaInfo::add_section(&header, "ath", &[0, 1, 2]).is_err());
        assert!(HcaInfo::add_section(&header, "toolong", &[0, 1]).is_err());
        assert!(matches!(
            HcaInfo::add_section(&header, "zzz", &[]).unwrap_err(),
            HcaError::UnknownHeaderSection(_)
        ));
        let out = HcaInfo::add_section(&header, "comm", &[2, b'o', b'k']).unwrap();
        assert_eq!(HcaInfo::parse(&out).unwrap().comment.as_deref(), Some("ok"));
    }
}
