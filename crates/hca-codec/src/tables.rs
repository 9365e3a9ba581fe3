//! HCA 解码常量表.
//!
//! 整数表直接给出; 浮点表由闭式公式在首次使用时生成.

use std::sync::OnceLock;

/// 绝对听阈 (ATH) 曲线, 按 1/8192 采样率步进索引
pub const ATH_CURVE: [u8; 656] = [
    0x78, 0x5F, 0x56, 0x51, 0x4E, 0x4C, 0x4B, 0x49, 0x48, 0x48, 0x47, 0x46, 0x46, 0x45, 0x45, 0x45,
    0x44, 0x44, 0x44, 0x44, 0x43, 0x43, 0x43, 0x43, 0x43, 0x43, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42,
    0x42, 0x42, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F,
    0x3F, 0x3F, 0x3F, 0x3E, 0x3E, 0x3E, 0x3E, 0x3E, 0x3E, 0x3D, 0x3D, 0x3D, 0x3D, 0x3D, 0x3D, 0x3D,
    0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B,
    0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B,
    0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3B, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C, 0x3C,
    0x3D, 0x3D, 0x3D, 0x3D, 0x3D, 0x3D, 0x3D, 0x3D, 0x3E, 0x3E, 0x3E, 0x3E, 0x3E, 0x3E, 0x3E, 0x3F,
    0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F, 0x3F,
    0x3F, 0x3F, 0x3F, 0x3F, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40,
    0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x40, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41,
    0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41,
    0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41, 0x41,
    0x41, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42,
    0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x43, 0x43, 0x43, 0x43,
    0x43, 0x43, 0x43, 0x43, 0x43, 0x43, 0x43, 0x43, 0x43, 0x43, 0x43, 0x43, 0x43, 0x44, 0x44, 0x44,
    0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x44, 0x45, 0x45, 0x45, 0x45, 0x45,
    0x45, 0x45, 0x45, 0x45, 0x45, 0x45, 0x45, 0x46, 0x46, 0x46, 0x46, 0x46, 0x46, 0x46, 0x46, 0x46,
    0x46, 0x47, 0x47, 0x47, 0x47, 0x47, 0x47, 0x47, 0x47, 0x47, 0x47, 0x48, 0x48, 0x48, 0x48, 0x48,
    0x48, 0x48, 0x48, 0x49, 0x49, 0x49, 0x49, 0x49, 0x49, 0x49, 0x49, 0x4A, 0x4A, 0x4A, 0x4A, 0x4A,
    0x4A, 0x4A, 0x4A, 0x4B, 0x4B, 0x4B, 0x4B, 0x4B, 0x4B, 0x4B, 0x4C, 0x4C, 0x4C, 0x4C, 0x4C, 0x4C,
    0x4D, 0x4D, 0x4D, 0x4D, 0x4D, 0x4D, 0x4E, 0x4E, 0x4E, 0x4E, 0x4E, 0x4E, 0x4F, 0x4F, 0x4F, 0x4F,
    0x4F, 0x4F, 0x50, 0x50, 0x50, 0x50, 0x50, 0x51, 0x51, 0x51, 0x51, 0x51, 0x52, 0x52, 0x52, 0x52,
    0x52, 0x53, 0x53, 0x53, 0x53, 0x54, 0x54, 0x54, 0x54, 0x54, 0x55, 0x55, 0x55, 0x55, 0x56, 0x56,
    0x56, 0x56, 0x57, 0x57, 0x57, 0x57, 0x57, 0x58, 0x58, 0x58, 0x59, 0x59, 0x59, 0x59, 0x5A, 0x5A,
    0x5A, 0x5A, 0x5B, 0x5B, 0x5B, 0x5B, 0x5C, 0x5C, 0x5C, 0x5D, 0x5D, 0x5D, 0x5D, 0x5E, 0x5E, 0x5E,
    0x5E, 0x5F, 0x5F, 0x5F, 0x60, 0x60, 0x60, 0x61, 0x61, 0x61, 0x61, 0x62, 0x62, 0x62, 0x63, 0x63,
    0x63, 0x64, 0x64, 0x64, 0x65, 0x65, 0x65, 0x66, 0x66, 0x66, 0x67, 0x67, 0x67, 0x68, 0x68, 0x68,
    0x69, 0x69, 0x69, 0x6A, 0x6A, 0x6A, 0x6B, 0x6B, 0x6B, 0x6C, 0x6C, 0x6C, 0x6D, 0x6D, 0x6D, 0x6E,
    0x6E, 0x6E, 0x6F, 0x6F, 0x70, 0x70, 0x70, 0x71, 0x71, 0x71, 0x72, 0x72, 0x73, 0x73, 0x73, 0x74,
    0x74, 0x75, 0x75, 0x75, 0x76, 0x76, 0x77, 0x77, 0x77, 0x78, 0x78, 0x78, 0x79, 0x79, 0x7A, 0x7A,
    0x7B, 0x7B, 0x7B, 0x7C, 0x7C, 0x7D, 0x7D, 0x7E, 0x7E, 0x7E, 0x7F, 0x7F, 0x80, 0x80, 0x81, 0x81,
    0x82, 0x83, 0x83, 0x84, 0x84, 0x85, 0x85, 0x86, 0x86, 0x87, 0x88, 0x88, 0x89, 0x8A, 0x8A, 0x8B,
    0x8C, 0x8C, 0x8D, 0x8E, 0x8F, 0x8F, 0x90, 0x91, 0x92, 0x93, 0x93, 0x94, 0x95, 0x96, 0x97, 0x98,
    0x99, 0x9A, 0x9B, 0x9C, 0x9D, 0x9E, 0x9F, 0xA0, 0xA1, 0xA2, 0xA3, 0xA5, 0xA6, 0xA7, 0xA8, 0xAA,
    0xAB, 0xAC, 0xAE, 0xAF, 0xB1, 0xB2, 0xB4, 0xB5, 0xB7, 0xB9, 0xBA, 0xBC, 0xBE, 0xC0, 0xC2, 0xC4,
    0xC6, 0xC8, 0xCA, 0xCC, 0xCE, 0xD1, 0xD3, 0xD5, 0xD8, 0xDA, 0xDD, 0xE0, 0xE3, 0xE6, 0xE9, 0xEC,
    0xEF, 0xF2, 0xF5, 0xF9, 0xFC, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
];

/// MDCT 窗前半部分 (f32 位模式), 后半部分满足 `w[127 - i] = sqrt(1 - w[i]^2)`
const MDCT_WINDOW_FIRST_HALF: [u32; 64] = [
    0x3A3504F0, 0x3B0183B8, 0x3B70C538, 0x3BBB9268, 0x3C04A809, 0x3C308200, 0x3C61284C, 0x3C8B3F17,
    0x3CA83992, 0x3CC77FBD, 0x3CE91110, 0x3D0677CD, 0x3D198FC4, 0x3D2DD35C, 0x3D434643, 0x3D59ECC1,
    0x3D71CBA8, 0x3D85741E, 0x3D92A413, 0x3DA078B4, 0x3DAEF522, 0x3DBE1C9E, 0x3DCDF27B, 0x3DDE7A1D,
    0x3DEFB6ED, 0x3E00D62B, 0x3E0A2EDA, 0x3E13E72A, 0x3E1E00B1, 0x3E287CF2, 0x3E335D55, 0x3E3EA321,
    0x3E4A4F75, 0x3E56633F, 0x3E62DF37, 0x3E6FC3D1, 0x3E7D1138, 0x3E8563A2, 0x3E8C72B7, 0x3E93B561,
    0x3E9B2AEF, 0x3EA2D26F, 0x3EAAAAAB, 0x3EB2B222, 0x3EBAE706, 0x3EC34737, 0x3ECBD03D, 0x3ED47F46,
    0x3EDD5128, 0x3EE6425C, 0x3EEF4EFF, 0x3EF872D7, 0x3F00D4A9, 0x3F0576CA, 0x3F0A1D3B, 0x3F0EC548,
    0x3F136C25, 0x3F180EF2, 0x3F1CAAC2, 0x3F213CA2, 0x3F25C1A5, 0x3F2A36E7, 0x3F2E9998, 0x3F32E705,
];

/// 每个分辨率可表示的最大绝对值
pub const RESOLUTION_MAX_VALUES: [i32; 16] =
    [0, 1, 2, 3, 4, 5, 6, 7, 15, 31, 63, 127, 255, 511, 1023, 2047];

/// 每个分辨率的频谱码最大位数
pub const QUANTIZED_SPECTRUM_MAX_BITS: [u8; 16] =
    [0, 2, 3, 3, 4, 4, 4, 4, 5, 6, 7, 8, 9, 10, 11, 12];

/// 分辨率 0..8 的变长码长度, 以最大位数窥视到的码值为索引
pub const QUANTIZED_SPECTRUM_BITS: [[u8; 16]; 8] = [
    [0; 16],
    [1, 1, 2, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [2, 2, 2, 2, 2, 2, 3, 3, 0, 0, 0, 0, 0, 0, 0, 0],
    [2, 2, 3, 3, 3, 3, 3, 3, 0, 0, 0, 0, 0, 0, 0, 0],
    [3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 4],
    [3, 3, 3, 3, 3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4],
    [3, 3, 3, 3, 3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4],
    [3, 3, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4, 4],
];

/// 分辨率 0..8 的变长码对应的量化值
pub const QUANTIZED_SPECTRUM_VALUE: [[i8; 16]; 8] = [
    [0; 16],
    [0, 0, 1, -1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 1, 1, -1, -1, 2, -2, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 1, -1, 2, -2, 3, -3, 0, 0, 0, 0, 0, 0, 0, 0],
    [0, 0, 1, 1, -1, -1, 2, 2, -2, -2, 3, 3, -3, -3, 4, -4],
    [0, 0, 1, 1, -1, -1, 2, 2, -2, -2, 3, -3, 4, -4, 5, -5],
    [0, 0, 1, 1, -1, -1, 2, -2, 3, -3, 4, -4, 5, -5, 6, -6],
    [0, 0, 1, -1, 2, -2, 3, -3, 4, -4, 5, -5, 6, -6, 7, -7],
];

/// 噪声电平到分辨率的映射
pub const SCALE_TO_RESOLUTION_CURVE: [u8; 59] = [
    15, 14, 14, 14, 14, 14, 14, 13, 13, 13, 13, 13, 13, 12, 12, 12, 12, 12, 12, 11, 11, 11, 11, 11,
    11, 10, 10, 10, 10, 10, 10, 10, 9, 9, 9, 9, 9, 9, 8, 8, 8, 8, 8, 8, 7, 6, 6, 5, 4, 4, 4, 3, 3,
    3, 2, 2, 2, 2, 1,
];

static MDCT_WINDOW: OnceLock<[f64; 128]> = OnceLock::new();
static DEQUANTIZER_SCALING: OnceLock<[f64; 64]> = OnceLock::new();
static QUANTIZER_STEP_SIZE: OnceLock<[f64; 16]> = OnceLock::new();
static SCALE_CONVERSION: OnceLock<[f64; 128]> = OnceLock::new();
static INTENSITY_RATIO: OnceLock<[f64; 16]> = OnceLock::new();
static SPECTRUM_CODES: OnceLock<[[(u8, u8); 15]; 8]> = OnceLock::new();

/// 128 点 MDCT 窗
pub fn mdct_window() -> &'static [f64; 128] {
    MDCT_WINDOW.get_or_init(|| {
        let mut window = [0.0f64; 128];
        for (i, &bits) in MDCT_WINDOW_FIRST_HALF.iter().enumerate() {
            window[i] = f64::from(f32::from_bits(bits));
        }
        for i in 0..64 {
            let w = window[63 - i];
            window[64 + i] = (1.0 - w * w).sqrt();
        }
        window
    })
}

/// 比例因子反量化系数: `sqrt(128) * 2^((53/128) * (x - 63))`
pub fn dequantizer_scaling() -> &'static [f64; 64] {
    DEQUANTIZER_SCALING.get_or_init(|| {
        let mut table = [0.0f64; 64];
        for (x, v) in table.iter_mut().enumerate() {
            *v = 128f64.sqrt() * (53.0 / 128.0 * (x as f64 - 63.0)).exp2();
        }
        table
    })
}

/// 各分辨率的量化步长: `2 / (2 * max + 1)`, 分辨率 0 为 0
pub fn quantizer_step_size() -> &'static [f64; 16] {
    QUANTIZER_STEP_SIZE.get_or_init(|| {
        let mut table = [0.0f64; 16];
        for (x, v) in table.iter_mut().enumerate().skip(1) {
            *v = 2.0 / f64::from(RESOLUTION_MAX_VALUES[x] * 2 + 1);
        }
        table
    })
}

/// 高频重建缩放系数: `2^((53/128) * (x - 64))`, 两端为 0
pub fn scale_conversion() -> &'static [f64; 128] {
    SCALE_CONVERSION.get_or_init(|| {
        let mut table = [0.0f64; 128];
        for (x, v) in table.iter_mut().enumerate().take(127).skip(2) {
            *v = (53.0 / 128.0 * (x as f64 - 64.0)).exp2();
        }
        table
    })
}

/// 强度立体声比例: `(28 - 2x) / 14`, x > 14 时为 0
pub fn intensity_ratio() -> &'static [f64; 16] {
    INTENSITY_RATIO.get_or_init(|| {
        let mut table = [0.0f64; 16];
        for (x, v) in table.iter_mut().enumerate().take(15) {
            *v = (28.0 - 2.0 * x as f64) / 14.0;
        }
        table
    })
}

/// 分辨率 1..8 下量化值 `v` (-7..=7) 的最短编码 `(码字, 位数)`
///
/// 由解码表反推: 取第一个值为 `v` 的码, 去掉不参与编码的低位.
pub fn quantized_spectrum_code(resolution: usize, value: i32) -> Option<(u32, u32)> {
    let codes = SPECTRUM_CODES.get_or_init(|| {
        let mut codes = [[(0u8, 0u8); 15]; 8];
        for (res, row) in codes.iter_mut().enumerate().skip(1) {
            let max_bits = QUANTIZED_SPECTRUM_MAX_BITS[res];
            for code in (0..(1usize << max_bits)).rev() {
                let bits = QUANTIZED_SPECTRUM_BITS[res][code];
                let v = QUANTIZED_SPECTRUM_VALUE[res][code];
                row[(v + 7) as usize] = ((code >> (max_bits - bits)) as u8, bits);
            }
        }
        codes
    });
    if !(1..8).contains(&resolution) || value.abs() > RESOLUTION_MAX_VALUES[resolution] {
        return None;
    }
    let (code, bits) = codes[resolution][(value + 7) as usize];
    Some((u32::from(code), u32::from(bits)))
}
