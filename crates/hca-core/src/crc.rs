//! CRC 校验和计算.
//!
//! HCA 头部和每个数据块的末尾 2 字节存放 CRC-16 (多项式 0x8005, 初始值 0,
//! 不反射, 大端存储). 区域连同其后的校验值一起计算时结果为 0.

use crate::{HcaError, HcaResult};

/// 计算 CRC-16
///
/// 逐位移位计算, 不使用查找表.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x8005
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// 读取存储在 `data[len..len + 2]` 的大端校验值
fn stored_crc(data: &[u8], len: usize) -> HcaResult<u16> {
    match data.get(len..len + 2) {
        Some(b) => Ok(u16::from_be_bytes([b[0], b[1]])),
        None => Err(HcaError::InvalidArgument(format!(
            "校验区域越界: 长度 {} + 2 > 缓冲区 {}",
            len,
            data.len(),
        ))),
    }
}

/// 校验 `data[..len]`, 校验值位于 `data[len..len + 2]`
pub fn verify_checksum(data: &[u8], len: usize) -> HcaResult<()> {
    let expected = stored_crc(data, len)?;
    let actual = crc16(&data[..len]);
    if expected != actual {
        return Err(HcaError::ChecksumMismatch {
            offset: 0,
            expected,
            actual,
        });
    }
    Ok(())
}

/// 计算 `data[..len]` 的校验值并写入 `data[len..len + 2]`, 返回写入的值
pub fn fix_checksum(data: &mut [u8], len: usize) -> HcaResult<u16> {
    stored_crc(data, len)?;
    let crc = crc16(&data[..len]);
    data[len..len + 2].copy_from_slice(&crc.to_be_bytes());
    Ok(crc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_empty_data() {
        assert_eq!(crc16(&[]), 0);
    }

    #[test]
    fn test_crc16_single_byte() {
        // 单字节 0x01 移位 8 次后恰好余下多项式本身
        assert_eq!(crc16(&[0x01]), 0x8005);
    }

    #[test]
    fn test_crc16_known_value() {
        // CRC-16/UMTS 标准检验值
        assert_eq!(crc16(b"123456789"), 0xFEE8);
    }

    /// 多项式长除法: 报文后补 16 个零位, 余式即校验值
    fn crc16_long_division(data: &[u8]) -> u16 {
        let mut bits: Vec<u8> = data
            .iter()
            .flat_map(|&b| (0..8).rev().map(move |i| (b >> i) & 1))
            .collect();
        bits.extend([0u8; 16]);
        let generator: Vec<u8> = (0..17).rev().map(|i| ((0x1_8005u32 >> i) & 1) as u8).collect();
        for i in 0..bits.len() - 16 {
            if bits[i] == 1 {
                for (j, g) in generator.iter().enumerate() {
                    bits[i + j] ^= g;
                }
            }
        }
        bits[bits.len() - 16..]
            .iter()
            .fold(0u16, |acc, &b| (acc << 1) | u16::from(b))
    }

    #[test]
    fn test_crc16_与长除法一致() {
        let mut state = 0x1234_5678u32;
        for len in [1usize, 2, 3, 7, 64, 255] {
            let data: Vec<u8> = (0..len)
                .map(|_| {
                    state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                    (state >> 16) as u8
                })
                .collect();
            assert_eq!(crc16(&data), crc16_long_division(&data), "len={len}");
        }
    }

    #[test]
    fn test_crc16_increment() {
        let crc1 = crc16(&[0x00, 0x00]);
        let crc2 = crc16(&[0x00, 0x01]);
        assert_ne!(crc1, crc2);
    }

    #[test]
    fn test_crc16_修复后整体为零() {
        let mut data = *b"HCA block\0\0";
        fix_checksum(&mut data, 9).unwrap();
        assert_eq!(crc16(&data), 0);
        verify_checksum(&data, 9).unwrap();
    }

    #[test]
    fn test_crc16_校验失败() {
        let mut data = [1u8, 2, 3, 4, 0, 0];
        fix_checksum(&mut data, 4).unwrap();
        data[1] ^= 0x40;
        let err = verify_checksum(&data, 4).unwrap_err();
        assert!(matches!(err, HcaError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_crc16_区域越界() {
        let mut data = [0u8; 3];
        assert!(fix_checksum(&mut data, 2).is_err());
        assert!(verify_checksum(&data, 2).is_err());
    }
}
