//! 文件级加密与解密.
//!
//! 逐块校验 CRC-16, 原地置换块数据 (末尾 2 字节校验除外) 并修复校验,
//! 最后改写 `ciph` 段并按新状态重新设置签名掩码.

use hca_codec::cipher::{CIPHER_KEYED, CIPHER_NO_KEY, CIPHER_NONE};
use hca_codec::{Cipher, CipherConfig, HcaInfo};
use hca_core::{HcaError, HcaResult, crc};
use log::{debug, info};

/// 原地解密整个 HCA 文件, 返回新的头部
///
/// 没有 `ciph` 段或加密类型为 0 时不做修改. 类型 1 忽略 `config`, 始终使用无密钥表.
pub fn decrypt(data: &mut [u8], config: &CipherConfig) -> HcaResult<HcaInfo> {
    let info = HcaInfo::parse(data)?;
    if !info.has_section("ciph") {
        debug!("没有 ciph 段, 视为未加密");
        return Ok(info);
    }
    let cipher = match info.cipher {
        CIPHER_NONE => return Ok(info),
        CIPHER_NO_KEY => Cipher::no_key(),
        CIPHER_KEYED => Cipher::from_config(config)?,
        other => return Err(HcaError::UnsupportedCipher(other)),
    };
    apply(data, &info, &cipher, false)
}

/// 原地加密整个 HCA 文件, 返回新的头部
///
/// 文件必须带 `ciph` 段且类型为 0; 没有 `ciph` 段时先调用
/// [`HcaInfo::add_cipher_section`].
pub fn encrypt(data: &mut [u8], config: &CipherConfig) -> HcaResult<HcaInfo> {
    let info = HcaInfo::parse(data)?;
    if !info.has_section("ciph") {
        return Err(HcaError::CipherStateConflict(
            "缺少 ciph 段, 请先添加 ciph 段再加密".into(),
        ));
    }
    let cipher = match info.cipher {
        CIPHER_NONE => Cipher::from_config(config)?.invert_table()?,
        CIPHER_NO_KEY => {
            return Err(HcaError::CipherStateConflict(
                "文件已使用无密钥方式加密, 请先解密".into(),
            ));
        }
        CIPHER_KEYED => {
            return Err(HcaError::CipherStateConflict(
                "文件已使用密钥加密, 请先用正确的密钥解密".into(),
            ));
        }
        other => return Err(HcaError::UnsupportedCipher(other)),
    };
    apply(data, &info, &cipher, true)
}

fn apply(data: &mut [u8], info: &HcaInfo, cipher: &Cipher, encrypt: bool) -> HcaResult<HcaInfo> {
    let block_size = info.block_size;
    if data.len() < info.full_size {
        return Err(HcaError::InvalidFormat(format!(
            "文件被截断: 需要 {} 字节, 实际 {} 字节",
            info.full_size,
            data.len(),
        )));
    }

    for i in 0..info.format.block_count as usize {
        let range = info.block_range(i);
        let offset = range.start;
        let block = &mut data[range];
        crc::verify_checksum(block, block_size - 2).map_err(|e| with_offset(e, offset))?;
        cipher.mask(&mut block[..block_size - 2]);
        crc::fix_checksum(block, block_size - 2)?;
    }

    let new_type = if encrypt { cipher.cipher_type() } else { CIPHER_NONE };
    let new_info = HcaInfo::modify(data, "ciph", &new_type.to_be_bytes())?;
    info!(
        "{} {} 个数据块, 加密类型 0x{:X} -> 0x{:X}",
        if encrypt { "加密" } else { "解密" },
        info.format.block_count,
        info.cipher,
        new_type,
    );
    Ok(new_info)
}

/// 为块校验错误补上块在文件中的偏移
pub(crate) fn with_offset(err: HcaError, offset: usize) -> HcaError {
    match err {
        HcaError::ChecksumMismatch {
            expected, actual, ..
        } => HcaError::ChecksumMismatch {
            offset,
            expected,
            actual,
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hca_codec::HeaderBuilder;

    /// 头部 + 若干个内容递增且校验正确的块
    fn make_file(cipher: Option<u16>, blocks: u32) -> Vec<u8> {
        let mut builder = HeaderBuilder::new(1, 44100).block_size(64).block_count(blocks);
        if let Some(c) = cipher {
            builder = builder.cipher(c);
        }
        let mut data = builder.build().unwrap();
        for b in 0..blocks {
            let mut block: Vec<u8> = (0..64u32).map(|i| (i * 7 + b) as u8).collect();
            crc::fix_checksum(&mut block, 62).unwrap();
            data.extend_from_slice(&block);
        }
        data
    }

    #[test]
    fn test_无密钥解密() {
        let mut data = make_file(Some(1), 2);
        let original = data.clone();
        let info = decrypt(&mut data, &CipherConfig::DefaultKeys).unwrap();
        assert_eq!(info.cipher, 0);
        assert!(!hca_codec::is_header_masked(&data));

        let offset = info.data_offset;
        let table = Cipher::no_key();
        let mut expected = original[offset..offset + 62].to_vec();
        table.mask(&mut expected);
        assert_eq!(&data[offset..offset + 62], &expected[..]);
        assert_eq!(crc::crc16(&data[offset..offset + 64]), 0);
    }

    #[test]
    fn test_加密解密往返() {
        let plain = make_file(Some(0), 3);
        let mut data = plain.clone();
        let config = CipherConfig::from_u64(0x0030_D9E8_0000_0000);

        let info = encrypt(&mut data, &config).unwrap();
        assert_eq!(info.cipher, 0x38);
        assert!(hca_codec::is_header_masked(&data));
        assert_ne!(data[info.data_offset..], plain[info.data_offset..]);

        let info = decrypt(&mut data, &config).unwrap();
        assert_eq!(info.cipher, 0);
        assert_eq!(data, plain);
    }

    #[test]
    fn test_未加密文件原样返回() {
        let plain = make_file(None, 1);
        let mut data = plain.clone();
        decrypt(&mut data, &CipherConfig::NoKey).unwrap();
        assert_eq!(data, plain);

        let plain = make_file(Some(0), 1);
        let mut data = plain.clone();
        decrypt(&mut data, &CipherConfig::NoKey).unwrap();
        assert_eq!(data, plain);
    }

    #[test]
    fn test_加密状态冲突() {
        let mut data = make_file(None, 1);
        assert!(matches!(
            encrypt(&mut data, &CipherConfig::NoKey),
            Err(HcaError::CipherStateConflict(_))
        ));
        let mut data = make_file(Some(1), 1);
        assert!(matches!(
            encrypt(&mut data, &CipherConfig::NoKey),
            Err(HcaError::CipherStateConflict(_))
        ));
        let mut data = make_file(Some(0x38), 1);
        assert!(matches!(
            encrypt(&mut data, &CipherConfig::DefaultKeys),
            Err(HcaError::CipherStateConflict(_))
        ));
    }

    #[test]
    fn test_未知加密类型() {
        let mut data = make_file(Some(2), 1);
        assert!(matches!(
            decrypt(&mut data, &CipherConfig::NoKey),
            Err(HcaError::UnsupportedCipher(2))
        ));
    }

    #[test]
    fn test_块校验失败报告偏移() {
        let mut data = make_file(Some(1), 2);
        let info = HcaInfo::parse(&data).unwrap();
        let second = info.block_range(1).start;
        data[second + 3] ^= 0xFF;
        let err = decrypt(&mut data, &CipherConfig::NoKey).unwrap_err();
        assert!(matches!(err, HcaError::ChecksumMismatch { offset, .. } if offset == second));
    }

    #[test]
    fn test_截断文件() {
        let mut data = make_file(Some(1), 2);
        data.truncate(data.len() - 10);
        assert!(matches!(
            decrypt(&mut data, &CipherConfig::NoKey),
            Err(HcaError::InvalidFormat(_))
        ));
    }
}
