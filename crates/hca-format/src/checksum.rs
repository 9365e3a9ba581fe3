//! 校验和修复.

use hca_codec::{HcaInfo, fix_header_checksum};
use hca_core::{HcaError, HcaResult, crc};
use log::debug;

/// 重新计算头部与所有数据块的 CRC-16, 返回头部
pub fn fix_checksum(data: &mut [u8]) -> HcaResult<HcaInfo> {
    fix_header_checksum(data)?;
    let info = HcaInfo::parse(data)?;
    if data.len() < info.full_size {
        return Err(HcaError::InvalidFormat(format!(
            "文件被截断: 需要 {} 字节, 实际 {} 字节",
            info.full_size,
            data.len(),
        )));
    }
    for i in 0..info.format.block_count as usize {
        let block = &mut data[info.block_range(i)];
        crc::fix_checksum(block, info.block_size - 2)?;
    }
    debug!("已修复头部与 {} 个数据块的校验和", info.format.block_count);
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hca_codec::HeaderBuilder;

    #[test]
    fn test_修复校验和() {
        let mut data = HeaderBuilder::new(1, 44100)
            .block_size(32)
            .block_count(2)
            .build()
            .unwrap();
        data.extend((0..64u8).collect::<Vec<_>>());
        let offset = data.len() - 64;
        // 损坏头部校验
        data[offset - 1] ^= 0xFF;
        assert!(HcaInfo::parse(&data).is_err());

        let info = fix_checksum(&mut data).unwrap();
        assert_eq!(info.format.block_count, 2);
        assert_eq!(crc::crc16(&data[..offset]), 0);
        assert_eq!(crc::crc16(&data[offset..offset + 32]), 0);
        assert_eq!(crc::crc16(&data[offset + 32..]), 0);

        // 再次修复不改变内容
        let snapshot = data.clone();
        fix_checksum(&mut data).unwrap();
        assert_eq!(data, snapshot);
    }

    #[test]
    fn test_截断文件() {
        let mut data = HeaderBuilder::new(1, 44100).block_size(32).build().unwrap();
        data.extend_from_slice(&[0; 10]);
        assert!(matches!(fix_checksum(&mut data), Err(HcaError::InvalidFormat(_))));
    }
}
