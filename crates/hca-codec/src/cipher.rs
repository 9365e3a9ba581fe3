//! HCA 字节置换加密.
//!
//! 每个数据块 (除末尾 2 字节校验) 逐字节经过 256 项置换表映射.
//! 置换表有三种来源:
//! - 类型 1: 无密钥, 固定的线性同余序列
//! - 类型 0x38: 由两个 32 位密钥派生
//! - 类型 0: 不加密
//!
//! 解密表与加密表互为逆置换, 0 和 0xFF 在所有模式下映射到自身.

use hca_core::{HcaError, HcaResult};
use log::debug;

/// 不加密
pub const CIPHER_NONE: u16 = 0;
/// 无密钥加密
pub const CIPHER_NO_KEY: u16 = 0x01;
/// 密钥加密
pub const CIPHER_KEYED: u16 = 0x38;

/// 默认密钥 1
pub const DEFAULT_KEY1: u32 = 0x0139_5C51;
/// 默认密钥 2
pub const DEFAULT_KEY2: u32 = 0x0000_0000;

/// 密钥的输入形式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherKey {
    /// 数值
    Number(u32),
    /// 十六进制字符串, 可带 `0x` 前缀
    HexString(String),
    /// 4 字节小端序
    RawBytes([u8; 4]),
}

impl CipherKey {
    /// 解析为 32 位密钥值
    pub fn resolve(&self) -> HcaResult<u32> {
        match self {
            Self::Number(v) => Ok(*v),
            Self::RawBytes(b) => Ok(u32::from_le_bytes(*b)),
            Self::HexString(s) => {
                let trimmed = s.trim();
                let digits = trimmed
                    .strip_prefix("0x")
                    .or_else(|| trimmed.strip_prefix("0X"))
                    .unwrap_or(trimmed);
                if digits.is_empty() {
                    return Err(HcaError::UnparsableKey(format!("空的十六进制字符串: {s:?}")));
                }
                u32::from_str_radix(digits, 16)
                    .map_err(|e| HcaError::UnparsableKey(format!("{s:?}: {e}")))
            }
        }
    }
}

impl From<u32> for CipherKey {
    fn from(value: u32) -> Self {
        Self::Number(value)
    }
}

impl From<[u8; 4]> for CipherKey {
    fn from(value: [u8; 4]) -> Self {
        Self::RawBytes(value)
    }
}

impl From<&str> for CipherKey {
    fn from(value: &str) -> Self {
        Self::HexString(value.to_string())
    }
}

/// 置换表的构造方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherConfig {
    /// 无密钥 (类型 1)
    NoKey,
    /// 默认密钥对 (类型 0x38)
    DefaultKeys,
    /// 指定密钥 (类型 0x38), 缺省的密钥 2 视为 0
    Keys {
        /// 密钥 1
        key1: CipherKey,
        /// 密钥 2
        key2: Option<CipherKey>,
    },
}

impl CipherConfig {
    /// 由 64 位密钥构造: 低 32 位为密钥 1, 高 32 位为密钥 2
    pub fn from_u64(key: u64) -> Self {
        Self::Keys {
            key1: CipherKey::Number(key as u32),
            key2: Some(CipherKey::Number((key >> 32) as u32)),
        }
    }
}

/// 置换加密器
#[derive(Clone)]
pub struct Cipher {
    table: [u8; 256],
    cipher_type: u16,
    encrypt: bool,
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher")
            .field("cipher_type", &self.cipher_type)
            .field("encrypt", &self.encrypt)
            .finish()
    }
}

impl Cipher {
    /// 无密钥解密表 (类型 1)
    pub fn no_key() -> Self {
        let mut table = [0u8; 256];
        let mut v: u8 = 0;
        for entry in table.iter_mut().take(0xFF).skip(1) {
            v = v.wrapping_mul(13).wrapping_add(11);
            if v == 0 || v == 0xFF {
                v = v.wrapping_mul(13).wrapping_add(11);
            }
            *entry = v;
        }
        table[0] = 0;
        table[0xFF] = 0xFF;
        Self {
            table,
            cipher_type: CIPHER_NO_KEY,
            encrypt: false,
        }
    }

    /// 由两个密钥派生解密表 (类型 0x38)
    pub fn with_keys(key1: u32, key2: u32) -> Self {
        let (mut key1, mut key2) = (key1, key2);
        if key1 == 0 {
            key2 = key2.wrapping_sub(1);
        }
        key1 = key1.wrapping_sub(1);

        let mut t1 = [0u8; 8];
        t1[..4].copy_from_slice(&key1.to_le_bytes());
        t1[4..].copy_from_slice(&key2.to_le_bytes());

        let t2 = [
            t1[1],
            t1[1] ^ t1[6],
            t1[2] ^ t1[3],
            t1[2],
            t1[2] ^ t1[1],
            t1[3] ^ t1[4],
            t1[3],
            t1[3] ^ t1[2],
            t1[4] ^ t1[5],
            t1[4],
            t1[4] ^ t1[3],
            t1[5] ^ t1[6],
            t1[5],
            t1[5] ^ t1[4],
            t1[6] ^ t1[1],
            t1[6],
        ];

        // 高半字节来自 t1[0], 低半字节来自 t2 各项
        let t31 = nibble_sequence(t1[0]);
        let mut t3 = [0u8; 256];
        for (i, &seed) in t2.iter().enumerate() {
            let t32 = nibble_sequence(seed);
            let high = t31[i] << 4;
            for (j, &low) in t32.iter().enumerate() {
                t3[i * 16 + j] = high | low;
            }
        }

        let mut table = [0u8; 256];
        let mut v: u8 = 0;
        let mut t = 1;
        for _ in 0..256 {
            v = v.wrapping_add(0x11);
            let a = t3[v as usize];
            if a != 0 && a != 0xFF && t < 0xFF {
                table[t] = a;
                t += 1;
            }
        }
        table[0] = 0;
        table[0xFF] = 0xFF;

        Self {
            table,
            cipher_type: CIPHER_KEYED,
            encrypt: false,
        }
    }

    /// 默认密钥对的解密表
    pub fn default_keys() -> Self {
        Self::with_keys(DEFAULT_KEY1, DEFAULT_KEY2)
    }

    /// 按配置构造解密表
    pub fn from_config(config: &CipherConfig) -> HcaResult<Self> {
        let cipher = match config {
            CipherConfig::NoKey => Self::no_key(),
            CipherConfig::DefaultKeys => Self::default_keys(),
            CipherConfig::Keys { key1, key2 } => {
                let key1 = key1.resolve()?;
                let key2 = match key2 {
                    Some(k) => k.resolve()?,
                    None => 0,
                };
                debug!("HCA 密钥: key1=0x{key1:08X}, key2=0x{key2:08X}");
                Self::with_keys(key1, key2)
            }
        };
        Ok(cipher)
    }

    /// 交换置换表的定义域与值域, 在加密与解密方向之间切换
    pub fn invert_table(mut self) -> HcaResult<Self> {
        let old = self.table;
        let mut seen = [0u16; 16];
        for (i, &value) in old.iter().enumerate() {
            let high = (value >> 4) as usize;
            let flag = 1u16 << (value & 0x0F);
            if seen[high] & flag != 0 {
                return Err(HcaError::NonBijectiveTable { value });
            }
            seen[high] |= flag;
            self.table[value as usize] = i as u8;
        }
        self.encrypt = !self.encrypt;
        Ok(self)
    }

    /// 加密类型 (1 或 0x38)
    pub fn cipher_type(&self) -> u16 {
        self.cipher_type
    }

    /// 当前是否为加密方向
    pub fn is_encrypt(&self) -> bool {
        self.encrypt
    }

    /// 置换表
    pub fn table(&self) -> &[u8; 256] {
        &self.table
    }

    /// 原地置换
    pub fn mask(&self, data: &mut [u8]) {
        for b in data.iter_mut() {
            *b = self.table[*b as usize];
        }
    }
}

/// 由种子的低半字节决定乘数与增量, 高半字节为初值, 生成 16 项半字节序列
fn nibble_sequence(seed: u8) -> [u8; 16] {
    let mul = ((seed & 1) << 3) | 5;
    let add = (seed & 0x0E) | 1;
    let mut key = seed >> 4;
    let mut out = [0u8; 16];
    for v in out.iter_mut() {
        key = (key.wrapping_mul(mul).wrapping_add(add)) & 0x0F;
        *v = key;
    }
    out
}

/// 快速判断头部签名是否带有掩码位
///
/// 只检查魔数前三个字节的最高位, 不解析头部.
pub fn is_header_masked(data: &[u8]) -> bool {
    data.iter().take(3).any(|&b| b & 0x80 != 0)
}
