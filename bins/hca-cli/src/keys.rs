//! 密钥参数解析.

use clap::Args;
use hca_codec::{CipherConfig, CipherKey};

/// 选择置换表的参数
#[derive(Args, Debug, Clone, Default)]
pub struct KeyArgs {
    /// 密钥 1 (十进制, 或以 0x 开头的十六进制)
    #[arg(long, value_parser = parse_key)]
    pub key: Option<CipherKey>,

    /// 密钥 2, 缺省为 0
    #[arg(long, value_parser = parse_key, requires = "key")]
    pub key2: Option<CipherKey>,

    /// 64 位密钥, 低 32 位为密钥 1, 高 32 位为密钥 2
    #[arg(long, value_parser = parse_key64, conflicts_with = "key")]
    pub key64: Option<u64>,

    /// 使用无密钥置换表 (类型 1)
    #[arg(long, conflicts_with_all = ["key", "key64", "default_key"])]
    pub no_key: bool,

    /// 使用内置默认密钥 (类型 0x38)
    #[arg(long, conflicts_with_all = ["key", "key64"])]
    pub default_key: bool,
}

impl KeyArgs {
    /// 未指定任何密钥时返回 `None`
    pub fn config(&self) -> Option<CipherConfig> {
        if self.no_key {
            Some(CipherConfig::NoKey)
        } else if self.default_key {
            Some(CipherConfig::DefaultKeys)
        } else if let Some(key) = self.key64 {
            Some(CipherConfig::from_u64(key))
        } else {
            self.key.clone().map(|key1| CipherConfig::Keys {
                key1,
                key2: self.key2.clone(),
            })
        }
    }

    pub fn config_or_default(&self) -> CipherConfig {
        self.config().unwrap_or(CipherConfig::DefaultKeys)
    }
}

/// 十六进制留给 `CipherKey::resolve` 校验
fn parse_key(s: &str) -> Result<CipherKey, String> {
    let s = s.trim();
    if s.starts_with("0x") || s.starts_with("0X") {
        return Ok(CipherKey::HexString(s.to_string()));
    }
    s.parse::<u32>()
        .map(CipherKey::Number)
        .map_err(|e| format!("无效密钥 {s:?}: {e}"))
}

fn parse_key64(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse::<u64>(),
    };
    parsed.map_err(|e| format!("无效 64 位密钥 {s:?}: {e}"))
}
