//! 统一错误类型定义.
//!
//! 所有 HCA crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// HCA 库统一错误类型
#[derive(Debug, Error)]
pub enum HcaError {
    /// 不是 HCA 文件, 或头部结构损坏
    #[error("无效格式: {0}")]
    InvalidFormat(String),

    /// 头部出现未知段签名
    #[error("未知头部段: {0}")]
    UnknownHeaderSection(String),

    /// CRC-16 校验失败
    #[error("校验和不匹配: 偏移 {offset}, 期望 0x{expected:04X}, 实际 0x{actual:04X}")]
    ChecksumMismatch {
        /// 校验区域起始偏移
        offset: usize,
        /// 存储的校验值
        expected: u16,
        /// 计算得到的校验值
        actual: u16,
    },

    /// 不支持的加密类型
    #[error("不支持的加密类型: 0x{0:X}")]
    UnsupportedCipher(u16),

    /// 加密状态冲突 (重复加密或解密未加密数据)
    #[error("加密状态冲突: {0}")]
    CipherStateConflict(String),

    /// 置换表不是双射
    #[error("置换表不是双射: 值 0x{value:02X} 重复出现")]
    NonBijectiveTable {
        /// 重复出现的值
        value: u8,
    },

    /// 无法解析的密钥
    #[error("无法解析密钥: {0}")]
    UnparsableKey(String),

    /// 帧同步字错误
    #[error("无效帧头: 同步字 0x{0:04X}")]
    InvalidFrameHeader(u32),

    /// 比例因子差分解码越界
    #[error("比例因子差分越界: 索引 {index}, 值 {value}")]
    InvalidDelta {
        /// 比例因子索引
        index: usize,
        /// 越界的重建值
        value: i32,
    },

    /// 帧解包后剩余位数不合理
    #[error("帧解包失败: 剩余 {remaining_bits} 位")]
    UnpackingFailed {
        /// 解包结束时的剩余位数 (可能为负)
        remaining_bits: i64,
    },

    /// 写入的段内容超过段容量
    #[error("段过大: {signature} 容量 {capacity} 字节, 请求 {requested} 字节")]
    SectionTooLarge {
        /// 段签名
        signature: String,
        /// 段可写入的字节数
        capacity: usize,
        /// 请求写入的字节数
        requested: usize,
    },

    /// 头部派生字段不满足约束
    #[error("头部约束不满足: {0}")]
    HeaderInvariantViolation(String),

    /// 位写入超出缓冲区
    #[error("缓冲区已满: 请求 {requested} 位, 剩余 {remaining} 位")]
    BufferExhausted {
        /// 请求写入的位数
        requested: usize,
        /// 剩余可写的位数
        remaining: usize,
    },

    /// 帧数据损坏 (表索引越界等)
    #[error("帧数据损坏: {0}")]
    CorruptFrame(String),

    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 数据不足, 需要更多输入
    #[error("数据不足, 需要更多输入")]
    NeedMoreData,

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl HcaError {
    /// 是否为密钥错误的典型症状
    ///
    /// 用错误密钥解密后, 块校验通常仍然通过 (校验在掩码之后修复),
    /// 但帧解包会失败; 未经修复的块则表现为校验失败.
    pub fn is_key_mismatch_symptom(&self) -> bool {
        matches!(
            self,
            HcaError::ChecksumMismatch { .. }
                | HcaError::UnpackingFailed { .. }
                | HcaError::InvalidDelta { .. }
                | HcaError::InvalidFrameHeader(_)
        )
    }
}

/// HCA 库统一 Result 类型
pub type HcaResult<T> = Result<T, HcaError>;
