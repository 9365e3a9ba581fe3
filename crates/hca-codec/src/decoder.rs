//! 解码器 trait 定义.

use hca_core::HcaResult;

use crate::audio_frame::AudioFrame;
use crate::packet::Packet;

/// 解码器 trait
///
/// 解码流程:
/// 1. 调用 `send_packet()` 送入压缩数据
/// 2. 调用 `receive_frame()` 取出解码后的帧
/// 3. 重复以上步骤直到所有数据处理完毕
/// 4. 送入空包 (flush) 后 `receive_frame()` 返回 `Eof`
pub trait Decoder: Send {
    /// 获取解码器名称
    fn name(&self) -> &str;

    /// 送入一个压缩数据包进行解码
    ///
    /// # 返回
    /// - `Ok(())`: 数据包已接受
    /// - `Err(HcaError::NeedMoreData)`: 上一帧尚未取出
    fn send_packet(&mut self, packet: &Packet) -> HcaResult<()>;

    /// 从解码器取出一帧解码数据
    ///
    /// # 返回
    /// - `Ok(frame)`: 成功取出一帧
    /// - `Err(HcaError::NeedMoreData)`: 需要送入更多数据包
    /// - `Err(HcaError::Eof)`: 所有帧已取出
    fn receive_frame(&mut self) -> HcaResult<AudioFrame>;

    /// 刷新解码器, 清空内部状态
    ///
    /// 用于 seek 后重置解码器状态.
    fn flush(&mut self);
}
