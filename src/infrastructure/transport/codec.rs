/// 帧编解码配置
///
/// 驱动连接和集群总线使用相同的分帧方式：4字节大端长度前缀 + JSON 负载

use tokio_util::codec::LengthDelimitedCodec;

/// 单帧上限 1MB
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// 创建长度前缀编解码器
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}
