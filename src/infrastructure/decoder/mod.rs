//! 媒体解码实现

mod media_decoder;

pub use media_decoder::{Base64MediaDecoder, OutputFormat};
