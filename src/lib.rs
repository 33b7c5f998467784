/// Record codec: tags, varints, writer, reader, compression.
pub mod codec;
/// Codec settings loading.
pub mod config;
/// Logging setup for binaries (the library itself only emits events).
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// Error types shared by the whole codec.
pub use cereal_error::{CerealResult, CodecError, StackError, StatusCode};
/// Encoder/decoder and their sinks/sources.
pub use codec::{ByteSeeker, DataType, HashWriter, Reader, Records, Value, WriteInfo, Writer};
/// config
pub use config::Settings;
