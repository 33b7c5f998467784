pub mod settings;

pub use settings::{
    Settings, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_PAYLOAD_LEN, DEFAULT_WRITE_BUFFER_CAPACITY,
    MAX_BLOCK_SIZE,
};
