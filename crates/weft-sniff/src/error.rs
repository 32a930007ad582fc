use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SniffError {
    #[error("not a class file (bad magic)")]
    BadMagic,

    #[error("class file truncated at offset {0}")]
    Truncated(usize),

    #[error("unknown constant pool tag {0}")]
    UnknownConstantTag(u8),

    #[error("constant pool index {0} is not a UTF-8 entry")]
    BadUtf8Index(u16),

    #[error("constant pool entry {0} is not valid UTF-8 text")]
    MalformedUtf8(u16),

    #[error("unknown opcode 0x{0:02x} in method body")]
    UnknownOpcode(u8),

    #[error("failed to open archive {path}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, SniffError>;
