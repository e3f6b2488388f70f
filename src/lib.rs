pub mod namer;
pub mod engine;
pub mod container;
pub mod layout;
pub mod config;
pub mod error;
pub mod pipeline;

pub use namer::{name, stem_of, extension_of, HashedName, SALT};
pub use engine::{compress, decompress, checksum, DecompressPolicy, EngineError};
pub use container::{Container, FormatError};
pub use layout::{ContainerResolver, Layout};
pub use config::PackerConfig;
pub use error::{ErrorKind, PackError};
pub use pipeline::{Packer, CompressReport, DecompressReport, ContainerInfo};
