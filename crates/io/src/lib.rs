//! Binary codec used by the legacy Neo virtual machine.
//!
//! Every multi-byte value is encoded little-endian regardless of the host byte
//! order, so that the byte stream produced on one node decodes to the same
//! values on every other node.

mod binary_writer;
mod error;
mod memory_reader;
pub mod serializable;

pub use binary_writer::BinaryWriter;
pub use error::{IoError, IoResult};
pub use memory_reader::MemoryReader;
pub use serializable::{helper, Serializable, SerializableExt};
