pub mod buffer;
pub mod cli;
pub mod error;
pub mod protocol;
pub mod records;
pub mod session;
pub mod wddx;

pub use error::{Error, Result, Status};
pub use session::{Connection, FetchFlags, LastError};
pub use wddx::{Packet, Value};
