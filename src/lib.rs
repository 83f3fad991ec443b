#[macro_use]
extern crate nolog;

pub mod codec;
pub mod error;
pub mod node;
pub mod optics;
pub mod session;

pub use error::{CaptureError, DecodeError, LinkError};
