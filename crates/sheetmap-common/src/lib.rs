pub mod address;
pub mod error;
pub mod value;

pub use address::*;
pub use error::*;
pub use value::*;
