pub mod contact;
pub mod emergency;
pub mod enums;

pub use contact::*;
pub use emergency::*;
pub use enums::*;
