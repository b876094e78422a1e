pub mod ext;
pub mod status_code;
pub mod transport;

pub use ext::*;
pub use status_code::*;
pub use transport::*;
