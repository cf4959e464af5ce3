pub mod error;
pub mod node;
pub mod result;
pub mod storage;

pub use error::*;
pub use node::*;
pub use result::*;
pub use storage::*;
