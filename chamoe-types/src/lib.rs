pub mod models;
pub mod enums;
pub mod limits;

pub use models::*;
pub use enums::*;
pub use limits::*;
