//! Value objects shared by requests and resources.

pub mod address;
pub mod amount;
pub mod line;

pub use address::Address;
pub use amount::Amount;
pub use line::{Line, Lines};
