pub mod aggregate;
pub mod error;
pub mod ids;
pub mod member;

pub use aggregate::{Link, Marker, Operation, Portal};
pub use error::CoreError;
pub use ids::*;
pub use member::MemberRef;
