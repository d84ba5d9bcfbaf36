pub mod status;

pub use status::{ConnectionSource, UserStatus, DATE_FORMAT};
