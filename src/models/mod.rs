pub mod admin;
pub mod check_in;
pub mod user;

pub use admin::*;
pub use check_in::*;
pub use user::*;
