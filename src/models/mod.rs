pub mod alert;
pub mod user;

pub use alert::{Alert, Condition, FirePatch, Frequency};
pub use user::User;
