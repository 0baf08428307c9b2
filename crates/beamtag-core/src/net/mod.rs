pub mod dispatch;
pub mod messages;
pub mod protocol;
