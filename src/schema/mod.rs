pub mod message;
pub mod story;
pub mod structured;
