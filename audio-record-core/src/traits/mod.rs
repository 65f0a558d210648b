pub mod device;
pub mod observer;
