pub mod decoder;
pub mod dynamics;
pub mod observer;
pub mod store;
