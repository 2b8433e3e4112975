pub mod generate;
pub mod optimize;
pub mod pool;
pub mod verify;
