pub mod cart;
pub mod system;
