pub mod mem;
pub mod banks;
pub mod mapper;
pub mod cart;

pub use cart::{Cart, CartError, CartHeader, Mirroring};
pub use mapper::Mapper;
