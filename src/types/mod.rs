pub mod data_type;
pub use data_type::*;

pub mod name_and_type;
pub use name_and_type::*;

pub mod literal;
pub use literal::*;
