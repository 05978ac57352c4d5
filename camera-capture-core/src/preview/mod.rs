pub mod layout;
pub mod surface;
