pub mod controller;
pub mod fanout;
