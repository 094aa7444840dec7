//! Record types and file formats for each pipeline phase

pub mod detailed;
pub mod promising;
pub mod quick;

pub use detailed::*;
pub use quick::*;
