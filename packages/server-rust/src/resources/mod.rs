//! Resource data models hosted by the front end.

pub mod generic;

pub use generic::GenericResource;
