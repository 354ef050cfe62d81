//! Global constants

pub mod limits;
