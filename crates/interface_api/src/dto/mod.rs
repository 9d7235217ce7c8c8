//! Request and response bodies

pub mod updates;
