//! Route tables, one per API area

pub mod codes;
pub mod rid;
pub mod valuesets;
