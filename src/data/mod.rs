//! Membership data input.
//!
//! Membership files are delimited text with a header line, one id column,
//! an optional label column and numeric feature columns. See [`LoadCreon`].

mod creon;

pub use creon::{LoadCreon, MembershipData};
