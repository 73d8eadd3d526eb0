//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is the signal a reporter polls; an external
//! controller (or the reporter itself, on a fatal item failure) flips it.

mod token;

pub use token::CancellationToken;
