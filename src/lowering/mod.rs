//! Builders that lower structured control flow into terms and branches.
//!
//! These are the only constructs that create nested branches with special
//! evaluation rules: if-blocks, for and while loops, subroutines and declared
//! state. Everything else is plain [`create_term`](crate::Runtime::create_term).

pub mod if_block;
pub mod loops;
pub mod state;
pub mod subroutine;
