//! Commit history traversal
//!
//! - `rev_walk`: ancestry walks with push/hide seed sets
//! - `divergence`: ahead/behind counting between two histories

pub mod divergence;
pub mod rev_walk;
