//! Azure Resource Manager access: host pools, session hosts, VM power actions.

mod client;
mod pager;

pub use client::*;
pub use pager::Pager;
