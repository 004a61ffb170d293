//! Start and deallocate Azure Virtual Desktop session hosts.
//!
//! The crate is a thin client over Azure Resource Manager:
//!
//! - [`credential`] resolves an ambient bearer token.
//! - [`arm`] lists host pools and session hosts and posts VM power actions.
//! - [`resource_id`] pulls the resource group and VM name out of a resource ID.
//! - [`lifecycle`] turns a session host's VM resource ID into a power request.
//! - [`pipeline`] wires it together for one configured host pool.

pub mod arm;
pub mod config;
pub mod credential;
pub mod lifecycle;
pub mod models;
pub mod pipeline;
pub mod resource_id;
