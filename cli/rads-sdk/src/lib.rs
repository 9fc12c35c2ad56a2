//! Filter composition, search scheduling, publishing and login for the
//! RADS package registry, built on top of [rads_catalog].

pub mod models;
pub mod providers;
pub mod session;
