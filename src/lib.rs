//! Aquila library installer.
//!
//! Performs a clean reinstall of a built Aquila distribution: any previous
//! installation is removed, the platform layout is prepared, and the `lib/`,
//! `src/` and `doc/` trees are copied into their targets with build
//! artifacts filtered out.
//!
//! The public API is organised in layers:
//!
//! - **[`platform`]** maps an OS identifier to a [`platform::PlatformLayout`]
//! - **[`filter`]** decides which entries are skipped while copying
//! - **[`fs`]** holds the removal and filtered copy primitives
//! - **[`installer`]** sequences remove, prepare and copy
//! - **[`commands`]** wires configuration and CLI flags to the installer
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod fs;
pub mod installer;
pub mod logging;
pub mod paths;
pub mod platform;
