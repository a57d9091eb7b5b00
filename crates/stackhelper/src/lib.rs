// stackhelper - command line front end
//
// Two binaries share this library:
// - stackhelper: stack actions, publishing, exports and parameter rendering
// - app-exports: the exports reader on its own

pub mod cli;
pub mod commands;
mod init;

pub use init::{aws_sdk_config, init, init_tracing};
