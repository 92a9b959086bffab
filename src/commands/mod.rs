// ABOUTME: Command module aggregator for the kiln CLI.
// ABOUTME: Re-exports deploy, undeploy, status, launch and cleanup command handlers.

mod connect;
mod deploy;
mod task;
mod wait;

pub use deploy::{deploy, status, undeploy};
pub use task::{cleanup, launch};
