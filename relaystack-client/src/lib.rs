//! Client side of RelayStack
//!
//! Runs shell commands inside a deployed function through the shell
//! handler and replays their output locally, and waits for infrastructure
//! updates to settle with exponential backoff.

pub mod deploy;
pub mod invoker;
pub mod remote;

pub use deploy::{
    backoff_delay, ensure_settled, wait_for_update, wait_until_settled, CloudFormationStatus,
    DeployError, StackStatusSource, ACCEPTED_STATUSES, PENDING_STATUS,
};
pub use invoker::{FunctionInvoker, InvokeResponse, LambdaInvoker};
pub use remote::{replay, RemoteError, RemoteShell};
