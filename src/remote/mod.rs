/// Remote Workflow API
///
/// Client for the external workflow-execution service that is the source of
/// truth for which workflows exist:
/// - Bearer token cache with an expiry safety margin
/// - reqwest client for authenticate, list and trigger calls

pub mod client;
pub mod token;

pub use client::{RemoteWorkflowClient, UniversalLoaderClient};
pub use token::TokenCache;
