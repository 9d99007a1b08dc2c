mod client;
pub mod links;
mod provider;
mod types;

pub use provider::JenkinsProvider;
