//! Forge integration.
//!
//! Collaborator traits consumed by the release engine and their GitHub
//! implementations.

mod github;
mod notify;
mod operations;

pub use github::{GitHubClient, GitHubConfig, upload_endpoint};
pub use notify::{LogNotifier, NotifySink, WebhookNotifier};
pub use operations::{
    AssetRegistry, AssetSource, CommitRange, CommitRecord, CreatedRelease, HistoryProvider,
    Notification, Notifier, ReleaseRegistry, ReleaseRequest, UploadedAsset, VariableStore,
};
