//! Validator keys: manifests, trusted lists and the sites that publish them.

mod list;
mod manifest;
mod site;

pub use list::{ListBlob, ListDisposition, ListedValidator, PublishedList, ValidatorList, LIST_VERSION};
pub use manifest::{Manifest, ManifestCache, ManifestDisposition};
pub use site::ValidatorSite;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ValidatorListError {
    #[error("Invalid validator key '{0}'")]
    InvalidKey(String),
    #[error("Invalid uri '{0}'")]
    InvalidUri(String),
    #[error("Unsupported uri scheme '{0}'")]
    UnsupportedScheme(String),
    #[error(transparent)]
    Bincode(#[from] bincode::Error),
    #[error(transparent)]
    Base64(#[from] base64::DecodeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Fetch(#[from] reqwest::Error),
}
