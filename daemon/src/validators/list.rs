use base64::{engine::general_purpose::STANDARD, Engine};
use indexmap::{IndexMap, IndexSet};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use trackable_common::{
    crypto::{decode_token, KeyPair, PublicKey, TokenType},
    time::NetTime,
};

use super::{
    manifest::{Manifest, ManifestCache, ManifestDisposition},
    ValidatorListError,
};
use crate::time_keeper::TimeKeeper;

/// Only list format understood.
pub const LIST_VERSION: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListDisposition {
    Accepted,
    /// Sequence not newer than the list already held.
    Stale,
    /// Publisher key not configured.
    Untrusted,
    /// Bad manifest, signature or blob.
    Invalid,
    UnsupportedVersion,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListedValidator {
    pub validation_public_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manifest: Option<String>,
}

/// Signed content of a published list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBlob {
    pub sequence: u32,
    pub expiration: u32,
    pub validators: Vec<ListedValidator>,
}

/// A list as served by a publisher site.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedList {
    pub manifest: String,
    pub blob: String,
    pub signature: String,
    pub version: u32,
}

impl PublishedList {
    /// Encode and sign `blob` with the publisher's current signing key.
    pub fn sign(
        manifest: &Manifest,
        signing: &KeyPair,
        blob: &ListBlob,
        version: u32,
    ) -> Result<Self, ValidatorListError> {
        let blob = STANDARD.encode(serde_json::to_vec(blob)?);
        Ok(Self {
            manifest: manifest.to_base64()?,
            signature: hex::encode_upper(signing.sign(blob.as_bytes())),
            blob,
            version,
        })
    }
}

struct PublisherList {
    sequence: u32,
    expiration: NetTime,
    keys: Vec<PublicKey>,
}

/// Trusted validator keys, from the local configuration and from lists
/// signed by configured publishers.
pub struct ValidatorList {
    manifests: Arc<ManifestCache>,
    time_keeper: Arc<dyn TimeKeeper>,
    local_signing_key: RwLock<Option<PublicKey>>,
    local_keys: RwLock<IndexSet<PublicKey>>,
    publisher_lists: RwLock<IndexMap<PublicKey, Option<PublisherList>>>,
}

fn parse_node_key(key: &str) -> Result<PublicKey, ValidatorListError> {
    let bytes = decode_token(TokenType::NodePublic, key)
        .or_else(|_| hex::decode(key).map_err(|_| ()))
        .map_err(|_| ValidatorListError::InvalidKey(key.to_owned()))?;
    PublicKey::from_slice(&bytes).map_err(|_| ValidatorListError::InvalidKey(key.to_owned()))
}

impl ValidatorList {
    pub fn new(manifests: Arc<ManifestCache>, time_keeper: Arc<dyn TimeKeeper>) -> Self {
        Self {
            manifests,
            time_keeper,
            local_signing_key: RwLock::new(None),
            local_keys: RwLock::new(IndexSet::new()),
            publisher_lists: RwLock::new(IndexMap::new()),
        }
    }

    pub fn manifests(&self) -> &Arc<ManifestCache> {
        &self.manifests
    }

    /// Load trusted keys from configuration. Local keys are node public
    /// tokens or hex, publisher keys are hex master keys.
    pub fn load(
        &self,
        local_signing_key: Option<PublicKey>,
        config_keys: &[String],
        publisher_keys: &[String],
    ) -> Result<(), ValidatorListError> {
        let mut publishers = Vec::with_capacity(publisher_keys.len());
        for key in publisher_keys {
            publishers.push(parse_node_key(key)?);
        }
        let mut locals = Vec::with_capacity(config_keys.len());
        for line in config_keys {
            // A line may carry a comment after the key
            let key = line.split_whitespace().next().unwrap_or_default();
            locals.push(parse_node_key(key)?);
        }

        {
            let mut lists = self.publisher_lists.write();
            for key in publishers {
                lists.entry(key).or_insert(None);
            }
        }
        self.local_keys.write().extend(locals);
        *self.local_signing_key.write() = local_signing_key;
        info!(
            "Loaded {} local validator keys and {} publisher keys",
            config_keys.len(),
            publisher_keys.len()
        );
        Ok(())
    }

    /// Apply a list fetched from a publisher site.
    pub fn apply_list(&self, manifest: &str, blob: &str, signature: &str, version: u32) -> ListDisposition {
        if version != LIST_VERSION {
            return ListDisposition::UnsupportedVersion;
        }
        let Ok(manifest) = Manifest::from_base64(manifest) else {
            return ListDisposition::Invalid;
        };
        if !self.publisher_lists.read().contains_key(&manifest.master_key) {
            debug!("List from unknown publisher {}", manifest.master_key);
            return ListDisposition::Untrusted;
        }
        let publisher = manifest.master_key;
        if self.manifests.apply_manifest(manifest) == ManifestDisposition::Invalid {
            return ListDisposition::Invalid;
        }
        let Some(signing_key) = self.manifests.signing_key(&publisher) else {
            return ListDisposition::Invalid;
        };
        let verified = hex::decode(signature)
            .map(|sig| signing_key.verify(blob.as_bytes(), &sig).is_ok())
            .unwrap_or(false);
        if !verified {
            warn!("Bad list signature from publisher {}", publisher);
            return ListDisposition::Invalid;
        }

        let parsed: Result<ListBlob, ValidatorListError> = STANDARD
            .decode(blob)
            .map_err(ValidatorListError::from)
            .and_then(|bytes| serde_json::from_slice(&bytes).map_err(ValidatorListError::from));
        let Ok(parsed) = parsed else {
            return ListDisposition::Invalid;
        };

        let mut lists = self.publisher_lists.write();
        if let Some(Some(current)) = lists.get(&publisher) {
            if current.sequence >= parsed.sequence {
                return ListDisposition::Stale;
            }
        }

        let mut keys = Vec::with_capacity(parsed.validators.len());
        for validator in &parsed.validators {
            let Ok(key) = parse_node_key(&validator.validation_public_key) else {
                warn!("Skipping bad key {} in list", validator.validation_public_key);
                continue;
            };
            if let Some(encoded) = &validator.manifest {
                match Manifest::from_base64(encoded) {
                    Ok(manifest) if manifest.master_key == key => {
                        self.manifests.apply_manifest(manifest);
                    }
                    _ => warn!("Ignoring bad manifest for {}", key),
                }
            }
            keys.push(key);
        }
        info!(
            "Accepted list {} from {} with {} validators",
            parsed.sequence,
            publisher,
            keys.len()
        );
        lists.insert(
            publisher,
            Some(PublisherList {
                sequence: parsed.sequence,
                expiration: NetTime::from_secs(parsed.expiration),
                keys,
            }),
        );
        ListDisposition::Accepted
    }

    fn master_of(&self, key: &PublicKey) -> PublicKey {
        self.manifests.master_key(key).unwrap_or(*key)
    }

    fn in_lists(&self, master: &PublicKey, unexpired_only: bool) -> bool {
        if self.local_keys.read().contains(master) {
            return true;
        }
        let now = self.time_keeper.now();
        self.publisher_lists.read().values().flatten().any(|list| {
            (!unexpired_only || list.expiration > now) && list.keys.contains(master)
        })
    }

    /// The key, or the master key it signs for, appears on any list.
    pub fn listed(&self, key: &PublicKey) -> bool {
        self.in_lists(&self.master_of(key), false)
    }

    /// Listed on the local configuration or on an unexpired publisher list.
    pub fn trusted(&self, key: &PublicKey) -> bool {
        self.in_lists(&self.master_of(key), true)
    }

    pub fn trusted_publisher(&self, key: &PublicKey) -> bool {
        self.publisher_lists.read().contains_key(key)
    }

    pub fn local_signing_key(&self) -> Option<PublicKey> {
        *self.local_signing_key.read()
    }

    /// Number of distinct validators currently trusted.
    pub fn trusted_count(&self) -> usize {
        let now = self.time_keeper.now();
        let mut keys: IndexSet<PublicKey> = self.local_keys.read().clone();
        for list in self.publisher_lists.read().values().flatten() {
            if list.expiration > now {
                keys.extend(list.keys.iter().copied());
            }
        }
        keys.len()
    }
}
