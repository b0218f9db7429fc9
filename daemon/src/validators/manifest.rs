use base64::{engine::general_purpose::STANDARD, Engine};
use log::{debug, trace};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use trackable_common::crypto::{prefix, KeyPair, PublicKey};

use super::ValidatorListError;

/// Binds an ephemeral signing key to a long lived master key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub master_key: PublicKey,
    pub signing_key: PublicKey,
    pub sequence: u32,
    /// Signature by the signing key.
    pub signature: Vec<u8>,
    /// Signature by the master key.
    pub master_signature: Vec<u8>,
}

impl Manifest {
    pub fn make(master: &KeyPair, signing: &KeyPair, sequence: u32) -> Result<Self, ValidatorListError> {
        let mut manifest = Manifest {
            master_key: *master.public_key(),
            signing_key: *signing.public_key(),
            sequence,
            signature: Vec::new(),
            master_signature: Vec::new(),
        };
        let data = manifest.signing_data()?;
        manifest.signature = signing.sign(&data);
        manifest.master_signature = master.sign(&data);
        Ok(manifest)
    }

    fn signing_data(&self) -> Result<Vec<u8>, ValidatorListError> {
        let mut data = prefix::MANIFEST.to_vec();
        data.extend(bincode::serialize(&(
            self.sequence,
            &self.master_key,
            &self.signing_key,
        ))?);
        Ok(data)
    }

    /// Both signatures check out.
    pub fn verify(&self) -> bool {
        let Ok(data) = self.signing_data() else {
            return false;
        };
        self.master_key.verify(&data, &self.master_signature).is_ok()
            && self.signing_key.verify(&data, &self.signature).is_ok()
    }

    pub fn to_base64(&self) -> Result<String, ValidatorListError> {
        Ok(STANDARD.encode(bincode::serialize(self)?))
    }

    pub fn from_base64(encoded: &str) -> Result<Self, ValidatorListError> {
        let bytes = STANDARD.decode(encoded)?;
        Ok(bincode::deserialize(&bytes)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ManifestDisposition {
    Accepted,
    /// A manifest with the same or a higher sequence is already known.
    Stale,
    Invalid,
}

/// Latest manifest seen for each master key.
#[derive(Default)]
pub struct ManifestCache {
    by_master: RwLock<HashMap<PublicKey, Manifest>>,
}

impl ManifestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_manifest(&self, manifest: Manifest) -> ManifestDisposition {
        let mut by_master = self.by_master.write();
        if let Some(known) = by_master.get(&manifest.master_key) {
            if known.sequence >= manifest.sequence {
                trace!("Stale manifest for {}", manifest.master_key);
                return ManifestDisposition::Stale;
            }
        }
        if !manifest.verify() {
            debug!("Rejecting manifest for {} with bad signature", manifest.master_key);
            return ManifestDisposition::Invalid;
        }
        by_master.insert(manifest.master_key, manifest);
        ManifestDisposition::Accepted
    }

    pub fn signing_key(&self, master: &PublicKey) -> Option<PublicKey> {
        self.by_master.read().get(master).map(|m| m.signing_key)
    }

    pub fn master_key(&self, signing: &PublicKey) -> Option<PublicKey> {
        self.by_master
            .read()
            .values()
            .find(|m| m.signing_key == *signing)
            .map(|m| m.master_key)
    }

    pub fn sequence(&self, master: &PublicKey) -> Option<u32> {
        self.by_master.read().get(master).map(|m| m.sequence)
    }
}
