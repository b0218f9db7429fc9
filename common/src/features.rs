//! Amendment registry.
//!
//! Each amendment is identified by the SHA-512-half of its name. Lookups by
//! name are case sensitive.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::crypto::{sha512_half, Hash256};

pub type FeatureId = Hash256;

/// Amendments this build knows about and can vote for.
pub const SUPPORTED_AMENDMENTS: &[&str] = &[
    "MultiSign",
    "Tickets",
    "TrustSetAuth",
    "FeeEscalation",
    "OwnerPaysFee",
    "PayChan",
    "Flow",
    "CryptoConditions",
    "TickSize",
    "fix1368",
    "Escrow",
    "fix1373",
    "EnforceInvariants",
    "SortedDirectories",
    "fix1201",
    "fix1512",
    "fix1523",
    "fix1528",
];

pub fn feature_id(name: &str) -> FeatureId {
    sha512_half(&[name.as_bytes()])
}

lazy_static! {
    static ref REGISTRY: Vec<(&'static str, FeatureId)> = SUPPORTED_AMENDMENTS
        .iter()
        .map(|name| (*name, feature_id(name)))
        .collect();
    pub static ref FEATURE_MULTI_SIGN: FeatureId = feature_id("MultiSign");
    pub static ref FEATURE_TRUST_SET_AUTH: FeatureId = feature_id("TrustSetAuth");
    pub static ref FEATURE_FEE_ESCALATION: FeatureId = feature_id("FeeEscalation");
    pub static ref FEATURE_FLOW: FeatureId = feature_id("Flow");
    pub static ref FEATURE_ESCROW: FeatureId = feature_id("Escrow");
    pub static ref FEATURE_PAY_CHAN: FeatureId = feature_id("PayChan");
    pub static ref FEATURE_TICK_SIZE: FeatureId = feature_id("TickSize");
    pub static ref FIX_1201: FeatureId = feature_id("fix1201");
}

pub fn get_registered_feature(name: &str) -> Option<FeatureId> {
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, id)| *id)
}

pub fn feature_name(id: &FeatureId) -> Option<&'static str> {
    REGISTRY
        .iter()
        .find(|(_, registered)| registered == id)
        .map(|(name, _)| *name)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet(BTreeSet<FeatureId>);

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_supported() -> Self {
        FeatureSet(REGISTRY.iter().map(|(_, id)| *id).collect())
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.0.contains(id)
    }

    pub fn insert(&mut self, id: FeatureId) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: &FeatureId) -> bool {
        self.0.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeatureId> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<FeatureId> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = FeatureId>>(iter: I) -> Self {
        FeatureSet(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_sensitive() {
        assert_eq!(get_registered_feature("MultiSign"), Some(*FEATURE_MULTI_SIGN));
        assert_eq!(get_registered_feature("multisign"), None);
        assert_eq!(feature_name(&FIX_1201), Some("fix1201"));
        assert_eq!(feature_name(&Hash256::zero()), None);
    }

    #[test]
    fn test_all_supported_has_every_amendment() {
        let all = FeatureSet::all_supported();
        assert_eq!(all.len(), SUPPORTED_AMENDMENTS.len());
        assert!(all.contains(&FEATURE_FEE_ESCALATION));
    }
}
