//! Amendment table: which amendments this server supports, vetoes and sees
//! enabled, and how it votes on flag ledgers.

use indexmap::IndexMap;
use log::{debug, info};
use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use std::time::Duration;
use trackable_common::{
    crypto::Hash256,
    features::{feature_id, FeatureId, FeatureSet},
    time::NetTime,
};

use crate::ledger::{
    entry::{Amendments, LedgerEntry, Majority},
    keylet, Ledger, ReadView,
};

/// Out of 256 trusted validations, how many must vote for an amendment.
pub const MAJORITY_FRACTION: u32 = 204;
/// Weight of this server's own yes vote.
pub const YES_VOTE: u32 = 256;
/// How long an amendment must hold a majority before it is enabled.
pub const MAJORITY_TIME: Duration = Duration::from_secs(14 * 24 * 60 * 60);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct AmendmentState {
    name: String,
    supported: bool,
    vetoed: bool,
    enabled: bool,
}

/// Outcome of the last vote, kept for reporting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct LastVote {
    trusted_validations: u32,
    votes: IndexMap<FeatureId, u32>,
}

impl LastVote {
    fn threshold(&self) -> u32 {
        (self.trusted_validations * MAJORITY_FRACTION / 256).max(1)
    }
}

pub struct AmendmentTable {
    amendments: RwLock<IndexMap<FeatureId, AmendmentState>>,
    majorities: RwLock<IndexMap<FeatureId, NetTime>>,
    last_vote: RwLock<Option<LastVote>>,
}

impl AmendmentTable {
    pub fn new(supported: &[&str], vetoed: &[&str]) -> Self {
        let mut amendments = IndexMap::new();
        for name in supported {
            amendments.insert(
                feature_id(name),
                AmendmentState {
                    name: name.to_string(),
                    supported: true,
                    vetoed: vetoed.contains(name),
                    enabled: false,
                },
            );
        }
        Self {
            amendments: RwLock::new(amendments),
            majorities: RwLock::new(IndexMap::new()),
            last_vote: RwLock::new(None),
        }
    }

    /// Look an amendment up by its exact name.
    pub fn find(&self, name: &str) -> Option<FeatureId> {
        self.amendments
            .read()
            .iter()
            .find(|(_, state)| state.name == name)
            .map(|(id, _)| *id)
    }

    pub fn veto(&self, id: &FeatureId) -> bool {
        self.set_vetoed(id, true)
    }

    pub fn unveto(&self, id: &FeatureId) -> bool {
        self.set_vetoed(id, false)
    }

    fn set_vetoed(&self, id: &FeatureId, vetoed: bool) -> bool {
        let mut amendments = self.amendments.write();
        let state = amendments.entry(*id).or_default();
        if state.vetoed == vetoed {
            return false;
        }
        state.vetoed = vetoed;
        true
    }

    /// Mark an amendment enabled. Returns false when it already was.
    pub fn enable(&self, id: &FeatureId) -> bool {
        let mut amendments = self.amendments.write();
        let state = amendments.entry(*id).or_default();
        if state.enabled {
            return false;
        }
        state.enabled = true;
        if !state.supported {
            info!("Unsupported amendment {} activated", id);
        }
        true
    }

    pub fn disable(&self, id: &FeatureId) -> bool {
        let mut amendments = self.amendments.write();
        match amendments.get_mut(id) {
            Some(state) if state.enabled => {
                state.enabled = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_enabled(&self, id: &FeatureId) -> bool {
        self.amendments
            .read()
            .get(id)
            .is_some_and(|state| state.enabled)
    }

    pub fn is_supported(&self, id: &FeatureId) -> bool {
        self.amendments
            .read()
            .get(id)
            .is_some_and(|state| state.supported)
    }

    pub fn enabled(&self) -> FeatureSet {
        let mut set = FeatureSet::new();
        for (id, state) in self.amendments.read().iter() {
            if state.enabled {
                set.insert(*id);
            }
        }
        set
    }

    /// Pick up enabled amendments and majorities from a closed ledger.
    pub fn sync(&self, ledger: &Ledger) {
        let Some(entry) = amendments_entry(ledger) else {
            return;
        };
        for id in &entry.enabled {
            self.enable(id);
        }
        let mut majorities = self.majorities.write();
        majorities.clear();
        for majority in &entry.majorities {
            majorities.insert(majority.amendment, majority.close_time);
        }
    }

    /// Amendments this server votes for.
    fn desired(&self) -> Vec<FeatureId> {
        self.amendments
            .read()
            .iter()
            .filter(|(_, state)| state.supported && !state.vetoed && !state.enabled)
            .map(|(id, _)| *id)
            .collect()
    }

    /// Vote on a flag ledger. `ledger` is the ledger about to close; its
    /// amendments entry is rewritten with the new majorities and any
    /// amendment that held a majority long enough is enabled.
    pub fn do_voting(&self, ledger: &mut Ledger, trusted_validations: u32) {
        let close_time = ledger.info().parent_close_time;
        let mut entry = amendments_entry(ledger).unwrap_or_default();

        let votes: IndexMap<FeatureId, u32> =
            self.desired().into_iter().map(|id| (id, 1)).collect();
        let vote = LastVote {
            trusted_validations,
            votes,
        };
        let threshold = vote.threshold();

        let mut majorities = Vec::new();
        for (id, count) in &vote.votes {
            if *count < threshold {
                continue;
            }
            let since = entry
                .majorities
                .iter()
                .find(|m| m.amendment == *id)
                .map(|m| m.close_time)
                .unwrap_or(close_time);
            if since + MAJORITY_TIME <= close_time {
                debug!("Amendment {} held a majority since {}, enabling", id, since);
                entry.enabled.push(*id);
                continue;
            }
            majorities.push(Majority {
                amendment: *id,
                close_time: since,
            });
        }
        entry.majorities = majorities;
        info!(
            "Voted on ledger {}: {} majorities, {} enabled",
            ledger.info().seq,
            entry.majorities.len(),
            entry.enabled.len()
        );
        ledger.raw_replace(LedgerEntry::Amendments(entry));
        *self.last_vote.write() = Some(vote);
    }

    fn inject_json(&self, id: &Hash256, state: &AmendmentState) -> Value {
        let mut obj = Map::new();
        if !state.name.is_empty() {
            obj.insert("name".into(), json!(state.name));
        }
        obj.insert("supported".into(), json!(state.supported));
        obj.insert("vetoed".into(), json!(state.vetoed));
        obj.insert("enabled".into(), json!(state.enabled));

        if !state.enabled {
            if let Some(vote) = self.last_vote.read().as_ref() {
                let count = vote.votes.get(id).copied().unwrap_or(0);
                obj.insert("count".into(), json!(count));
                obj.insert("validations".into(), json!(vote.trusted_validations));
                obj.insert("threshold".into(), json!(vote.threshold()));
                let ours = if vote.votes.contains_key(id) { YES_VOTE } else { 0 };
                obj.insert("vote".into(), json!(ours));
            }
            if let Some(since) = self.majorities.read().get(id) {
                obj.insert("majority".into(), json!(since.as_secs()));
            }
        }
        Value::Object(obj)
    }

    /// Every known amendment keyed by hex id.
    pub fn get_json(&self) -> Value {
        let amendments = self.amendments.read();
        let mut obj = Map::new();
        for (id, state) in amendments.iter() {
            obj.insert(id.to_hex(), self.inject_json(id, state));
        }
        Value::Object(obj)
    }

    /// A single amendment keyed by its hex id.
    pub fn get_json_for(&self, id: &FeatureId) -> Value {
        let state = self.amendments.read().get(id).cloned().unwrap_or_default();
        let mut obj = Map::new();
        obj.insert(id.to_hex(), self.inject_json(id, &state));
        Value::Object(obj)
    }
}

fn amendments_entry(ledger: &Ledger) -> Option<Amendments> {
    ledger
        .read_keylet(&keylet::amendments())
        .and_then(|entry| entry.as_amendments().cloned())
}

/// Amendments holding a majority in a ledger, with the time they got it.
pub fn get_majority_amendments<V: ReadView + ?Sized>(view: &V) -> IndexMap<FeatureId, NetTime> {
    view.read_keylet(&keylet::amendments())
        .and_then(|entry| entry.as_amendments().cloned())
        .map(|entry| {
            entry
                .majorities
                .into_iter()
                .map(|m| (m.amendment, m.close_time))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeeSetup;
    use trackable_common::features::SUPPORTED_AMENDMENTS;

    fn table() -> AmendmentTable {
        AmendmentTable::new(SUPPORTED_AMENDMENTS, &[])
    }

    #[test]
    fn test_find_is_case_sensitive() {
        let table = table();
        assert_eq!(table.find("MultiSign"), Some(feature_id("MultiSign")));
        assert_eq!(table.find("multisign"), None);
        assert_eq!(table.find("AllTheThings"), None);
    }

    #[test]
    fn test_veto_and_enable() {
        let table = table();
        let id = feature_id("CryptoConditions");
        assert!(table.veto(&id));
        assert!(!table.veto(&id));
        assert_eq!(table.get_json_for(&id)[id.to_hex()]["vetoed"], true);
        assert!(table.unveto(&id));
        assert!(table.enable(&id));
        assert!(table.is_enabled(&id));
        assert!(table.enabled().contains(&id));
    }

    #[test]
    fn test_no_vote_fields_before_voting() {
        let json = table().get_json();
        for feature in json.as_object().unwrap().values() {
            assert!(feature.get("count").is_none());
            assert!(feature.get("majority").is_none());
        }
    }

    #[test]
    fn test_voting_records_majorities() {
        let table = table();
        let genesis =
            Ledger::genesis(&FeeSetup::default(), &FeatureSet::new(), &[], Default::default())
                .unwrap();
        let mut next = Ledger::successor(&genesis, &FeatureSet::new());
        table.do_voting(&mut next, 1);
        next.accept(NetTime::from_secs(100), true).unwrap();
        table.sync(&next);

        let majorities = get_majority_amendments(&next);
        assert_eq!(majorities.len(), SUPPORTED_AMENDMENTS.len());
        let json = table.get_json();
        for feature in json.as_object().unwrap().values() {
            assert_eq!(feature["vote"], YES_VOTE);
            assert_eq!(feature["count"], 1);
            assert_eq!(feature["threshold"], 1);
            assert!(feature.get("majority").is_some());
        }
    }
}
