//! # Identifier Classification
//!
//! User-state keys use the micro-syntax `platform|idType:value`:
//!
//! | key                     | bucket            |
//! |-------------------------|-------------------|
//! | `twitch|id:123`         | `ForeignId`       |
//! | `twitch|username:bob`   | `ForeignUsername` |
//! | `|id:61a0...`           | `Id`              |
//! | `|username:bob`         | `Username`        |
//!
//! Anything else does not classify and is dropped by the caller.

use crate::model::Platform;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

/// Lookup strategy a key resolves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentifierBucket {
    /// A connection id on a third-party platform.
    ForeignId,
    /// A connection username on a third-party platform.
    ForeignUsername,
    /// An internal account id.
    Id,
    /// An internal account username.
    Username,
}

impl IdentifierBucket {
    pub const ALL: [IdentifierBucket; 4] = [
        IdentifierBucket::ForeignId,
        IdentifierBucket::ForeignUsername,
        IdentifierBucket::Id,
        IdentifierBucket::Username,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IdentifierBucket::ForeignId => "foreign_id",
            IdentifierBucket::ForeignUsername => "foreign_username",
            IdentifierBucket::Id => "id",
            IdentifierBucket::Username => "username",
        }
    }

    pub fn is_foreign(&self) -> bool {
        matches!(
            self,
            IdentifierBucket::ForeignId | IdentifierBucket::ForeignUsername
        )
    }
}

impl fmt::Display for IdentifierBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A key that parsed, with the parts the fetcher needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    /// The composite key as requested, used to hand results back to the loader.
    pub key: String,
    pub bucket: IdentifierBucket,
    /// Set for the foreign buckets only.
    pub platform: Option<Platform>,
    pub value: String,
}

/// Builds a composite key. An empty platform addresses internal accounts.
pub fn compose_key(platform: &Platform, id_type: &str, value: &str) -> String {
    format!("{platform}|{id_type}:{value}")
}

/// Parses one composite key. Pure.
pub fn classify(key: &str) -> Option<Classified> {
    let (platform, rest) = key.split_once('|')?;
    let (id_type, value) = rest.split_once(':')?;
    if value.is_empty() {
        return None;
    }

    let platform = Platform::new(platform);
    let foreign = !platform.is_empty();
    let bucket = match (id_type, foreign) {
        ("id", true) => IdentifierBucket::ForeignId,
        ("username", true) => IdentifierBucket::ForeignUsername,
        ("id", false) => IdentifierBucket::Id,
        ("username", false) => IdentifierBucket::Username,
        _ => return None,
    };

    Some(Classified {
        key: key.to_string(),
        bucket,
        platform: foreign.then_some(platform),
        value: value.to_string(),
    })
}

/// Classified keys of one batch, grouped per bucket.
#[derive(Debug, Clone, Default)]
pub struct Buckets {
    groups: HashMap<IdentifierBucket, Vec<Classified>>,
    dropped: Vec<String>,
}

impl Buckets {
    /// Classifies `keys`, de-duplicating within each bucket and keeping first-seen order.
    pub fn from_keys<'a>(keys: impl IntoIterator<Item = &'a String>) -> Self {
        let mut buckets = Buckets::default();
        let mut seen = HashSet::new();

        for key in keys {
            match classify(key) {
                Some(classified) => {
                    if seen.insert(classified.key.clone()) {
                        buckets
                            .groups
                            .entry(classified.bucket)
                            .or_default()
                            .push(classified);
                    }
                }
                None => buckets.dropped.push(key.clone()),
            }
        }
        buckets
    }

    pub fn get(&self, bucket: IdentifierBucket) -> &[Classified] {
        self.groups.get(&bucket).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Non-empty buckets, in [`IdentifierBucket::ALL`] order.
    pub fn non_empty(&self) -> impl Iterator<Item = (IdentifierBucket, &[Classified])> {
        IdentifierBucket::ALL
            .into_iter()
            .map(|bucket| (bucket, self.get(bucket)))
            .filter(|(_, entries)| !entries.is_empty())
    }

    /// Keys that did not classify.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn into_groups(self) -> HashMap<IdentifierBucket, Vec<Classified>> {
        self.groups
    }
}

/// Splits the entries of a foreign bucket per platform, sorted by platform name.
pub fn group_by_platform(entries: Vec<Classified>) -> BTreeMap<Platform, Vec<Classified>> {
    let mut groups: BTreeMap<Platform, Vec<Classified>> = BTreeMap::new();
    for entry in entries {
        let platform = entry.platform.clone().unwrap_or_default();
        groups.entry(platform).or_default().push(entry);
    }
    groups
}
