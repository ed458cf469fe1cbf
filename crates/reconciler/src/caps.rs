//! Capability grants for the three Ceph subsystems a client can reach.
//!
//! Cap strings are opaque: they are compared for equality and passed through
//! to the cluster, never parsed.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A cluster subsystem that accepts a capability grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    /// Object storage daemons.
    Osd,
    /// Monitor quorum.
    Mon,
    /// Metadata server.
    Mds,
}

impl Subsystem {
    /// All subsystems, in the order caps are sent to the cluster.
    pub const ALL: [Self; 3] = [Self::Osd, Self::Mon, Self::Mds];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Osd => "osd",
            Self::Mon => "mon",
            Self::Mds => "mds",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Desired or observed caps. An empty string means "not granted".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitySet {
    pub osd: String,
    pub mon: String,
    pub mds: String,
}

impl CapabilitySet {
    pub fn new(osd: impl Into<String>, mon: impl Into<String>, mds: impl Into<String>) -> Self {
        Self {
            osd: osd.into(),
            mon: mon.into(),
            mds: mds.into(),
        }
    }

    /// Same grant for every subsystem.
    pub fn uniform(cap: impl Into<String>) -> Self {
        let cap = cap.into();
        Self::new(cap.clone(), cap.clone(), cap)
    }

    /// The cap granted on `subsystem`, empty if none.
    #[must_use]
    pub fn get(&self, subsystem: Subsystem) -> &str {
        match subsystem {
            Subsystem::Osd => &self.osd,
            Subsystem::Mon => &self.mon,
            Subsystem::Mds => &self.mds,
        }
    }

    /// `(subsystem, cap)` pairs for every non-empty cap.
    pub fn granted(&self) -> impl Iterator<Item = (Subsystem, &str)> {
        Subsystem::ALL
            .into_iter()
            .map(move |subsystem| (subsystem, self.get(subsystem)))
            .filter(|(_, cap)| !cap.is_empty())
    }

    /// Subsystems with no cap set.
    #[must_use]
    pub fn missing(&self) -> Vec<Subsystem> {
        Subsystem::ALL
            .into_iter()
            .filter(|subsystem| self.get(*subsystem).is_empty())
            .collect()
    }

    #[must_use]
    pub fn configured_count(&self) -> usize {
        self.granted().count()
    }

    /// All three caps are set.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.configured_count() == Subsystem::ALL.len()
    }

    /// No cap is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.configured_count() == 0
    }

    /// Overlay the non-empty caps of `self` onto `observed`.
    ///
    /// An empty desired cap keeps whatever the cluster already grants, so
    /// applying the result never revokes a cap the caller left blank.
    #[must_use]
    pub fn merged_over(&self, observed: &Self) -> Self {
        let pick = |desired: &str, current: &str| {
            if desired.is_empty() {
                current.to_string()
            } else {
                desired.to_string()
            }
        };
        Self {
            osd: pick(&self.osd, &observed.osd),
            mon: pick(&self.mon, &observed.mon),
            mds: pick(&self.mds, &observed.mds),
        }
    }
}

/// Whether `new` asks for a different grant than `old`.
///
/// Only non-empty fields of `new` are compared. An empty field means the
/// caller did not ask to change that subsystem, so `{osd: ""}` against a
/// granted osd cap is not a change. This answers "should an update be
/// attempted", not "is `new` safe to apply verbatim"; see
/// [`CapabilitySet::merged_over`] for what actually gets applied.
#[must_use]
pub fn changed(old: &CapabilitySet, new: &CapabilitySet) -> bool {
    new.granted()
        .any(|(subsystem, cap)| cap != old.get(subsystem))
}
