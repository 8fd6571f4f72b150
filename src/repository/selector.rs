// src/repository/selector.rs

//! Provider selection
//!
//! When several packages provide the same name, exactly one is picked with a
//! fixed priority list. There is no search over alternatives: the first rule
//! that yields a candidate decides.

use crate::repository::index::IndexRecord;
use crate::repository::table::Providers;
use crate::version::strip_operators;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

/// Caller state consulted while picking a provider
#[derive(Debug, Clone, Default)]
pub struct ProviderContext {
    /// Packages about to be installed alongside
    pub install_set: BTreeSet<String>,
    /// Packages already installed in the target environment
    pub installed: BTreeSet<String>,
    /// Operator pins: logical name -> pkgname
    pub pins: BTreeMap<String, String>,
}

impl ProviderContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_install_set<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.install_set.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_installed<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installed.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_pins(mut self, pins: BTreeMap<String, String>) -> Self {
        self.pins.extend(pins);
        self
    }

    pub fn with_pin(mut self, name: impl Into<String>, pkgname: impl Into<String>) -> Self {
        self.pins.insert(name.into(), pkgname.into());
        self
    }
}

/// Which rule decided a provider choice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickReason {
    /// Single provider
    Only,
    /// Provider pkgname equals the requested name
    SameName,
    /// Provider is about to be installed anyway
    InstallSet,
    /// Provider is already installed
    Installed,
    /// Provider is pinned in configuration
    Pinned,
    /// Unique highest `provider_priority`
    HighestPriority,
    /// Shortest pkgname among equal priorities
    Shortest,
}

impl PickReason {
    /// Whether the decision fell through to the shortest-name heuristic
    pub fn is_arbitrary(&self) -> bool {
        matches!(self, Self::Shortest)
    }
}

impl fmt::Display for PickReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Only => "only provider",
            Self::SameName => "same name",
            Self::InstallSet => "already being installed",
            Self::Installed => "already installed",
            Self::Pinned => "pinned in configuration",
            Self::HighestPriority => "highest provider_priority",
            Self::Shortest => "shortest pkgname (arbitrary)",
        };
        f.write_str(text)
    }
}

/// The picked provider together with the rule that picked it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProviderChoice<'a> {
    pub record: &'a IndexRecord,
    pub reason: PickReason,
}

impl ProviderChoice<'_> {
    pub fn is_arbitrary(&self) -> bool {
        self.reason.is_arbitrary()
    }
}

/// Pick the single best provider of `name`
///
/// Returns `None` only when `providers` is empty.
pub fn pick_provider<'a>(
    name: &str,
    providers: &'a Providers,
    context: &ProviderContext,
) -> Option<ProviderChoice<'a>> {
    let name = strip_operators(name);
    let choose = |record: &'a IndexRecord, reason: PickReason| {
        debug!("{}: picked {} ({})", name, record.pkgname, reason);
        Some(ProviderChoice { record, reason })
    };

    match providers.len() {
        0 => return None,
        1 => return providers.values().next().and_then(|r| choose(r, PickReason::Only)),
        _ => {}
    }

    if let Some(record) = providers.get(name) {
        return choose(record, PickReason::SameName);
    }

    if let Some(record) = providers
        .values()
        .find(|r| context.install_set.contains(&r.pkgname))
    {
        return choose(record, PickReason::InstallSet);
    }

    if let Some(record) = providers
        .values()
        .find(|r| context.installed.contains(&r.pkgname))
    {
        return choose(record, PickReason::Installed);
    }

    if let Some(pin) = context.pins.get(name) {
        match providers.get(pin) {
            Some(record) => return choose(record, PickReason::Pinned),
            None => warn!(
                "{}: pinned provider '{}' is not among the providers, ignoring pin",
                name, pin
            ),
        }
    }

    let priority = |r: &IndexRecord| r.provider_priority.map_or(-1, i64::from);
    let best = providers.values().map(priority).max().unwrap_or(-1);
    let tied: Vec<&IndexRecord> = providers.values().filter(|r| priority(r) == best).collect();
    if let [record] = tied.as_slice() {
        return choose(*record, PickReason::HighestPriority);
    }

    let record = tied.into_iter().min_by_key(|r| r.pkgname.len())?;
    warn!(
        "{}: multiple providers with equal priority, picked shortest pkgname '{}'",
        name, record.pkgname
    );
    choose(record, PickReason::Shortest)
}
