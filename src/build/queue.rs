// src/build/queue.rs

//! Build queue entries

use crate::arch::Arch;
use crate::recipe::Recipe;
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Non-fatal note attached to a queued package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Diagnostic {
    /// Queued ahead of `blocker` by relying on an existing binary of it
    CycleBroken { blocker: String },
    /// Built although the index has a newer binary (forced)
    NewerBinary {
        binary_version: String,
        source_version: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CycleBroken { blocker } => write!(
                f,
                "cyclic build dependency broken using existing binary of {}",
                blocker
            ),
            Self::NewerBinary {
                binary_version,
                source_version,
            } => write!(
                f,
                "binary package {} is newer than source {}, result won't be installed automatically",
                binary_version, source_version
            ),
        }
    }
}

/// One package scheduled for building
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildQueueItem {
    /// Recipe pkgname
    pub name: String,
    pub arch: Arch,
    pub recipe: Recipe,
    /// Some binary exists for this name and arch, possibly outdated
    pub has_binary: bool,
    /// Direct dependencies, translated to owning pkgnames
    pub depends: Vec<String>,
    /// Version being produced (`pkgver-rpkgrel`)
    pub version: String,
    /// Package file relative to the channel directory
    pub output: PathBuf,
    /// Recipe repository
    pub repo: Option<String>,
    pub channel: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildQueueItem {
    /// Whether building this item also produces `name`
    pub fn produces(&self, name: &str) -> bool {
        self.name == name || self.recipe.has_subpackage(name)
    }

    /// Subpackage names produced alongside the main package
    pub fn subpackages(&self) -> impl Iterator<Item = &str> {
        self.recipe.subpackages.keys().map(String::as_str)
    }
}

impl fmt::Display for BuildQueueItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} {} ({})", self.channel, self.name, self.version, self.arch)
    }
}

/// Package file a build produces: `<arch>/<pkgname>-<pkgver>-r<pkgrel>.apk`
pub fn output_path(arch: Arch, pkgname: &str, pkgver: &str, pkgrel: u32) -> PathBuf {
    PathBuf::from(arch.as_str()).join(format!("{}-{}-r{}.apk", pkgname, pkgver, pkgrel))
}

/// pkgver used when building from a source override
///
/// Any existing `_suffix` is replaced by `_p` and the build timestamp, so
/// `1.2_git20240101` becomes `1.2_p20240315120000`.
pub fn source_pkgver<Tz>(pkgver: &str, now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let base = pkgver.split('_').next().unwrap_or(pkgver);
    format!("{}_p{}", base, now.format("%Y%m%d%H%M%S"))
}
