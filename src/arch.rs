// src/arch.rs

//! Target architecture tags
//!
//! Architectures are named the way the binary index and recipes spell them
//! (`x86_64`, `armv7`, `aarch64`, ...). Recipes carry a list of these tags
//! that may also contain the wildcards `all` and `noarch` and negations such
//! as `!armhf`.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::str::FromStr;

/// A target CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X86,
    X86_64,
    Armhf,
    Armv7,
    Aarch64,
    Riscv64,
    S390x,
    Ppc64le,
    Armel,
    Loongarch32,
    Loongarchx32,
    Loongarch64,
    Mips,
    Mips64,
    Mipsel,
    Mips64el,
    Noarch,
    Ppc,
    Ppc64,
    Riscv32,
}

impl Arch {
    /// Every known architecture, in declaration order
    pub const ALL: [Arch; 20] = [
        Self::X86,
        Self::X86_64,
        Self::Armhf,
        Self::Armv7,
        Self::Aarch64,
        Self::Riscv64,
        Self::S390x,
        Self::Ppc64le,
        Self::Armel,
        Self::Loongarch32,
        Self::Loongarchx32,
        Self::Loongarch64,
        Self::Mips,
        Self::Mips64,
        Self::Mipsel,
        Self::Mips64el,
        Self::Noarch,
        Self::Ppc,
        Self::Ppc64,
        Self::Riscv32,
    ];

    /// Tag as written in indexes and recipes
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X86_64 => "x86_64",
            Self::Armhf => "armhf",
            Self::Armv7 => "armv7",
            Self::Aarch64 => "aarch64",
            Self::Riscv64 => "riscv64",
            Self::S390x => "s390x",
            Self::Ppc64le => "ppc64le",
            Self::Armel => "armel",
            Self::Loongarch32 => "loongarch32",
            Self::Loongarchx32 => "loongarchx32",
            Self::Loongarch64 => "loongarch64",
            Self::Mips => "mips",
            Self::Mips64 => "mips64",
            Self::Mipsel => "mipsel",
            Self::Mips64el => "mips64el",
            Self::Noarch => "noarch",
            Self::Ppc => "ppc",
            Self::Ppc64 => "ppc64",
            Self::Riscv32 => "riscv32",
        }
    }

    /// Detect the architecture of the running host
    pub fn native() -> Result<Self> {
        match env::consts::ARCH {
            "x86_64" => Ok(Self::X86_64),
            "x86" => Ok(Self::X86),
            "aarch64" => Ok(Self::Aarch64),
            "arm" => Ok(Self::Armv7),
            "riscv64" => Ok(Self::Riscv64),
            "s390x" => Ok(Self::S390x),
            "powerpc64" => Ok(Self::Ppc64le),
            "loongarch64" => Ok(Self::Loongarch64),
            other => Err(Error::InvalidArch(format!("unsupported host architecture {}", other))),
        }
    }

    /// Check whether a recipe `arch` list allows building for this architecture
    ///
    /// A negation (`!arch`) always wins over `all` and `noarch`.
    pub fn allowed_by(&self, arches: &[String]) -> bool {
        let negated = format!("!{}", self.as_str());
        if arches.iter().any(|a| *a == negated) {
            return false;
        }
        arches
            .iter()
            .any(|a| a == self.as_str() || a == "all" || a == "noarch")
    }
}

impl FromStr for Arch {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|arch| arch.as_str() == s)
            .ok_or_else(|| Error::InvalidArch(s.to_string()))
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
