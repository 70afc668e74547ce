//! Resource quantities as they appear in pod manifests.
//!
//! Memory is kept in bytes and accepts the usual binary (`Ki`, `Mi`, `Gi`,
//! `Ti`) and decimal (`k`, `M`, `G`, `T`) suffixes. CPU is kept in CPU
//! shares, the unit the task service schedules with (1024 shares = 1 vCPU):
//! a bare integer is taken as shares, `<n>m` as millicores.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const SHARES_PER_VCPU: u32 = 1024;
pub const MIB: u64 = 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid quantity '{input}': {reason}")]
pub struct QuantityError {
    pub input: String,
    pub reason: String,
}

impl QuantityError {
    fn new(input: &str, reason: impl Into<String>) -> Self {
        Self {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Manifests may spell quantities as strings or bare numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuantityRepr {
    Number(u64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "QuantityRepr", into = "String")]
pub struct Memory(u64);

impl Memory {
    pub fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub fn from_mib(mib: u64) -> Self {
        Self(mib.saturating_mul(MIB))
    }

    pub fn bytes(&self) -> u64 {
        self.0
    }

    /// Size in MiB, rounded up.
    pub fn mib_ceil(&self) -> u64 {
        self.0.div_ceil(MIB)
    }
}

impl FromStr for Memory {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (number, suffix) = split_suffix(trimmed);
        let multiplier: u64 = match suffix {
            "" => 1,
            "Ki" => 1 << 10,
            "Mi" => 1 << 20,
            "Gi" => 1 << 30,
            "Ti" => 1 << 40,
            "k" | "K" => 1_000,
            "M" => 1_000_000,
            "G" => 1_000_000_000,
            "T" => 1_000_000_000_000,
            other => return Err(QuantityError::new(s, format!("unknown suffix '{}'", other))),
        };

        if number.is_empty() {
            return Err(QuantityError::new(s, "missing number"));
        }

        if number.contains('.') {
            let value: f64 = number
                .parse()
                .map_err(|_| QuantityError::new(s, "not a number"))?;
            let bytes = (value * multiplier as f64).ceil();
            if !bytes.is_finite() || bytes < 0.0 || bytes > u64::MAX as f64 {
                return Err(QuantityError::new(s, "out of range"));
            }
            return Ok(Self(bytes as u64));
        }

        let value: u64 = number
            .parse()
            .map_err(|_| QuantityError::new(s, "not a number"))?;
        value
            .checked_mul(multiplier)
            .map(Self)
            .ok_or_else(|| QuantityError::new(s, "out of range"))
    }
}

impl TryFrom<QuantityRepr> for Memory {
    type Error = QuantityError;

    fn try_from(repr: QuantityRepr) -> Result<Self, Self::Error> {
        match repr {
            QuantityRepr::Number(n) => Ok(Self(n)),
            QuantityRepr::Text(s) => s.parse(),
        }
    }
}

impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 != 0 && self.0 % MIB == 0 {
            write!(f, "{}Mi", self.0 / MIB)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl From<Memory> for String {
    fn from(m: Memory) -> Self {
        m.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "QuantityRepr", into = "String")]
pub struct CpuShares(u32);

impl CpuShares {
    pub fn new(shares: u32) -> Self {
        Self(shares)
    }

    pub fn from_millicores(millicores: u64) -> Self {
        let shares = millicores.saturating_mul(SHARES_PER_VCPU as u64).div_ceil(1000);
        Self(u32::try_from(shares).unwrap_or(u32::MAX))
    }

    pub fn shares(&self) -> u32 {
        self.0
    }
}

impl FromStr for CpuShares {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (number, suffix) = split_suffix(trimmed);
        if number.is_empty() {
            return Err(QuantityError::new(s, "missing number"));
        }
        if number.contains('.') {
            return Err(QuantityError::new(
                s,
                "use integer CPU shares or millicores ('250m')",
            ));
        }
        let value: u64 = number
            .parse()
            .map_err(|_| QuantityError::new(s, "not a number"))?;
        match suffix {
            "" => u32::try_from(value)
                .map(Self)
                .map_err(|_| QuantityError::new(s, "out of range")),
            "m" => Ok(Self::from_millicores(value)),
            other => Err(QuantityError::new(s, format!("unknown suffix '{}'", other))),
        }
    }
}

impl TryFrom<QuantityRepr> for CpuShares {
    type Error = QuantityError;

    fn try_from(repr: QuantityRepr) -> Result<Self, Self::Error> {
        match repr {
            QuantityRepr::Number(n) => u32::try_from(n)
                .map(Self)
                .map_err(|_| QuantityError::new(&n.to_string(), "out of range")),
            QuantityRepr::Text(s) => s.parse(),
        }
    }
}

impl fmt::Display for CpuShares {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<CpuShares> for String {
    fn from(c: CpuShares) -> Self {
        c.to_string()
    }
}

fn split_suffix(s: &str) -> (&str, &str) {
    let at = s
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(s.len());
    s.split_at(at)
}
