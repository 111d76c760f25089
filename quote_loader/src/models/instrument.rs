//! Instrument identity as seen by the loader: a provider series code plus the class
//! that decides how it is fetched and where its rows end up.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two series families the loader knows how to retrieve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentClass {
    Fx,
    Gas,
}

impl InstrumentClass {
    pub const ALL: [Self; 2] = [Self::Fx, Self::Gas];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fx => "fx",
            Self::Gas => "gas",
        }
    }

    /// Human readable name used in logs and notification subjects.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Fx => "FX rates",
            Self::Gas => "Gas prices",
        }
    }
}

impl fmt::Display for InstrumentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Gas-only attributes from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasAttributes {
    /// `false` means the provider never fills `VOLUME` for this series; the field is
    /// left out of the request and an empty column is synthesized instead.
    pub has_volume: bool,
    /// Unit that wins over whatever the provider's metadata claims.
    pub default_unit: Option<String>,
}

impl Default for GasAttributes {
    fn default() -> Self {
        Self {
            has_volume: true,
            default_unit: None,
        }
    }
}

/// Class-specific part of an [`Instrument`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstrumentKind {
    Fx,
    Gas(GasAttributes),
}

/// A single quoted series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub id: String,
    pub kind: InstrumentKind,
}

impl Instrument {
    pub fn fx(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: InstrumentKind::Fx,
        }
    }

    pub fn gas(id: impl Into<String>, has_volume: bool, default_unit: Option<&str>) -> Self {
        Self {
            id: id.into(),
            kind: InstrumentKind::Gas(GasAttributes {
                has_volume,
                default_unit: default_unit.map(str::to_string),
            }),
        }
    }

    pub fn class(&self) -> InstrumentClass {
        match self.kind {
            InstrumentKind::Fx => InstrumentClass::Fx,
            InstrumentKind::Gas(_) => InstrumentClass::Gas,
        }
    }

    pub fn gas_attributes(&self) -> Option<&GasAttributes> {
        match &self.kind {
            InstrumentKind::Gas(attrs) => Some(attrs),
            InstrumentKind::Fx => None,
        }
    }
}
