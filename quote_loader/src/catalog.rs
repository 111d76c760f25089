//! Instrument catalog: the built-in universe, TOML parsing, and normalization.
//!
//! The catalog describes every series the loader retrieves, grouped by
//! [`InstrumentClass`], in a fixed order. It is built once at start-up and then only
//! ever borrowed.
//!
//! Key behaviors:
//! - Identifiers are trimmed; empty or duplicate identifiers are rejected.
//! - Gas-only attributes (`has_volume`, `default_unit`) are rejected on FX entries.
//! - A blank `default_unit` is the same as no default unit.
//! - File order is preserved.
//!
//! Entrypoints:
//! - Built-in universe: [`Catalog::builtin`]
//! - Parse + normalize from a TOML string: [`load_catalog_str`]
//! - Parse + normalize from a file path: [`load_catalog_path`]

use std::path::Path;

use anyhow::{Context, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use toml::from_str;

use crate::models::instrument::{Instrument, InstrumentClass};

const BUILTIN_FX: [&str; 11] = [
    "USDEUR=R", "PLNEUR=R", "GBPEUR=R", "CZKEUR=R", "HRKEUR=R", "HUFEUR=R", "BGNEUR=R",
    "RONEUR=R", "RUBEUR=R", "CHFEUR=R", "TRY=",
];

/// `(id, has_volume, default_unit)`
const BUILTIN_GAS: [(&str, bool, Option<&str>); 14] = [
    ("CGXHVPDA", true, None),
    ("CZVTPDA", true, None),
    ("ICPATVTPDA", false, None),
    ("MIBG-WD-ES", true, None),
    ("PEGDA", true, None),
    ("PNCGDA", true, None),
    ("POXGBASE", true, None),
    ("TRDEGSPD1", false, None),
    ("TRGBNBPD1", false, None),
    ("TRITPSVDA", false, None),
    ("TRNLTTFD1", false, None),
    ("ZEEDA", true, Some("THERM")),
    ("TFMBMJ1", true, None),
    ("TFMBMK1", true, None),
];

/// On-disk shape: a table of instrument id -> entry.
#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogFile {
    pub instruments: IndexMap<String, InstrumentCfg>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InstrumentCfg {
    pub class: InstrumentClass,
    /// Gas only. Defaults to `true`.
    pub has_volume: Option<bool>,
    /// Gas only. Overrides the unit reported by the provider.
    pub default_unit: Option<String>,
}

/// Normalized, immutable instrument universe.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    instruments: IndexMap<String, Instrument>,
}

impl Catalog {
    /// Builds a catalog from already constructed instruments, keeping their order.
    pub fn new(instruments: impl IntoIterator<Item = Instrument>) -> anyhow::Result<Self> {
        let mut map = IndexMap::new();
        for mut instrument in instruments {
            let id = instrument.id.trim().to_string();
            if id.is_empty() {
                bail!("instrument id cannot be empty after trimming");
            }
            if map.contains_key(&id) {
                bail!("duplicate instrument id after normalization: {id}");
            }
            instrument.id = id.clone();
            map.insert(id, instrument);
        }
        Ok(Self { instruments: map })
    }

    /// The default universe: 11 FX crosses and 14 gas hubs.
    pub fn builtin() -> Self {
        let fx = BUILTIN_FX.iter().map(|id| Instrument::fx(*id));
        let gas = BUILTIN_GAS
            .iter()
            .map(|(id, has_volume, unit)| Instrument::gas(*id, *has_volume, *unit));
        Self {
            instruments: fx.chain(gas).map(|i| (i.id.clone(), i)).collect(),
        }
    }

    /// Instruments of one class, in catalog order.
    pub fn instruments_of(&self, class: InstrumentClass) -> impl Iterator<Item = &Instrument> {
        self.instruments.values().filter(move |i| i.class() == class)
    }

    #[cfg(test)]
    pub(crate) fn get(&self, id: &str) -> Option<&Instrument> {
        self.instruments.get(id)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

/// Turns the parsed file into a [`Catalog`].
///
/// Errors:
/// - Empty or duplicate ids after trimming
/// - `has_volume` or `default_unit` on an FX entry
pub fn normalize_catalog(file: CatalogFile) -> anyhow::Result<Catalog> {
    let mut instruments = Vec::with_capacity(file.instruments.len());

    for (raw_id, cfg) in file.instruments {
        let id = raw_id.trim();
        let instrument = match cfg.class {
            InstrumentClass::Fx => {
                if cfg.has_volume.is_some() || cfg.default_unit.is_some() {
                    bail!("fx instrument '{id}' cannot carry has_volume/default_unit");
                }
                Instrument::fx(id)
            }
            InstrumentClass::Gas => {
                let unit = cfg
                    .default_unit
                    .as_deref()
                    .map(str::trim)
                    .filter(|u| !u.is_empty());
                Instrument::gas(id, cfg.has_volume.unwrap_or(true), unit)
            }
        };
        instruments.push(instrument);
    }

    Catalog::new(instruments)
}

/// Parse and normalize a catalog from a TOML string.
pub fn load_catalog_str(s: &str) -> anyhow::Result<Catalog> {
    let file: CatalogFile = from_str(s).context("parse catalog TOML")?;
    normalize_catalog(file)
}

/// Load a catalog from a TOML file on disk.
pub fn load_catalog_path(p: &Path) -> anyhow::Result<Catalog> {
    let s = std::fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    load_catalog_str(&s).with_context(|| format!("load catalog {}", p.display()))
}

/// The configured catalog, or the built-in one when no path is set.
pub fn resolve_catalog(path: Option<&Path>) -> anyhow::Result<Catalog> {
    match path {
        Some(p) => load_catalog_path(p),
        None => Ok(Catalog::builtin()),
    }
}
