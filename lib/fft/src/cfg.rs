// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 The FFT Authors

//! Flow table and stage configuration.
//!
//! The configuration is a TOML document with one table per
//! component. Every field is optional:
//!
//! ```toml
//! [table]
//! timeout_ms = 3000
//! loop_avoidance = true
//! gc_on_add = false
//! gc_on_check = false
//! initial_buckets = 64
//!
//! [insert]
//! port = 1
//! overwrite = true
//! verbose = false
//!
//! [verify]
//! verbose = false
//!
//! [route]
//! outputs = 4
//! verbose = false
//! ```

use crate::api::TableParams;
use crate::engine::flow_table::DEF_BUCKETS;
use crate::engine::flow_table::FlowTable;
use crate::engine::flow_table::MAX_BUCKETS;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// The number of distinct egress ports.
pub const MAX_OUTPUTS: u16 = 256;

#[derive(Debug, Error)]
pub enum CfgError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FftCfg {
    pub table: TableCfg,
    pub insert: InsertCfg,
    pub verify: VerifyCfg,
    pub route: RouteCfg,
}

impl FftCfg {
    pub fn from_toml(s: &str) -> Result<Self, CfgError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, CfgError> {
        let s = std::fs::read_to_string(path).map_err(|source| {
            CfgError::Io { path: path.display().to_string(), source }
        })?;
        Self::from_toml(&s)
    }

    pub fn validate(&self) -> Result<(), CfgError> {
        if self.table.initial_buckets == 0
            || self.table.initial_buckets > MAX_BUCKETS
        {
            return Err(CfgError::Invalid(format!(
                "table.initial_buckets must be in 1..={MAX_BUCKETS}, got {}",
                self.table.initial_buckets
            )));
        }

        if self.route.outputs > MAX_OUTPUTS {
            return Err(CfgError::Invalid(format!(
                "route.outputs must be at most {MAX_OUTPUTS}, got {}",
                self.route.outputs
            )));
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TableCfg {
    pub timeout_ms: u32,
    pub loop_avoidance: bool,
    pub gc_on_add: bool,
    pub gc_on_check: bool,
    pub initial_buckets: usize,
}

impl Default for TableCfg {
    fn default() -> Self {
        let p = TableParams::default();
        Self {
            timeout_ms: p.timeout_ms,
            loop_avoidance: p.loop_avoidance,
            gc_on_add: p.gc_on_add,
            gc_on_check: p.gc_on_check,
            initial_buckets: DEF_BUCKETS,
        }
    }
}

impl TableCfg {
    pub fn params(&self) -> TableParams {
        TableParams {
            timeout_ms: self.timeout_ms,
            loop_avoidance: self.loop_avoidance,
            gc_on_add: self.gc_on_add,
            gc_on_check: self.gc_on_check,
        }
    }

    pub fn build(&self) -> FlowTable {
        FlowTable::with_buckets(self.params(), self.initial_buckets)
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct InsertCfg {
    /// The egress port recorded for every learned flow.
    pub port: u8,
    /// Replace existing records even when they are still fresh.
    pub overwrite: bool,
    pub verbose: bool,
}

impl Default for InsertCfg {
    fn default() -> Self {
        Self { port: 0, overwrite: true, verbose: false }
    }
}

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct VerifyCfg {
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RouteCfg {
    /// The number of egress ports. A flow resolving to a port at or
    /// above this is dropped.
    pub outputs: u16,
    /// Log every unrouted packet rather than only the first.
    pub verbose: bool,
}

impl Default for RouteCfg {
    fn default() -> Self {
        Self { outputs: MAX_OUTPUTS, verbose: false }
    }
}
