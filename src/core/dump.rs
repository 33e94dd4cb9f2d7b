//! Two-phase dump of every asset in a loaded archive
//!
//! Immediate dumps run first in asset order. Post dumps run afterwards and can open
//! any asset dumped before them by content hash. Outputs stay in memory; writing
//! them anywhere is up to the caller.

use crate::archive::RPakFile;
use crate::asset::{display_name, AssetRegistry, DumpOutput, DumpedAsset, SiblingSource};
use crate::descriptors::AssetType;
use crate::error::Result;
use crate::names::{hash_to_string, KnownAssets};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Why an asset produced no output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAsset {
    pub index: usize,
    pub hash: String,
    pub asset_type: String,
    pub reason: String,
}

/// Dumped assets keyed by content hash, in dump order
#[derive(Debug, Default)]
pub struct DumpStore {
    assets: AHashMap<u64, DumpedAsset>,
    order: Vec<u64>,
}

impl DumpStore {
    fn insert(&mut self, dumped: DumpedAsset) {
        let hash = dumped.hash;
        if self.assets.insert(hash, dumped).is_none() {
            self.order.push(hash);
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DumpedAsset> {
        self.order.iter().filter_map(|hash| self.assets.get(hash))
    }
}

impl SiblingSource for DumpStore {
    fn open(&self, hash: u64) -> Option<&DumpedAsset> {
        self.assets.get(&hash)
    }
}

/// Outcome of a dump session
#[derive(Debug, Default)]
pub struct DumpReport {
    pub dumped: DumpStore,
    pub skipped: Vec<SkippedAsset>,
    /// Names added to the known-name table by this session
    pub discovered_names: usize,
}

pub struct DumpSession<'a> {
    pak: &'a RPakFile,
    registry: &'a AssetRegistry,
}

impl<'a> DumpSession<'a> {
    pub fn new(pak: &'a RPakFile, registry: &'a AssetRegistry) -> Self {
        DumpSession { pak, registry }
    }

    /// Dump every asset, feeding discovered names into `names`
    ///
    /// Unregistered types and missing dependencies skip the asset; any other error
    /// aborts the session.
    pub fn run(&self, names: &mut KnownAssets) -> Result<DumpReport> {
        let mut report = DumpReport::default();
        let known_before = names.len();
        let mut deferred = Vec::new();

        for index in 0..self.pak.num_assets() {
            let descriptor = &self.pak.assets()[index];
            let Some(asset) = self.pak.get_asset(index, self.registry) else {
                let reason = if self.registry.contains(descriptor.asset_type) {
                    "invalid metadata reference"
                } else {
                    "no registered view"
                };
                report.skipped.push(skipped(index, descriptor.hash, descriptor.asset_type, reason));
                continue;
            };

            if asset.as_post_dumpable().is_some() {
                deferred.push(index);
                continue;
            }
            let Some(dumpable) = asset.as_dumpable() else {
                debug!("Asset {} is not dumpable", hash_to_string(asset.hash()));
                continue;
            };

            let file_name = format!("{}.{}", display_name(asset.as_ref(), names), dumpable.extension());
            let result = dumpable.dump();
            record(&mut report, names, index, asset.hash(), asset.asset_type(), file_name, result)?;
        }

        debug!("Running {} deferred dumps", deferred.len());
        for index in deferred {
            let Some(asset) = self.pak.get_asset(index, self.registry) else {
                continue;
            };
            let Some(post) = asset.as_post_dumpable() else {
                continue;
            };

            let file_name = format!("{}.{}", display_name(asset.as_ref(), names), post.extension());
            let result = post.post_dump(&report.dumped);
            record(&mut report, names, index, asset.hash(), asset.asset_type(), file_name, result)?;
        }

        report.discovered_names = names.len() - known_before;
        info!(
            "Dumped {} assets, skipped {}, discovered {} names",
            report.dumped.len(),
            report.skipped.len(),
            report.discovered_names
        );
        Ok(report)
    }
}

fn skipped(index: usize, hash: u64, asset_type: AssetType, reason: impl Into<String>) -> SkippedAsset {
    let skipped = SkippedAsset {
        index,
        hash: hash_to_string(hash),
        asset_type: asset_type.to_string(),
        reason: reason.into(),
    };
    warn!("Skipping asset {} ({}): {}", skipped.hash, skipped.asset_type, skipped.reason);
    skipped
}

fn record(
    report: &mut DumpReport,
    names: &mut KnownAssets,
    index: usize,
    hash: u64,
    asset_type: AssetType,
    file_name: String,
    result: Result<DumpOutput>,
) -> Result<()> {
    match result {
        Ok(output) => {
            names.extend(output.names.iter().map(String::as_str));
            debug!("Dumped {} ({} bytes)", file_name, output.bytes.len());
            report.dumped.insert(DumpedAsset {
                hash,
                asset_type,
                file_name,
                output,
            });
            Ok(())
        }
        Err(error) if error.is_recoverable() => {
            report.skipped.push(skipped(index, hash, asset_type, error.to_string()));
            Ok(())
        }
        Err(error) => Err(error),
    }
}
