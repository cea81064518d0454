//! Deploy harness contracts from compiled JSON artifacts.

use std::path::{Path, PathBuf};

use alloy::primitives::{Address, Bytes, TxKind};
use alloy::providers::Provider;
use alloy::rpc::types::{TransactionInput, TransactionRequest};
use anyhow::{Context, Result};
use tracing::info;

use crate::error::HarnessError;
use crate::evm::{self, OVERRIDE_GAS_PRICE};
use crate::fork::ChainHandle;

pub const TEST_DEFI_ADAPTER: &str = "TestDeFiAdapter";

/// Compiled artifacts under one directory (hardhat `artifacts/` or forge `out/`).
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ArtifactStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Locate `<name>.json` anywhere under the root.
    pub fn find(&self, name: &str) -> Result<PathBuf, HarnessError> {
        let file = format!("{name}.json");
        find_file(&self.root, &file)
            .map_err(|e| HarnessError::Artifact {
                name: name.to_string(),
                reason: format!("reading {}: {e}", self.root.display()),
            })?
            .ok_or_else(|| HarnessError::Artifact {
                name: name.to_string(),
                reason: format!("no {file} under {}", self.root.display()),
            })
    }

    /// Creation bytecode of contract `name`.
    pub fn bytecode(&self, name: &str) -> Result<Bytes, HarnessError> {
        let path = self.find(name)?;
        let artifact_err = |reason: String| HarnessError::Artifact {
            name: name.to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| artifact_err(format!("reading {}: {e}", path.display())))?;
        let json: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| artifact_err(format!("parsing {}: {e}", path.display())))?;
        parse_bytecode(&json).map_err(artifact_err)
    }

    /// Fail early if any of `names` has no usable artifact.
    pub fn require(&self, names: &[&str]) -> Result<(), HarnessError> {
        for name in names {
            self.bytecode(name)?;
        }
        Ok(())
    }
}

/// Bytecode from a hardhat (`"bytecode": "0x…"`) or forge
/// (`"bytecode": {"object": "0x…"}`) artifact.
pub fn parse_bytecode(json: &serde_json::Value) -> Result<Bytes, String> {
    let hex = match &json["bytecode"] {
        serde_json::Value::String(s) => s.as_str(),
        serde_json::Value::Object(obj) => obj
            .get("object")
            .and_then(|o| o.as_str())
            .ok_or("`bytecode.object` missing")?,
        _ => return Err("`bytecode` missing".into()),
    };
    let bytes: Bytes = hex.parse().map_err(|e| format!("invalid bytecode hex: {e}"))?;
    if bytes.is_empty() {
        return Err("bytecode is empty (abstract contract or interface?)".into());
    }
    Ok(bytes)
}

fn find_file(dir: &Path, file: &str) -> std::io::Result<Option<PathBuf>> {
    let mut subdirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if path.file_name().is_some_and(|n| n == file) {
            return Ok(Some(path));
        }
    }
    subdirs.sort();
    for sub in subdirs {
        if let Some(found) = find_file(&sub, file)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Deploy `name` with ABI-encoded `constructor_args`, sent from `deployer`.
pub async fn deploy(
    chain: &ChainHandle,
    store: &ArtifactStore,
    name: &str,
    constructor_args: &[u8],
    deployer: Address,
) -> Result<Address> {
    let mut code = store.bytecode(name)?.to_vec();
    code.extend_from_slice(constructor_args);

    let mut tx = TransactionRequest::default()
        .from(deployer)
        .gas_price(OVERRIDE_GAS_PRICE)
        .input(TransactionInput::both(Bytes::from(code)));
    tx.to = Some(TxKind::Create);

    let label = format!("deploy {name}");
    let pending = chain
        .provider
        .send_transaction(tx)
        .await
        .with_context(|| format!("sending {label}"))?;
    let receipt = evm::confirm(pending, &label).await?;
    let address = receipt
        .contract_address
        .with_context(|| format!("{label}: receipt has no contract address"))?;
    info!(contract = name, address = %address, "deployed");
    Ok(address)
}
