//! Inscribing through an external `ord` binary.

use crate::config::Config;
use crate::inscribe::{InscriptionId, InscriptionResult};
use crate::{Error, Result};
use bitcoin::{Address, Txid};
use serde::Deserialize;
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::thread;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<CommandOutput>;
}

pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::Tool(format!("failed to start {}: {e}", program.display())))?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct OrdInscription {
    pub id: InscriptionId,
    #[serde(default)]
    pub location: Option<String>,
}

/// `ord wallet inscribe` stdout. Older releases report a single
/// `inscription`, newer ones a list.
#[derive(Debug, Deserialize)]
pub struct OrdInscribeOutput {
    pub commit: Txid,
    #[serde(default)]
    pub inscription: Option<InscriptionId>,
    #[serde(default)]
    pub inscriptions: Vec<OrdInscription>,
    #[serde(default)]
    pub reveal: Option<Txid>,
    #[serde(default)]
    pub total_fees: Option<u64>,
}

impl OrdInscribeOutput {
    pub fn into_result(self) -> Result<InscriptionResult> {
        let inscription = self
            .inscription
            .or_else(|| self.inscriptions.first().map(|entry| entry.id))
            .ok_or_else(|| Error::Tool("ord reported no inscription".to_string()))?;
        Ok(InscriptionResult {
            commit: self.commit,
            reveal: self.reveal.unwrap_or(inscription.txid),
            inscription,
            total_fee: self.total_fees.unwrap_or_default(),
        })
    }
}

/// ord reports a busy index as "Database already open. Cannot acquire lock."
fn is_lock_contention(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("database already open") || stderr.contains("cannot acquire lock")
}

pub struct OrdTool<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> OrdTool<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    pub fn args(&self, file: &Path, destination: &Address, fee_rate: u64) -> Vec<OsString> {
        let mut args: Vec<OsString> = Vec::new();
        if let Some(flag) = self.config.chain.ord_flag() {
            args.push(flag.into());
        }
        if let Some(dir) = &self.config.btc.bitcoin_data_dir {
            args.push("--bitcoin-data-dir".into());
            args.push(dir.into());
        }
        args.push("--data-dir".into());
        args.push(self.config.ord_data_dir().into());
        args.extend(["wallet", "inscribe", "--fee-rate"].map(OsString::from));
        args.push(fee_rate.to_string().into());
        args.push("--destination".into());
        args.push(destination.to_string().into());
        args.push("--file".into());
        args.push(file.into());
        args.push("--postage".into());
        args.push(format!("{}sat", self.config.policy.dust_limit).into());
        args
    }

    /// Writes `body` to a temporary file and inscribes it to
    /// `destination`. Only lock contention on the tool's database is
    /// retried.
    pub fn inscribe(&self, body: &[u8], destination: &Address, fee_rate: u64) -> Result<InscriptionResult> {
        let mut file = tempfile::Builder::new()
            .prefix("inscription")
            .suffix(".txt")
            .tempfile()?;
        file.write_all(body)?;
        file.flush()?;

        let program = &self.config.btc.ord_path;
        let args = self.args(file.path(), destination, fee_rate);
        let policy = &self.config.policy;

        for attempt in 1..=policy.tool_attempts {
            let output = self.runner.run(program, &args)?;
            if output.success {
                let parsed: OrdInscribeOutput = serde_json::from_str(&output.stdout)
                    .map_err(|e| Error::Tool(format!("unreadable ord output: {e}")))?;
                let result = parsed.into_result()?;
                log::info!("ord inscribed {} for {destination}", result.inscription);
                return Ok(result);
            }
            if !is_lock_contention(&output.stderr) {
                return Err(Error::Tool(output.stderr.trim().to_string()));
            }
            log::warn!(
                "ord database busy, attempt {attempt}/{}: {}",
                policy.tool_attempts,
                output.stderr.trim()
            );
            if attempt < policy.tool_attempts {
                thread::sleep(policy.tool_backoff());
            }
        }

        Err(Error::Tool(format!(
            "ord database still locked after {} attempts",
            policy.tool_attempts
        )))
    }
}
