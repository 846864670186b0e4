use crate::brc20::{self, InscribeVia};
use crate::config::{Config, UtxoSourceKind};
use crate::indexer::{
    self, BisClient, ElectrumProxy, EsploraClient, OpiClient, RuneOutpointSource,
};
use crate::keys::{parse_address, parse_private_key, Sender};
use crate::options::Options;
use crate::ord_tool::{OrdTool, ProcessRunner};
use crate::rpc::BitcoindClient;
use crate::runes::{self, RunesDepositRequest};
use crate::utxo::UtxoSource;
use crate::wallet::Wallet;
use crate::{btc, Error};
use anyhow::{anyhow, Result};
use bitcoin::{Address, Txid};
use clap::{Args, Subcommand as ClapSubcommand, ValueEnum};
use ordinals::RuneId;
use serde::Serialize;
use std::cell::OnceCell;

#[derive(ClapSubcommand, Debug, Clone)]
pub enum Subcommand {
    #[clap(subcommand, about = "Plain bitcoin transfers")]
    Btc(BtcCommand),
    #[clap(subcommand, about = "BRC-20 inscriptions and transfers")]
    Brc20(Brc20Command),
    #[clap(subcommand, about = "Runes mints, transfers and verification")]
    Runes(RunesCommand),
}

#[derive(Args, Debug, Clone)]
pub struct KeyArgs {
    #[clap(long, help = "Sender address")]
    pub address: String,
    #[clap(long, help = "Sender private key, WIF or 64 hex characters")]
    pub private_key: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct InscribeArgs {
    #[clap(flatten)]
    pub key: KeyArgs,
    #[clap(long, help = "Inscribe through the ord wallet instead of the sender's key")]
    pub ord: bool,
}

#[derive(ClapSubcommand, Debug, Clone)]
pub enum BtcCommand {
    Send {
        #[clap(flatten)]
        key: KeyArgs,
        #[clap(long)]
        to: String,
        #[clap(long, help = "Amount in sats")]
        amount: u64,
    },
    Utxos {
        #[clap(long)]
        address: String,
    },
}

#[derive(ClapSubcommand, Debug, Clone)]
pub enum Brc20Command {
    Deploy {
        #[clap(flatten)]
        inscribe: InscribeArgs,
        #[clap(long)]
        tick: String,
        #[clap(long)]
        max: String,
        #[clap(long)]
        lim: Option<String>,
    },
    Mint {
        #[clap(flatten)]
        inscribe: InscribeArgs,
        #[clap(long)]
        tick: String,
        #[clap(long)]
        amt: String,
    },
    InscribeTransfer {
        #[clap(flatten)]
        inscribe: InscribeArgs,
        #[clap(long)]
        tick: String,
        #[clap(long)]
        amt: String,
    },
    Transfer {
        #[clap(flatten)]
        key: KeyArgs,
        #[clap(long, help = "Inscription id, <txid>i<index>")]
        inscription: String,
        #[clap(long)]
        to: String,
    },
    Send {
        #[clap(flatten)]
        inscribe: InscribeArgs,
        #[clap(long)]
        tick: String,
        #[clap(long)]
        amt: String,
        #[clap(long)]
        to: String,
    },
    Balance {
        #[clap(long)]
        address: String,
        #[clap(long)]
        tick: String,
    },
    Verify {
        #[clap(long)]
        inscription: String,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum RuneIndexer {
    #[default]
    Opi,
    Bis,
}

#[derive(ClapSubcommand, Debug, Clone)]
pub enum RunesCommand {
    Mint {
        #[clap(flatten)]
        key: KeyArgs,
        #[clap(long, help = "Rune id, <block>:<tx>")]
        rune: RuneId,
    },
    Transfer {
        #[clap(flatten)]
        key: KeyArgs,
        #[clap(long)]
        rune: RuneId,
        #[clap(long)]
        amount: u128,
        #[clap(long)]
        to: String,
        #[clap(long, value_enum, default_value_t, help = "Where rune outputs are listed from")]
        indexer: RuneIndexer,
    },
    Split {
        #[clap(flatten)]
        key: KeyArgs,
        #[clap(long)]
        count: u32,
        #[clap(long, help = "Value of each output in sats")]
        value: u64,
    },
    Balance {
        #[clap(long)]
        address: String,
    },
    Decode {
        #[clap(long)]
        txid: Txid,
    },
    Verify {
        #[clap(long)]
        txid: Txid,
        #[clap(long, help = "Ask the indexer for the sender and receiver instead")]
        events: bool,
        #[clap(long, required_unless_present = "events")]
        from: Option<String>,
        #[clap(long, required_unless_present = "events")]
        to: Option<String>,
        #[clap(long, required_unless_present = "events")]
        rune: Option<RuneId>,
        #[clap(long, required_unless_present = "events")]
        amount: Option<u128>,
    },
}

/// Node and UTXO clients are only built for commands that touch them, so
/// indexer queries work without a reachable node.
struct Context {
    config: Config,
    node: OnceCell<BitcoindClient>,
    utxos: OnceCell<Box<dyn UtxoSource>>,
    fee_rate: Option<u64>,
}

impl Context {
    fn new(options: &Options) -> Result<Self> {
        Ok(Self {
            config: options.load_config()?,
            node: OnceCell::new(),
            utxos: OnceCell::new(),
            fee_rate: options.fee_rate,
        })
    }

    fn node(&self) -> Result<&BitcoindClient> {
        if let Some(node) = self.node.get() {
            return Ok(node);
        }
        let node = BitcoindClient::new(&self.config)?;
        Ok(self.node.get_or_init(|| node))
    }

    fn utxos(&self) -> Result<&dyn UtxoSource> {
        if let Some(utxos) = self.utxos.get() {
            return Ok(utxos.as_ref());
        }
        let utxos: Box<dyn UtxoSource> = match self.config.btc.utxo_source {
            UtxoSourceKind::Node => Box::new(BitcoindClient::new(&self.config)?),
            UtxoSourceKind::Electrum => Box::new(ElectrumProxy::new(
                &self.config.btc,
                self.config.chain.network(),
            )?),
            UtxoSourceKind::Esplora => Box::new(EsploraClient::new(&self.config.btc)?),
        };
        Ok(self.utxos.get_or_init(|| utxos).as_ref())
    }

    fn wallet(&self) -> Result<Wallet<'_>> {
        Ok(Wallet::new(&self.config, self.node()?, self.utxos()?))
    }

    fn fee_rate(&self) -> Result<u64> {
        match self.fee_rate {
            Some(rate) => Ok(rate),
            None => Ok(indexer::fastest_fee_rate(&self.config.btc)?),
        }
    }

    fn address(&self, address: &str) -> Result<Address> {
        Ok(parse_address(address, self.config.chain.network())?)
    }

    /// Makes the node report outputs of `address` when it is the UTXO source.
    fn watch(&self, address: &Address) -> Result<()> {
        if self.config.btc.utxo_source == UtxoSourceKind::Node {
            let node = self.node()?;
            node.ensure_wallet()?;
            node.import_address(address)?;
        }
        Ok(())
    }

    fn sender(&self, key: &KeyArgs) -> Result<Sender> {
        let private_key = key
            .private_key
            .as_deref()
            .ok_or_else(|| anyhow!("--private-key is required"))?;
        let network = self.config.chain.network();
        let sender = Sender::new(
            parse_private_key(private_key, network)?,
            self.address(&key.address)?,
        )?;
        self.watch(sender.address())?;
        Ok(sender)
    }
}

fn print(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct TxidOutput {
    txid: Txid,
}

fn inscribe_brc20(
    context: &Context,
    args: &InscribeArgs,
    operation: &brc20::Brc20Operation,
) -> Result<()> {
    let wallet = context.wallet()?;
    let fee_rate = context.fee_rate()?;
    let runner = ProcessRunner;
    let result = if args.ord {
        let receiver = context.address(&args.key.address)?;
        let tool = OrdTool::new(&context.config, &runner);
        brc20::inscribe(&wallet, &InscribeVia::Tool(&tool), operation, &receiver, fee_rate)?
    } else {
        let sender = context.sender(&args.key)?;
        brc20::inscribe(
            &wallet,
            &InscribeVia::Native(&sender),
            operation,
            sender.address(),
            fee_rate,
        )?
    };
    print(&result)
}

impl BtcCommand {
    fn run(self, context: &Context) -> Result<()> {
        match self {
            BtcCommand::Send { key, to, amount } => {
                let sender = context.sender(&key)?;
                let to = context.address(&to)?;
                let txid = btc::send(&context.wallet()?, &sender, &to, amount, context.fee_rate()?)?;
                print(&TxidOutput { txid })
            }
            BtcCommand::Utxos { address } => {
                let address = context.address(&address)?;
                context.watch(&address)?;
                print(&context.wallet()?.unspent(&address)?)
            }
        }
    }
}

impl Brc20Command {
    fn run(self, context: &Context) -> Result<()> {
        match self {
            Brc20Command::Deploy {
                inscribe,
                tick,
                max,
                lim,
            } => inscribe_brc20(
                context,
                &inscribe,
                &brc20::deploy_payload(&tick, &max, lim.as_deref())?,
            ),
            Brc20Command::Mint {
                inscribe,
                tick,
                amt,
            } => inscribe_brc20(context, &inscribe, &brc20::mint_payload(&tick, &amt)?),
            Brc20Command::InscribeTransfer {
                inscribe,
                tick,
                amt,
            } => inscribe_brc20(context, &inscribe, &brc20::transfer_payload(&tick, &amt)?),
            Brc20Command::Transfer {
                key,
                inscription,
                to,
            } => {
                let sender = context.sender(&key)?;
                let txid = brc20::transfer_inscription(
                    &context.wallet()?,
                    &sender,
                    inscription.parse()?,
                    &context.address(&to)?,
                    context.fee_rate()?,
                )?;
                print(&TxidOutput { txid })
            }
            Brc20Command::Send {
                inscribe,
                tick,
                amt,
                to,
            } => {
                let sender = context.sender(&inscribe.key)?;
                let runner = ProcessRunner;
                let tool = OrdTool::new(&context.config, &runner);
                let via = if inscribe.ord {
                    InscribeVia::Tool(&tool)
                } else {
                    InscribeVia::Native(&sender)
                };
                let sent = brc20::send(
                    &context.wallet()?,
                    &via,
                    &sender,
                    &tick,
                    &amt,
                    &context.address(&to)?,
                    context.fee_rate()?,
                )?;
                print(&sent)
            }
            Brc20Command::Balance { address, tick } => {
                let opi = OpiClient::new(&context.config.opi)?;
                print(&opi.brc20_balance(&context.address(&address)?, &tick)?)
            }
            Brc20Command::Verify { inscription } => {
                let opi = OpiClient::new(&context.config.opi)?;
                print(&brc20::verify_deposit(&opi, &inscription)?)
            }
        }
    }
}

impl RunesCommand {
    fn run(self, context: &Context) -> Result<()> {
        match self {
            RunesCommand::Mint { key, rune } => {
                let sender = context.sender(&key)?;
                let txid = runes::mint(&context.wallet()?, &sender, rune, context.fee_rate()?)?;
                print(&TxidOutput { txid })
            }
            RunesCommand::Transfer {
                key,
                rune,
                amount,
                to,
                indexer,
            } => {
                let sender = context.sender(&key)?;
                let source: Box<dyn RuneOutpointSource + '_> = match indexer {
                    RuneIndexer::Opi => Box::new(OpiClient::new(&context.config.opi)?),
                    RuneIndexer::Bis => Box::new(BisClient::new(&context.config.bis)?),
                };
                let txid = runes::transfer(
                    &context.wallet()?,
                    source.as_ref(),
                    &sender,
                    rune,
                    amount,
                    &context.address(&to)?,
                    context.fee_rate()?,
                )?;
                print(&TxidOutput { txid })
            }
            RunesCommand::Split { key, count, value } => {
                let sender = context.sender(&key)?;
                let txid =
                    runes::split(&context.wallet()?, &sender, count, value, context.fee_rate()?)?;
                print(&TxidOutput { txid })
            }
            RunesCommand::Balance { address } => {
                let opi = OpiClient::new(&context.config.opi)?;
                print(&opi.runes_balance(&context.address(&address)?)?)
            }
            RunesCommand::Decode { txid } => print(&runes::decode(context.node()?, &txid)?),
            RunesCommand::Verify {
                txid,
                events: true,
                ..
            } => {
                let opi = OpiClient::new(&context.config.opi)?;
                print(&runes::verify_deposit_events(&opi, &txid)?)
            }
            RunesCommand::Verify {
                txid,
                from,
                to,
                rune,
                amount,
                ..
            } => {
                let missing = || Error::input("--from, --to, --rune and --amount are required");
                let request = RunesDepositRequest {
                    txid,
                    from: context.address(&from.ok_or_else(missing)?)?,
                    to: context.address(&to.ok_or_else(missing)?)?,
                    rune: rune.ok_or_else(missing)?,
                    amount: amount.ok_or_else(missing)?,
                };
                print(&runes::verify_deposit(context.node()?, &request)?)
            }
        }
    }
}

impl Subcommand {
    pub fn run(self, options: &Options) -> Result<()> {
        let context = Context::new(options)?;
        match self {
            Subcommand::Btc(command) => command.run(&context),
            Subcommand::Brc20(command) => command.run(&context),
            Subcommand::Runes(command) => command.run(&context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn options(dir: &tempfile::TempDir, args: &[&str]) -> Options {
        let path = dir.path().join("config.json");
        let cookie = dir.path().join("missing.cookie");
        std::fs::write(
            &path,
            serde_json::json!({ "btc": { "cookie_path": cookie } }).to_string(),
        )
        .unwrap();
        let config = path.to_str().unwrap().to_string();
        let mut argv = vec!["tokenwallet", "--config", config.as_str()];
        argv.extend_from_slice(args);
        Options::parse_from(argv)
    }

    #[test]
    fn indexer_commands_do_not_need_a_node() {
        let dir = tempfile::tempdir().unwrap();
        let options = options(&dir, &["brc20", "verify", "--inscription", "x"]);
        let context = Context::new(&options).unwrap();
        assert!(context.node.get().is_none());
        assert!(context.utxos.get().is_none());
        assert!(context.node().is_err());
    }
}
