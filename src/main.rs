use anyhow::Result;
use clap::Parser;
use tokenwallet::logging;
use tokenwallet::options::Options;

fn main() -> Result<()> {
    logging::init();
    let options = Options::parse();
    let subcommand = options.subcommand.clone();
    subcommand.run(&options)
}
