use clap::Parser;
use inventory_cli::{service_management, Cli};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    service_management::start(&cli)?;
    inventory_cli::execute(&cli)
}
