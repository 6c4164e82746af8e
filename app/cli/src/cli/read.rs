use alloy::primitives::Address;
use clap::ValueEnum;
use engine::EthBackfill;
use eyre::{Result, WrapErr};

#[derive(Debug, Clone, ValueEnum)]
pub enum CliBackfill {
    Concurrent,
    Resumable,
}

impl From<CliBackfill> for EthBackfill {
    fn from(value: CliBackfill) -> Self {
        match value {
            CliBackfill::Concurrent => EthBackfill::Concurrent,
            CliBackfill::Resumable => EthBackfill::Resumable,
        }
    }
}

pub fn parse_addresses(input: &str) -> Result<Vec<Address>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<Address>().wrap_err_with(|| format!("Invalid address `{s}`")))
        .collect()
}
