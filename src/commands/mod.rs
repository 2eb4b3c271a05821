pub mod backtest;
pub mod optimize;

use anyhow::{Context, Result};
use ewma_crossover::{data, Config, PriceSeries};

/// Resolve config file + CLI overrides into loaded inputs shared by both
/// commands: the price series and the optional aligned macro signals.
pub fn load_inputs(
    config: &Config,
    data_override: Option<String>,
    macro_override: Option<String>,
) -> Result<(PriceSeries, Option<Vec<i8>>)> {
    let price_path = data_override.unwrap_or_else(|| config.data.price_csv.clone());
    let series = data::load_price_csv(&price_path)
        .with_context(|| format!("Failed to load price data from {}", price_path))?;

    let macro_path = macro_override.or_else(|| config.data.macro_csv.clone());
    let macro_signals =
        macro_path.map(|path| data::load_aligned_macro(&path, &series));

    Ok((series, macro_signals))
}

/// Load the config file when given, defaults otherwise
pub fn load_config(path: Option<String>) -> Result<Config> {
    match path {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path)),
        None => Ok(Config::default()),
    }
}
