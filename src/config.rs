use std::{path::PathBuf, time::Duration};

use clap::Parser;

use crate::error::ConfigError;

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Terminal globe quiz: pick countries, then find them on the map"
)]
pub struct Config {
    /// Topology (or GeoJSON) file with a `countries` object
    #[arg(long, default_value = "geodata/110m.json")]
    pub geodata: PathBuf,

    /// Directory holding `{a3}.svg` flag images
    #[arg(long, default_value = "svg_flags")]
    pub flags_dir: PathBuf,

    /// Share of the viewport taken by the larger map dimension
    #[arg(long, default_value_t = 0.9)]
    pub fit_fraction: f64,

    /// Pause after a correct answer before the next round
    #[arg(long, default_value_t = 200)]
    pub advance_delay_ms: u64,

    /// Where tracing output goes; the terminal belongs to the UI
    #[arg(long, default_value = "globe-quiz.log")]
    pub log_file: PathBuf,

    /// Seed for round picking (random when omitted)
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fit_fraction > 0.0 && self.fit_fraction <= 1.0) {
            return Err(ConfigError::FitFraction(self.fit_fraction));
        }
        Ok(())
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::parse_from(["globe-quiz"])
    }
}
