use anyhow::Result;
use lazydb::LazyDbConfig;

use super::OutputFormat;

pub fn run(config: &LazyDbConfig, output_format: OutputFormat) -> Result<()> {
    if !output_format.print_json(config)? {
        println!("{}", config.summary());
    }
    Ok(())
}
