use crate::config::SweeperConfig;
use crate::output;
use crate::sweep::{TriggerSource, sweep_once};
use colored::Colorize;

pub async fn handle(config: &SweeperConfig, json: bool, fail_on_error: bool) -> anyhow::Result<()> {
    if !json {
        println!("{}", "Sweeping stale resources...".blue().bold());
        if let Some(ref source) = config.source {
            println!("Config: {}", source.display().to_string().cyan());
        }
        if config.dry_run {
            println!("{}", "Dry run: nothing will be deleted".yellow());
        }
    }

    let report = sweep_once(config, TriggerSource::Manual).await?;

    if json {
        output::print_json(&report)?;
    } else {
        output::print_report(&report);
    }

    if fail_on_error && !report.is_clean() {
        anyhow::bail!("Sweep finished with failures: {}", report.summary());
    }
    Ok(())
}
