//! `waypost config` — print the effective configuration.

use waypost_config::AppConfig;

pub fn run(default: bool) -> anyhow::Result<()> {
    if default {
        println!("{}", AppConfig::default_toml());
        return Ok(());
    }

    let config = AppConfig::load()?;
    // Debug impl redacts secrets
    println!("{config:#?}");
    Ok(())
}
