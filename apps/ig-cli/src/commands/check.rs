// check.rs - Would navigating to a URL raise the gate?

use ig_host::domain_of;

use crate::config::AppConfig;

pub fn execute(config: &AppConfig, url: &str, domain: Option<&str>) -> anyhow::Result<()> {
    let trigger = super::build_trigger(config)?;
    let domain = domain.map(str::to_string).unwrap_or_else(|| domain_of(url));

    if trigger.should_gate(url, Some(&domain)) {
        println!("GATE    {} ({})", url, domain);
    } else {
        println!("PASS    {} ({})", url, domain);
    }
    Ok(())
}
