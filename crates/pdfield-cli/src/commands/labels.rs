//! Labels command - show registered labels and their pattern banks.

use clap::Args;
use console::style;

use pdfield_core::{Label, LabelProfile};

use super::load_config;

/// Arguments for the labels command.
#[derive(Args)]
pub struct LabelsArgs {
    /// Show the patterns of one label
    label: Option<String>,
}

pub fn run(args: LabelsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let registry = config.label_registry()?;

    match args.label {
        Some(name) => {
            let label = Label::new(name);
            let profile = registry.get(&label).ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown label: {} (jobs with it go straight to the fallback)",
                    label
                )
            })?;
            print_profile(&label, &profile, true);
        }
        None => {
            for label in registry.labels() {
                if let Some(profile) = registry.get(label) {
                    print_profile(label, &profile, false);
                }
            }
        }
    }

    Ok(())
}

fn print_profile(label: &Label, profile: &LabelProfile, detailed: bool) {
    println!("{}", style(label).bold());
    for rule in profile.bank.rules() {
        let validator = profile
            .validators
            .get(&rule.field)
            .map(|v| format!(", validator {:?}", v))
            .unwrap_or_default();
        println!("  {} ({} patterns{})", rule.field, rule.patterns.len(), validator);

        if detailed {
            for (i, pattern) in rule.patterns.iter().enumerate() {
                println!("    {}. {}", i + 1, pattern.as_str());
            }
        }
    }
}
