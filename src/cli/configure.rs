//! `configure`: edit per-product adjustments and the update delay

use super::prompt;
use crate::pricing::Catalog;
use crate::types::Adjustment;
use crate::Settings;
use anyhow::Result;
use std::io::{BufRead, Write};

/// Interactive catalog editor on the terminal
pub async fn run_configure(settings: Settings) -> Result<()> {
    let mut catalog = Catalog::load(settings.products_file_path()).await?;
    if catalog.products().is_empty() {
        println!("No products tracked yet; run `wallapop-adjust run` once to fetch your listings.");
        return Ok(());
    }

    {
        let stdin = std::io::stdin();
        edit_catalog(&mut catalog, &mut stdin.lock(), &mut std::io::stdout())?;
    }
    catalog.save().await?;
    println!("Configuration saved to {}", catalog.path().display());
    Ok(())
}

/// Walk every product, then the delay setting
///
/// An empty answer keeps the current value; invalid answers are asked again.
pub fn edit_catalog<R: BufRead, W: Write>(catalog: &mut Catalog, input: &mut R, output: &mut W) -> Result<()> {
    writeln!(output, "Adjustment: `keep` or a multiplier such as 0.95 (5% cheaper).")?;

    let entries: Vec<(String, String, f64, Adjustment)> = catalog
        .products()
        .iter()
        .map(|(id, config)| (id.clone(), config.name.clone(), config.current_price, config.adjustment))
        .collect();

    for (id, name, price, current) in entries {
        writeln!(output, "\n{} ({:.2})", name, price)?;
        loop {
            let Some(answer) = prompt(input, output, &format!("Adjustment [{}]: ", current))? else {
                return Ok(());
            };
            if answer.is_empty() {
                break;
            }
            match answer.parse::<Adjustment>() {
                Ok(adjustment) => {
                    catalog.set_adjustment(&id, adjustment)?;
                    break;
                }
                Err(e) => writeln!(output, "{}", e)?,
            }
        }
    }

    loop {
        let question = format!("\nDays between price changes [{}]: ", catalog.delay_days());
        let Some(answer) = prompt(input, output, &question)? else {
            return Ok(());
        };
        if answer.is_empty() {
            break;
        }
        match answer.parse::<u32>() {
            Ok(days) => {
                catalog.set_delay_days(days);
                break;
            }
            Err(_) => writeln!(output, "Enter a whole number of days.")?,
        }
    }
    Ok(())
}
