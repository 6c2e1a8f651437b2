//! `status` and `reset`

use crate::pricing::Catalog;
use crate::session::SessionManager;
use crate::Settings;
use anyhow::Result;

/// Print what is known about the saved session and the catalog
pub async fn run_status(settings: Settings) -> Result<()> {
    let products_file = settings.products_file_path();
    let manager = SessionManager::new(settings)?;

    if manager.restore().await {
        let status = manager.status().await;
        println!("Session: saved");
        if let Some(expires) = status.record_expires {
            println!("  expires: {}", expires.format("%Y-%m-%d %H:%M %:z"));
        }
        println!("  cookies: {}", status.cookie_names.join(", "));
    } else {
        println!("Session: none (run `wallapop-adjust login`)");
    }

    match Catalog::load(&products_file).await {
        Ok(catalog) => println!(
            "Products: {} tracked, {} day(s) between changes ({})",
            catalog.products().len(),
            catalog.delay_days(),
            products_file.display()
        ),
        Err(e) => println!("Products: unreadable ({})", e),
    }
    Ok(())
}

/// Forget the saved session
pub async fn run_reset(settings: Settings) -> Result<()> {
    SessionManager::new(settings)?.reset().await?;
    println!("Session cleared.");
    Ok(())
}
