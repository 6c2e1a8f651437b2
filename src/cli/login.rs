//! `login`: capture the browser identity cookies and persist the session

use super::prompt;
use crate::session::cookies::{CSRF_TOKEN, SESSION_TOKEN};
use crate::session::{CookieGuide, SessionManager};
use crate::{Error, Settings};
use anyhow::Result;
use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::info;

/// Steps shown before asking for the cookie values
pub const INSTRUCTIONS: &str = "\
To connect your account:
  1. Log in at https://es.wallapop.com in your usual browser.
  2. Open the developer tools and find the site's cookies
     (Chrome: Application > Cookies, Firefox: Storage > Cookies).
  3. Copy the values of the two cookies requested below.
";

/// Run the login flow
///
/// A saved session that still authenticates is kept. Otherwise cookies come
/// from `cookies_file` or are asked for on the terminal, then validated,
/// tested against the backend and saved.
pub async fn run_login(settings: Settings, cookies_file: Option<&Path>) -> Result<()> {
    let manager = SessionManager::new(settings)?;

    if cookies_file.is_none() && manager.restore().await {
        match manager.refresh_access_token().await {
            Ok(_) => {
                println!("Existing session is still valid.");
                return Ok(());
            }
            Err(e) => info!("Saved session no longer authenticates: {}", e),
        }
    }

    let raw = match cookies_file {
        Some(path) => CookieGuide::read_cookie_file(path).await?,
        None => {
            let stdin = std::io::stdin();
            prompt_for_cookies(&mut stdin.lock(), &mut std::io::stdout())?
        }
    };

    let guide = CookieGuide::new(&manager);
    if !guide.validate(&raw) {
        return Err(Error::invalid_cookies(format!("both {} and {} are required", SESSION_TOKEN, CSRF_TOKEN)).into());
    }

    println!("Checking cookies against the backend...");
    if !guide.test_session(&raw).await {
        return Err(Error::token_unavailable("exchange (cookie check)").into());
    }

    let expires = guide.persist(&raw).await?;
    println!("Session saved; it expires on {}.", expires.format("%Y-%m-%d %H:%M %:z"));
    Ok(())
}

/// Ask for the session and CSRF cookie values
pub fn prompt_for_cookies<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<HashMap<String, String>> {
    writeln!(output, "{}", INSTRUCTIONS)?;

    let mut raw = HashMap::new();
    for name in [SESSION_TOKEN, CSRF_TOKEN] {
        let value = prompt(input, output, &format!("{}: ", name))?.unwrap_or_default();
        raw.insert(name.to_string(), value);
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_prompt_for_cookies() {
        let mut input = Cursor::new("session-value\n \"csrf-value\" \n");
        let mut output = Vec::new();

        let raw = prompt_for_cookies(&mut input, &mut output).unwrap();

        assert_eq!(raw.get(SESSION_TOKEN).unwrap(), "session-value");
        assert_eq!(raw.get(CSRF_TOKEN).unwrap(), "\"csrf-value\"");
        let shown = String::from_utf8(output).unwrap();
        assert!(shown.contains("developer tools"));
        assert!(shown.contains(CSRF_TOKEN));
    }

    #[test]
    fn test_prompt_for_cookies_at_end_of_input() {
        let mut input = Cursor::new("");
        let raw = prompt_for_cookies(&mut input, &mut Vec::new()).unwrap();
        assert_eq!(raw.get(SESSION_TOKEN).unwrap(), "");
    }
}
