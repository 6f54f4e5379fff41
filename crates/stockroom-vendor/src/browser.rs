//! Opening the consent page.

use std::process::Command;
use tracing::info;

use crate::error::{VendorError, VendorResult};

/// Sends the user to a URL.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self, url: &str) -> VendorResult<()>;
}

/// The desktop's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> VendorResult<()> {
        info!(url = %url, "Opening consent page in browser");

        let (program, args) = launch_argv(std::env::consts::OS, url);
        Command::new(program)
            .args(&args)
            .spawn()
            .map(|_| ())
            .map_err(|e| VendorError::BrowserLaunch(format!("{}: {}", program, e)))
    }
}

/// Program and arguments that open `url` on `os`.
///
/// The URL is always a single argument. On Windows it goes to the URL
/// protocol handler directly, since `cmd /C start` would split it at `&`.
fn launch_argv<'a>(os: &str, url: &'a str) -> (&'static str, Vec<&'a str>) {
    match os {
        "windows" => ("rundll32", vec!["url.dll,FileProtocolHandler", url]),
        "macos" => ("open", vec![url]),
        _ => ("xdg-open", vec![url]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONSENT: &str =
        "https://api.digikey.com/v1/oauth2/authorize?response_type=code&client_id=abc&redirect_uri=https%3A%2F%2F127.0.0.1%3A4443";

    #[test]
    fn test_windows_passes_whole_url() {
        let (program, args) = launch_argv("windows", CONSENT);
        assert_eq!(program, "rundll32");
        assert_eq!(args, vec!["url.dll,FileProtocolHandler", CONSENT]);
    }

    #[test]
    fn test_unix_launchers() {
        assert_eq!(launch_argv("macos", CONSENT), ("open", vec![CONSENT]));
        assert_eq!(launch_argv("linux", CONSENT), ("xdg-open", vec![CONSENT]));
        assert_eq!(launch_argv("freebsd", CONSENT), ("xdg-open", vec![CONSENT]));
    }
}
