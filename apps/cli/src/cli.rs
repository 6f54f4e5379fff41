//! Command-line surface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stockroom_core::{Barcode, RECENT_LIMIT};

use crate::commands::record::FieldArgs;
use crate::commands::resolve::DecodeMode;

/// Barcode-driven electronic component inventory.
///
/// Barcodes are given in their escaped form: `\x1d` (or `<GS>`) for the
/// group separator, `\\` for a backslash.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// SQLite inventory file
    #[arg(long, global = true, env = "STOCKROOM_DB_PATH")]
    pub db: Option<PathBuf>,

    /// Vendor config file (credentials and tokens)
    #[arg(long, global = true, env = "STOCKROOM_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// How unknown payloads are turned into drafts
    #[arg(long, global = true, value_enum, env = "STOCKROOM_DECODE_MODE", default_value_t = DecodeMode::Local)]
    pub mode: DecodeMode,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Add a record (without a barcode a synthetic id is assigned)
    Add {
        #[arg(long, value_parser = parse_barcode)]
        barcode: Option<Barcode>,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Change fields of a stored record
    Edit {
        #[arg(value_parser = parse_barcode)]
        barcode: Barcode,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Show one record
    Show {
        #[arg(value_parser = parse_barcode)]
        barcode: Barcode,
    },

    /// Delete a record
    Delete {
        #[arg(value_parser = parse_barcode)]
        barcode: Barcode,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Most recently added records
    #[command(alias = "list")]
    Recent {
        #[arg(long, default_value_t = RECENT_LIMIT)]
        limit: u32,
    },

    /// Keyword search across every field (no keyword lists everything)
    Search { keyword: Option<String> },

    /// Field search: FIELD KEYWORD [and|or FIELD KEYWORD]...
    #[command(name = "adv-search")]
    AdvSearch {
        #[arg(required = true, num_args = 2.., trailing_var_arg = true)]
        terms: Vec<String>,
    },

    /// Take parts out of stock
    Checkout {
        #[arg(value_parser = parse_barcode)]
        barcode: Barcode,

        qty: i64,

        /// Project the parts go to
        #[arg(long, default_value = "")]
        project: String,
    },

    /// Return parts to stock
    Checkin {
        #[arg(value_parser = parse_barcode)]
        barcode: Barcode,

        qty: i64,
    },

    /// Look a payload up without saving anything
    Resolve {
        #[arg(value_parser = parse_barcode)]
        barcode: Barcode,
    },

    /// Read payloads from a keyboard-wedge scanner on stdin, or a camera
    Scan {
        /// Save new parts at this location
        #[arg(long)]
        location: Option<String>,

        /// Read from this camera instead of stdin
        #[arg(long, value_name = "INDEX")]
        camera: Option<u32>,

        /// Stop after this many payloads
        #[arg(long, value_name = "N")]
        count: Option<usize>,
    },

    /// Vendor API authorization
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum AuthAction {
    /// Open the consent page and wait for the redirect
    Login,
    /// Show token state
    Status,
    /// Forget stored tokens
    Logout,
}

fn parse_barcode(s: &str) -> Result<Barcode, String> {
    let barcode = Barcode::parse_escaped(s).map_err(|e| e.to_string())?;
    if barcode.is_empty() {
        return Err("barcode must not be empty".to_string());
    }
    Ok(barcode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_escaped_barcode_arg() {
        let cli = Cli::try_parse_from(["stockroom", "show", "[)>\\x1e06\\x1dP1"]).unwrap();
        match cli.command {
            Command::Show { barcode } => assert_eq!(barcode.as_bytes(), b"[)>\x1e06\x1dP1"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(Cli::try_parse_from(["stockroom", "show", ""]).is_err());
    }

    #[test]
    fn test_add_fields_and_mode() {
        let cli = Cli::try_parse_from([
            "stockroom", "--mode", "vendor", "add", "--name", "NE555", "--location", "A1", "--qty", "-1",
        ])
        .unwrap();
        assert_eq!(cli.mode, DecodeMode::Vendor);
        match cli.command {
            Command::Add { barcode, fields } => {
                assert!(barcode.is_none());
                assert_eq!(fields.name.as_deref(), Some("NE555"));
                assert_eq!(fields.quantity, Some(-1));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_adv_search_terms() {
        let cli = Cli::try_parse_from(["stockroom", "adv-search", "name", "cap", "or", "location", "A1"]).unwrap();
        match cli.command {
            Command::AdvSearch { terms } => assert_eq!(terms.len(), 5),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_scan_camera_flags() {
        let cli = Cli::try_parse_from(["stockroom", "scan", "--camera", "1", "--count", "3"]).unwrap();
        match cli.command {
            Command::Scan { location, camera, count } => {
                assert!(location.is_none());
                assert_eq!(camera, Some(1));
                assert_eq!(count, Some(3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
