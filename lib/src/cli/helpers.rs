// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::path::Path;

use log::debug;
use serde::{de::DeserializeOwned, Serialize};

use mwa::proto::methods::AppIdentity;

/// dApp identity arguments
#[derive(Clone, PartialEq, Debug, clap::Args)]
pub struct Identity {
    /// dApp name presented by the wallet
    #[clap(long)]
    pub name: Option<String>,

    /// dApp identity URI (absolute, https)
    #[clap(long)]
    pub uri: Option<String>,

    /// dApp icon path (relative to the identity URI)
    #[clap(long)]
    pub icon: Option<String>,
}

impl Identity {
    /// Build an app identity, `None` where no fields are provided
    pub fn app_identity(self) -> Option<AppIdentity> {
        if self.name.is_none() && self.uri.is_none() && self.icon.is_none() {
            return None;
        }

        Some(AppIdentity {
            uri: self.uri,
            icon: self.icon,
            name: self.name,
        })
    }
}

/// Helper to read input files where required
pub async fn read_input<T: DeserializeOwned>(file_name: &str) -> anyhow::Result<T> {
    debug!("Reading input from '{}'", file_name);

    let s = tokio::fs::read_to_string(file_name).await?;

    // Determine format from file name
    let p = Path::new(file_name);

    let v = match p.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&s)?,
        _ => return Err(anyhow::anyhow!("unsupported input file format")),
    };

    Ok(v)
}

/// Helper to write output files if `--output` argument is provided,
/// otherwise outputs are printed
pub async fn write_output(file_name: Option<&str>, value: &impl Serialize) -> anyhow::Result<()> {
    let file_name = match file_name {
        Some(f) => f,
        None => {
            println!("{}", serde_json::to_string_pretty(value)?);
            return Ok(());
        }
    };

    debug!("Writing output to '{}'", file_name);

    let p = Path::new(file_name);
    match p.extension().and_then(|e| e.to_str()) {
        Some("json") => {
            let s = serde_json::to_string(value)?;
            tokio::fs::write(p, s).await?;
        }
        _ => return Err(anyhow::anyhow!("unsupported output file format")),
    }

    Ok(())
}
