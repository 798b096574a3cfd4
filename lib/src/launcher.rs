// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Platform launchers

use async_trait::async_trait;
use log::{debug, info};
use tokio::process::Command;
use url::Url;

use mwa_proto::AssociationUri;

use crate::association::{LaunchError, Launcher};

/// Intent resolution failure reported by the activity manager
const ADB_NOT_FOUND: &str = "unable to resolve Intent";

/// Launcher logging association URIs, for manual launch or QR display
#[derive(Clone, Debug, Default)]
pub struct LogLauncher;

#[async_trait]
impl Launcher for LogLauncher {
    async fn launch(&self, uri: &Url) -> Result<(), LaunchError> {
        info!("association uri: {}", uri);
        Ok(())
    }
}

/// Launcher for wallets on an attached android device, forwarding the
/// loopback port and dispatching a VIEW intent via `adb`
#[derive(Clone, Debug)]
pub struct AdbLauncher {
    adb: String,
    serial: Option<String>,
}

impl Default for AdbLauncher {
    fn default() -> Self {
        Self {
            adb: "adb".to_string(),
            serial: None,
        }
    }
}

impl AdbLauncher {
    /// Create an adb launcher, optionally targeting a specific device
    pub fn new(adb: &str, serial: Option<String>) -> Self {
        Self {
            adb: adb.to_string(),
            serial,
        }
    }

    async fn adb(&self, args: &[&str]) -> Result<String, LaunchError> {
        let mut cmd = Command::new(&self.adb);
        if let Some(s) = &self.serial {
            cmd.args(["-s", s]);
        }

        debug!("adb {}", args.join(" "));

        let out = cmd
            .args(args)
            .output()
            .await
            .map_err(|e| LaunchError::Failed(format!("adb: {e}")))?;

        let mut text = String::from_utf8_lossy(&out.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&out.stderr));

        if !out.status.success() {
            return Err(LaunchError::Failed(text.trim().to_string()));
        }

        Ok(text)
    }
}

#[async_trait]
impl Launcher for AdbLauncher {
    async fn launch(&self, uri: &Url) -> Result<(), LaunchError> {
        // Local associations need the wallet port reachable from the host
        if let Ok(AssociationUri::Local { port, .. }) = AssociationUri::parse(uri) {
            let p = format!("tcp:{port}");
            self.adb(&["forward", &p, &p]).await?;
        }

        let out = self
            .adb(&[
                "shell",
                "am",
                "start",
                "-a",
                "android.intent.action.VIEW",
                "-c",
                "android.intent.category.BROWSABLE",
                "-d",
                &format!("'{uri}'"),
            ])
            .await?;

        match out.contains(ADB_NOT_FOUND) {
            true => Err(LaunchError::NotFound),
            false => Ok(()),
        }
    }
}
