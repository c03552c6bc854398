use std::path::PathBuf;

use chrono::{DateTime, TimeZone};
use tokio::io::AsyncWriteExt;

use crate::error::Result;

/// Append-only text file with one human readable timestamp per click.
#[derive(Clone, Debug)]
pub struct ClickAudit {
    path: PathBuf,
}

impl ClickAudit {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub async fn record<Tz>(&self, at: DateTime<Tz>) -> Result<()>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(audit_line(&at).as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

fn audit_line<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("{}\n", at.format("%Y-%m-%d %H:%M:%S"))
}
