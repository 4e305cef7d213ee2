use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::result_error::AddMsg;
use bon::Builder;
use chrono::{DateTime, TimeDelta, Utc};
use getset::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

/// Skips the run unless `reference` was modified within `lookback`.
///
/// ```yaml
/// change_gate:
///   reference: /opt/vaultwarden/data/db.sqlite3
///   lookback: 1day
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, PartialEq, Eq, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct ChangeGateConfig {
    #[builder(into)]
    reference: PathBuf,
    #[serde(with = "humantime_serde")]
    lookback: Duration,
}

/// True iff `modified` lies in `[now - lookback, now]`, both ends inclusive.
pub fn within_lookback(modified: DateTime<Utc>, now: DateTime<Utc>, lookback: Duration) -> bool {
    let earliest = TimeDelta::from_std(lookback)
        .ok()
        .and_then(|lookback| now.checked_sub_signed(lookback));
    match earliest {
        Some(earliest) => earliest <= modified && modified <= now,
        None => modified <= now,
    }
}

impl ChangeGateConfig {
    /// Reads the reference file's modification time and applies
    /// [`within_lookback`].
    pub fn is_changed(&self, now: DateTime<Utc>) -> Result<bool> {
        let modified = std::fs::metadata(&self.reference)
            .and_then(|md| md.modified())
            .map(DateTime::<Utc>::from)
            .map_err(Error::from)
            .add_msg(format!(
                "Reading modification time of change gate reference {:?} failed",
                self.reference
            ))?;

        let changed = within_lookback(modified, now, self.lookback);
        tracing::info!(
            "Change gate reference {:?} modified {}, lookback {:?}: {}",
            self.reference,
            modified,
            self.lookback,
            if changed { "changed" } else { "unchanged" }
        );
        Ok(changed)
    }
}
