//! # Cart Recovery Snapshots
//!
//! One JSON file per cashier so a crashed or closed terminal can pick the
//! cart back up at the next sign-in.
//!
//! ```text
//! <data_dir>/recovery/cart_<cashier>.json
//!
//!   mutation ──► save()      (cart, open payment rows, rates)
//!   login    ──► load()      restored only if user_id matches
//!   finalize / logout / timeout ──► discard()
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use barpos_core::{Cart, PaymentRow, RateSettings};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything needed to put a cashier back where they were.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub user_id: String,
    pub cart: Cart,
    /// Present when payment entry was open.
    pub payment_rows: Option<Vec<PaymentRow>>,
    pub rates: RateSettings,
}

/// Snapshot files under one directory.
#[derive(Debug, Clone)]
pub struct RecoveryStore {
    dir: PathBuf,
}

impl RecoveryStore {
    /// Snapshots live in `<data_dir>/recovery`.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        RecoveryStore {
            dir: data_dir.as_ref().join("recovery"),
        }
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        let safe: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("cart_{}.json", safe))
    }

    /// Writes the snapshot, replacing any previous one for the cashier.
    pub fn save(&self, snapshot: &CartSnapshot) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_vec_pretty(snapshot)?;

        // Atomic replace
        let path = self.path_for(&snapshot.user_id);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        debug!(
            user_id = %snapshot.user_id,
            lines = snapshot.cart.line_count(),
            "Cart snapshot saved"
        );
        Ok(())
    }

    /// Reads the cashier's snapshot.
    ///
    /// A snapshot written for a different cashier (same sanitized file
    /// name) is ignored.
    pub fn load(&self, user_id: &str) -> io::Result<Option<CartSnapshot>> {
        let bytes = match fs::read(self.path_for(user_id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let snapshot: CartSnapshot = serde_json::from_slice(&bytes)?;
        if snapshot.user_id != user_id {
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    /// Deletes the cashier's snapshot; missing is fine.
    pub fn discard(&self, user_id: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(user_id)) {
            Ok(()) => {
                debug!(user_id = %user_id, "Cart snapshot discarded");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
