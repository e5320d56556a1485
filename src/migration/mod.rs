//! Migration files: declarative batches of remote mutations applied once.

pub mod engine;
pub mod error;
pub mod loader;
pub mod record;
pub mod retry;

pub use self::engine::Migrator;
pub use self::error::{MigrationError, MigrationResult};
pub use self::loader::MigrationKind;
pub use self::record::{Migration, MigrationRecord, OperationTag};
pub use self::retry::RetryPolicy;

use anyhow::Result;
use tracing::warn;

use crate::fetch;
use crate::gmail::MailService;
use crate::store::Store;

/// mailtidy migrate [--daily] [--no-refresh]
///
/// Snapshots are refreshed after the run whether or not it succeeded, so the
/// local view reflects whatever was applied before a failure.
pub fn run(
    service: &dyn MailService,
    store: &Store,
    retry: RetryPolicy,
    daily: bool,
    refresh: bool,
) -> Result<()> {
    let kind = if daily {
        MigrationKind::Daily
    } else {
        MigrationKind::OneOff
    };
    let outcome = Migrator::new(service, store, retry).run(kind);

    if refresh {
        println!("Refreshing snapshots...");
        if let Err(e) = fetch::run(service, store, fetch::Target::All) {
            warn!(error = %format_args!("{:#}", e), "snapshot refresh failed");
        }
    }

    match outcome {
        Ok(files) => {
            println!("Applied {} migration file(s).", files.len());
            Ok(())
        }
        Err(MigrationError::NoPendingMigrations) => {
            println!("No pending migrations.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
