//! Oracle database probe.
//!
//! Only compiled in with the `oracle` feature; without it every database probe reports
//! the target as down.

use crate::store::DatabaseTarget;

use super::ProbeError;

/// Whether database probing was compiled in.
pub fn is_available() -> bool {
    cfg!(feature = "oracle")
}

/// Connect to the database, run a trivial query and disconnect.
///
/// Returns the connect time in milliseconds.
#[cfg(feature = "oracle")]
pub async fn run_database_probe(target: &DatabaseTarget) -> Result<f64, ProbeError> {
    let target = target.clone();

    // The Oracle client is blocking
    tokio::task::spawn_blocking(move || connect_and_verify(&target))
        .await
        .map_err(|e| ProbeError::Database(format!("spawn_blocking failed: {}", e)))?
}

#[cfg(feature = "oracle")]
fn connect_and_verify(target: &DatabaseTarget) -> Result<f64, ProbeError> {
    use std::time::Instant;

    let start = Instant::now();
    let conn = oracle::Connection::connect(&target.user, &target.password, target.connect_string())
        .map_err(|e| ProbeError::Database(e.to_string()))?;
    let elapsed = start.elapsed().as_secs_f64() * 1000.0;

    conn.query_row_as::<i64>("SELECT 1 FROM DUAL", &[])
        .map_err(|e| ProbeError::Database(format!("verification query failed: {}", e)))?;
    conn.close()
        .map_err(|e| ProbeError::Database(format!("close failed: {}", e)))?;

    Ok(elapsed)
}

#[cfg(not(feature = "oracle"))]
pub async fn run_database_probe(_target: &DatabaseTarget) -> Result<f64, ProbeError> {
    Err(ProbeError::Unavailable)
}
