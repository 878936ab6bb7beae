//! Async wrappers that move tree walks off the async executor.
//!
//! A full scan or approval hashes every file in the deployment. Running it
//! inline on a tokio worker would stall every other task on that worker, so
//! these helpers hand the work to the blocking pool.

use crate::context::{ActorContext, RequestContext};
use crate::error::GuardError;
use crate::orchestrator::{ApprovalReceipt, IntegrityOrchestrator, ScanReport};
use crate::Result;
use std::sync::Arc;
use tracing::error;

/// Runs [`IntegrityOrchestrator::scan`] on the blocking pool.
pub async fn scan(guard: Arc<IntegrityOrchestrator>, actor: ActorContext) -> Result<ScanReport> {
    tokio::task::spawn_blocking(move || guard.scan(&actor))
        .await
        .map_err(|e| GuardError::Internal(format!("scan task failed: {}", e)))?
}

/// Runs [`IntegrityOrchestrator::approve`] on the blocking pool.
pub async fn approve(
    guard: Arc<IntegrityOrchestrator>,
    actor: ActorContext,
) -> Result<ApprovalReceipt> {
    tokio::task::spawn_blocking(move || guard.approve(&actor))
        .await
        .map_err(|e| GuardError::Internal(format!("approve task failed: {}", e)))?
}

/// Runs [`IntegrityOrchestrator::verify`] on the blocking pool.
///
/// A failed task counts as a failed verification.
pub async fn verify(guard: Arc<IntegrityOrchestrator>) -> bool {
    match tokio::task::spawn_blocking(move || guard.verify()).await {
        Ok(passed) => passed,
        Err(e) => {
            error!(error = %e, "Verification task failed");
            false
        }
    }
}

/// Runs the request gate on the blocking pool, for async servers that do not
/// want to hash files on a worker thread.
pub async fn validate(guard: Arc<IntegrityOrchestrator>, request: RequestContext) -> bool {
    match tokio::task::spawn_blocking(move || guard.validate_source_integrity(&request)).await {
        Ok(passed) => passed,
        Err(e) => {
            error!(error = %e, "Gate task failed");
            false
        }
    }
}
