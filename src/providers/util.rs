use crate::core::FetchError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Why [`with_rotation`] gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationFailure {
    pub attempts: usize,
    pub last: FetchError,
}

/// Retries an async operation, moving to the next pool slot after every failure
///
/// # Parameters
/// - `operation`: Closure receiving the pool index to use and returning a future
/// - `start`: Pool index of the first attempt
/// - `pool_size`: Number of slots to rotate through
/// - `attempts`: Total number of runs allowed
/// - `delay`: Pause between a failed run and the next one
///
/// # Returns
/// The index that succeeded with its value, or the last error once the budget is
/// spent. Errors that are not retryable end the loop immediately.
pub async fn with_rotation<F, Fut, T>(
    mut operation: F,
    start: usize,
    pool_size: usize,
    attempts: usize,
    delay: Duration,
) -> Result<(usize, T), RotationFailure>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    if pool_size == 0 || attempts == 0 {
        return Err(RotationFailure {
            attempts: 0,
            last: FetchError::NoCredentials,
        });
    }

    let mut index = start % pool_size;
    let mut attempt = 1;
    loop {
        match operation(index).await {
            Ok(val) => return Ok((index, val)),
            Err(err) => {
                if attempt >= attempts || !err.is_retryable() {
                    return Err(RotationFailure {
                        attempts: attempt,
                        last: err,
                    });
                }
                warn!(
                    "Attempt {}/{} with credential #{} failed: {}. Rotating...",
                    attempt, attempts, index, err
                );
                index = (index + 1) % pool_size;
                attempt += 1;
                if !delay.is_zero() {
                    debug!("Backing off for {:?}", delay);
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
