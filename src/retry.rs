/*!
 * Generic retry policy.
 *
 * A policy is a maximum attempt count plus a backoff function. Operations
 * are retried while their error says it is retryable; an acceptance check
 * runs on every successful result and may turn it into a retryable error
 * (undersized audio, a transcript in the wrong language).
 */

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use log::debug;

/// Implemented by error types that know whether another attempt can help
pub trait Retryable {
    /// Whether the failed operation should be attempted again
    fn is_retryable(&self) -> bool;
}

/// Delay schedule between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Retry immediately
    None,
    /// `min(base * 2^(attempt - 1), max)`
    Exponential {
        /// Delay after the first failed attempt
        base: Duration,
        /// Upper bound for any single delay
        max: Duration,
    },
}

impl Backoff {
    /// Delay to wait after the given (1-based) failed attempt
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::None => Duration::ZERO,
            Backoff::Exponential { base, max } => {
                let exponent = attempt.saturating_sub(1).min(31);
                let factor = 2u32.pow(exponent);
                base.checked_mul(factor).unwrap_or(max).min(max)
            }
        }
    }
}

/// Why a retried operation gave up
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last: E,
    },
    /// An attempt failed with an error that must not be retried
    Fatal {
        /// Attempt that failed
        attempt: u32,
        /// The error
        error: E,
    },
}

impl<E> RetryError<E> {
    /// The underlying error, whichever way the policy gave up
    pub fn into_inner(self) -> E {
        match self {
            RetryError::Exhausted { last, .. } => last,
            RetryError::Fatal { error, .. } => error,
        }
    }

    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } => *attempts,
            RetryError::Fatal { attempt, .. } => *attempt,
        }
    }
}

/// Attempt budget plus backoff schedule
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, at least one is always made
    pub max_attempts: u32,
    /// Delay schedule between attempts
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self { max_attempts, backoff }
    }

    /// A single attempt plus exactly one corrective retry, no delay
    pub fn single_correction() -> Self {
        Self::new(2, Backoff::None)
    }

    /// Run `operation` until it succeeds and passes `accept`, or the budget runs out.
    ///
    /// The operation receives the 1-based attempt number and the error of the
    /// previous attempt, so a retry can adjust its inputs (the corrective
    /// transcription pass switches language this way).
    pub async fn run<T, E, F, Fut, A>(&self, mut operation: F, mut accept: A) -> Result<T, RetryError<E>>
    where
        E: Retryable + Display,
        F: FnMut(u32, Option<&E>) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        A: FnMut(T) -> Result<T, E>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut previous: Option<E> = None;
        let mut attempt = 1;

        loop {
            let result = operation(attempt, previous.as_ref()).await.and_then(&mut accept);

            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) if !error.is_retryable() => {
                    return Err(RetryError::Fatal { attempt, error });
                }
                Err(error) => error,
            };

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted { attempts: attempt, last: error });
            }

            let delay = self.backoff.delay(attempt);
            debug!("Attempt {}/{} failed: {}. Retrying in {:?}", attempt, max_attempts, error, delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            previous = Some(error);
            attempt += 1;
        }
    }
}
