//! Bounded retry
//!
//! Opening a controller (or a file) can fail transiently. Instead of an open coded loop at every
//! call site, the operation is passed to [`retry`] along with the number of attempts it gets.

use core::num::NonZeroUsize;

/// The default number of attempts made to open a resource
pub const DEFAULT_ATTEMPTS: NonZeroUsize = match NonZeroUsize::new(5) {
    Some(attempts) => attempts,
    None => unreachable!(),
};

/// Run `operation` until it succeeds or `attempts` runs out
///
/// The input to `operation` is the attempt number, starting at zero. The return is the output of
/// the first successful attempt, or the error of the last attempt when every attempt failed.
///
/// ```
/// # use core::num::NonZeroUsize;
/// use lbeacon_tag::retry::retry;
///
/// let result: Result<usize, &str> = retry(NonZeroUsize::new(3).unwrap(), |attempt| {
///     if attempt < 2 { Err("not yet") } else { Ok(attempt) }
/// });
///
/// assert_eq!(result, Ok(2));
/// ```
pub fn retry<T, E, F>(attempts: NonZeroUsize, mut operation: F) -> Result<T, E>
where
    F: FnMut(usize) -> Result<T, E>,
    E: core::fmt::Display,
{
    let last = attempts.get() - 1;

    let mut attempt = 0;

    loop {
        match operation(attempt) {
            Ok(t) => break Ok(t),
            Err(e) if attempt == last => break Err(e),
            Err(e) => log::debug!("attempt {} of {} failed: {}", attempt + 1, attempts, e),
        }

        attempt += 1;
    }
}
