//! Stream receiver list validation.
//!
//! A receiver list is valid iff its entries strictly increase under the
//! `(account_id, config)` order (which also rules out duplicates), every
//! rate is nonzero and at most [`MAX_RATE_PER_SEC`], and the list holds at
//! most [`MAX_STREAMS_RECEIVERS`] entries. Validation never mutates; the
//! commitment hash of a validated list is the sole persisted fingerprint.

use crate::constants::{MAX_RATE_PER_SEC, MAX_STREAMS_RECEIVERS};
use crate::error::ReceiversError;
use crate::types::StreamReceiver;

/// Validate a stream receiver list.
///
/// # Errors
///
/// - [`ReceiversError::TooManyReceivers`] above [`MAX_STREAMS_RECEIVERS`]
/// - [`ReceiversError::ZeroRate`] / [`ReceiversError::RateTooHigh`] for a
///   rate outside `1..=MAX_RATE_PER_SEC`
/// - [`ReceiversError::DuplicateReceiver`] for an exact repeat
/// - [`ReceiversError::NotSorted`] for any other order violation
pub fn validate_stream_receivers(receivers: &[StreamReceiver]) -> Result<(), ReceiversError> {
    if receivers.len() > MAX_STREAMS_RECEIVERS {
        return Err(ReceiversError::TooManyReceivers {
            count: receivers.len(),
            max: MAX_STREAMS_RECEIVERS,
        });
    }
    for (index, receiver) in receivers.iter().enumerate() {
        if receiver.config.rate_per_sec == 0 {
            return Err(ReceiversError::ZeroRate { index });
        }
        if receiver.config.rate_per_sec > MAX_RATE_PER_SEC {
            return Err(ReceiversError::RateTooHigh { index });
        }
        if index > 0 {
            let prev = &receivers[index - 1];
            if prev == receiver {
                return Err(ReceiversError::DuplicateReceiver { index });
            }
            if prev > receiver {
                return Err(ReceiversError::NotSorted { index });
            }
        }
    }
    Ok(())
}
