//! Booking status transitions and who may perform them.
//!
//! ```text
//! pending -> confirmed -> in_progress -> completed -> paid
//!    |           +---------------------------^
//!    +--> rejected
//! ```
//!
//! Every non-terminal state may also move to `cancelled`.

use crate::models::{Booking, BookingStatus};

/// The role a caller plays on one specific booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingParty {
    Customer,
    Provider,
    /// Settlement notifications from the payment processor.
    PaymentGateway,
}

impl BookingParty {
    /// Resolves a caller to their role on `booking`, or `None` for outsiders.
    pub fn of(booking: &Booking, user_id: &str) -> Option<Self> {
        if booking.provider_id == user_id {
            Some(BookingParty::Provider)
        } else if booking.user_id == user_id {
            Some(BookingParty::Customer)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingParty::Customer => "customer",
            BookingParty::Provider => "provider",
            BookingParty::PaymentGateway => "payment gateway",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("cannot change booking from {from} to {to}")]
    Invalid { from: BookingStatus, to: BookingStatus },

    #[error("only the {} may change this booking from {from} to {to}", allowed_label(.from, .to))]
    NotPermitted {
        party: BookingParty,
        from: BookingStatus,
        to: BookingStatus,
    },
}

/// Parties allowed to move a booking along `from → to`; empty when the edge does not exist.
pub fn allowed_parties(from: BookingStatus, to: BookingStatus) -> &'static [BookingParty] {
    use BookingParty::*;
    use BookingStatus::*;

    match (from, to) {
        (Pending, Confirmed) | (Pending, Rejected) => &[Provider],
        (Confirmed, InProgress) => &[Provider],
        (Confirmed, Completed) | (InProgress, Completed) => &[Provider],
        (Completed, Paid) => &[Customer, PaymentGateway],
        (from, Cancelled) if !from.is_terminal() => &[Customer, Provider],
        _ => &[],
    }
}

pub fn authorize_transition(
    from: BookingStatus,
    to: BookingStatus,
    party: BookingParty,
) -> Result<(), TransitionError> {
    let allowed = allowed_parties(from, to);
    if allowed.is_empty() {
        return Err(TransitionError::Invalid { from, to });
    }
    if !allowed.contains(&party) {
        return Err(TransitionError::NotPermitted { party, from, to });
    }
    Ok(())
}

fn allowed_label(from: &BookingStatus, to: &BookingStatus) -> &'static str {
    match allowed_parties(*from, *to) {
        [BookingParty::Provider] => "provider",
        [BookingParty::Customer, BookingParty::PaymentGateway] => "customer",
        _ => "customer or provider",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingParty::*;
    use BookingStatus::*;

    const PARTIES: [BookingParty; 3] = [Customer, Provider, PaymentGateway];

    /// Every permitted (from, to, party) triple, written out by hand.
    const PERMITTED: &[(BookingStatus, BookingStatus, BookingParty)] = &[
        (Pending, Confirmed, Provider),
        (Pending, Rejected, Provider),
        (Confirmed, InProgress, Provider),
        (Confirmed, Completed, Provider),
        (InProgress, Completed, Provider),
        (Completed, Paid, Customer),
        (Completed, Paid, PaymentGateway),
        (Pending, Cancelled, Customer),
        (Pending, Cancelled, Provider),
        (Confirmed, Cancelled, Customer),
        (Confirmed, Cancelled, Provider),
        (InProgress, Cancelled, Customer),
        (InProgress, Cancelled, Provider),
        (Completed, Cancelled, Customer),
        (Completed, Cancelled, Provider),
    ];

    #[test]
    fn test_guard_matches_table_exhaustively() {
        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                for party in PARTIES {
                    let expected = PERMITTED.contains(&(from, to, party));
                    let result = authorize_transition(from, to, party);
                    assert_eq!(
                        result.is_ok(),
                        expected,
                        "{from} -> {to} by {party:?}: got {result:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_missing_edge_is_invalid_not_forbidden() {
        assert_eq!(
            authorize_transition(Pending, Completed, Provider),
            Err(TransitionError::Invalid { from: Pending, to: Completed })
        );
        assert_eq!(
            authorize_transition(Pending, Pending, Provider),
            Err(TransitionError::Invalid { from: Pending, to: Pending })
        );
    }

    #[test]
    fn test_wrong_party_is_forbidden() {
        let err = authorize_transition(Pending, Confirmed, Customer).unwrap_err();
        assert!(matches!(err, TransitionError::NotPermitted { party: Customer, .. }));
        assert_eq!(
            err.to_string(),
            "only the provider may change this booking from pending to confirmed"
        );

        let err = authorize_transition(Completed, Paid, Provider).unwrap_err();
        assert!(matches!(err, TransitionError::NotPermitted { .. }));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Rejected, Paid, Cancelled] {
            for to in BookingStatus::ALL {
                assert!(allowed_parties(from, to).is_empty(), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_gateway_only_settles_payment() {
        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                let ok = authorize_transition(from, to, PaymentGateway).is_ok();
                assert_eq!(ok, (from, to) == (Completed, Paid));
            }
        }
    }
}
