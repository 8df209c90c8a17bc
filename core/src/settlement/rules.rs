//! Validation and authorization predicates.
//!
//! [`validate_call`] checks only the call itself and is shared by the ledger-side
//! reducer and the client-side preflight. The remaining functions are predicates over
//! ledger state used by the reducer.

use crate::error::MarketError;
use crate::model::{
    Event, EventDraft, MAX_PLATFORM_FEE_BPS, MAX_RESALE_MARKUP_BPS, MAX_ROYALTY_BPS,
};
use crate::settlement::call::{LedgerCall, MinterScope};
use crate::settlement::state::SettlementState;
use crate::types::{Address, Wei};

/// Stateless checks on event parameters.
///
/// # Errors
///
/// `InvalidFingerprint`, `InvalidSupply`, `RoyaltyTooHigh`, `MarkupTooHigh` or
/// `InvalidAddress` (zero artist).
pub fn validate_event_draft(draft: &EventDraft) -> Result<(), MarketError> {
    if draft.fingerprint.is_zero() {
        return Err(MarketError::InvalidFingerprint);
    }
    if draft.max_supply == 0 {
        return Err(MarketError::InvalidSupply);
    }
    if draft.royalty_bps > MAX_ROYALTY_BPS {
        return Err(MarketError::RoyaltyTooHigh {
            royalty_bps: draft.royalty_bps,
        });
    }
    if draft.max_resale_markup_bps > MAX_RESALE_MARKUP_BPS {
        return Err(MarketError::MarkupTooHigh {
            markup_bps: draft.max_resale_markup_bps,
        });
    }
    require_account(draft.artist)
}

/// Stateless checks on any call.
///
/// # Errors
///
/// The validation-class [`MarketError`] describing the first malformed argument.
pub fn validate_call(call: &LedgerCall) -> Result<(), MarketError> {
    match call {
        LedgerCall::CreateEvent(draft) => validate_event_draft(draft),
        LedgerCall::SetMinter { minter, .. } => require_account(*minter),
        LedgerCall::MintTicket { to, seat_id, .. } => {
            require_account(*to)?;
            if seat_id.is_blank() {
                return Err(MarketError::InvalidSeat);
            }
            Ok(())
        }
        LedgerCall::Approve { operator, .. } => match operator {
            Some(operator) => require_account(*operator),
            None => Ok(()),
        },
        LedgerCall::TransferTicket { to, .. } => require_account(*to),
        LedgerCall::CreateListing { price, .. } => {
            if price.is_zero() {
                return Err(MarketError::InvalidPrice);
            }
            Ok(())
        }
        LedgerCall::SetPlatformFee { fee_bps } => {
            if *fee_bps > MAX_PLATFORM_FEE_BPS {
                return Err(MarketError::FeeTooHigh { fee_bps: *fee_bps });
            }
            Ok(())
        }
        LedgerCall::SetPlatformAddress { address } => require_account(*address),
        LedgerCall::PurchaseListing { .. }
        | LedgerCall::CancelListing { .. }
        | LedgerCall::PauseEvent { .. }
        | LedgerCall::UnpauseEvent { .. }
        | LedgerCall::SetTransfersPaused { .. }
        | LedgerCall::SetMarketplacePaused { .. }
        | LedgerCall::MarkUsed { .. }
        | LedgerCall::RevokeTicket { .. } => Ok(()),
    }
}

fn require_account(address: Address) -> Result<(), MarketError> {
    if address.is_zero() {
        Err(MarketError::InvalidAddress)
    } else {
        Ok(())
    }
}

/// Contract owner only.
#[must_use]
pub fn is_owner(state: &SettlementState, caller: Address) -> bool {
    caller == state.owner
}

/// Organizer of the event or contract owner.
#[must_use]
pub fn is_event_authority(state: &SettlementState, event: &Event, caller: Address) -> bool {
    caller == event.organizer || is_owner(state, caller)
}

/// Contract owner, event organizer, global minter or event minter.
#[must_use]
pub fn can_mint(state: &SettlementState, event: &Event, caller: Address) -> bool {
    is_event_authority(state, event, caller) || state.is_minter(event.id, caller)
}

/// Who may change a minter grant of the given scope.
///
/// # Errors
///
/// `NotOwner` for global grants, `EventDoesNotExist` or `NotEventAuthority` for
/// event-scoped ones.
pub fn authorize_minter_admin(
    state: &SettlementState,
    scope: MinterScope,
    caller: Address,
) -> Result<(), MarketError> {
    match scope {
        MinterScope::Global => {
            if is_owner(state, caller) {
                Ok(())
            } else {
                Err(MarketError::NotOwner)
            }
        }
        MinterScope::Event(event_id) => {
            let event = state
                .event(event_id)
                .ok_or(MarketError::EventDoesNotExist { event_id })?;
            if is_event_authority(state, event, caller) {
                Ok(())
            } else {
                Err(MarketError::NotEventAuthority { event_id })
            }
        }
    }
}

/// Payment must cover the price.
///
/// # Errors
///
/// `InsufficientPayment` when `payment < price`.
pub fn require_payment(price: Wei, payment: Wei) -> Result<(), MarketError> {
    if payment < price {
        Err(MarketError::InsufficientPayment { price, payment })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Bps, EventId, Fingerprint, SeatId};

    fn draft() -> EventDraft {
        EventDraft {
            fingerprint: Fingerprint::from_bytes([9; 32]),
            max_supply: 100,
            royalty_bps: Bps::new(500),
            max_resale_markup_bps: Bps::new(1000),
            artist: Address::from_low_u64(2),
            issue_price: Wei::new(100),
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert_eq!(validate_event_draft(&draft()), Ok(()));
    }

    #[test]
    fn test_draft_rejections() {
        let mut zero_fingerprint = draft();
        zero_fingerprint.fingerprint = Fingerprint::ZERO;
        assert_eq!(
            validate_event_draft(&zero_fingerprint),
            Err(MarketError::InvalidFingerprint)
        );

        let mut no_supply = draft();
        no_supply.max_supply = 0;
        assert_eq!(
            validate_event_draft(&no_supply),
            Err(MarketError::InvalidSupply)
        );

        let mut greedy = draft();
        greedy.royalty_bps = Bps::new(1001);
        assert_eq!(
            validate_event_draft(&greedy),
            Err(MarketError::RoyaltyTooHigh {
                royalty_bps: Bps::new(1001)
            })
        );

        let mut at_limit = draft();
        at_limit.royalty_bps = Bps::new(1000);
        at_limit.max_resale_markup_bps = Bps::new(10_000);
        assert_eq!(validate_event_draft(&at_limit), Ok(()));

        let mut markup = draft();
        markup.max_resale_markup_bps = Bps::new(10_001);
        assert!(matches!(
            validate_event_draft(&markup),
            Err(MarketError::MarkupTooHigh { .. })
        ));
    }

    #[test]
    fn test_mint_arguments() {
        let call = LedgerCall::MintTicket {
            event_id: EventId::new(1),
            to: Address::ZERO,
            seat_id: SeatId::new("A1"),
            metadata: None,
        };
        assert_eq!(validate_call(&call), Err(MarketError::InvalidAddress));

        let call = LedgerCall::MintTicket {
            event_id: EventId::new(1),
            to: Address::from_low_u64(3),
            seat_id: SeatId::new("  "),
            metadata: None,
        };
        assert_eq!(validate_call(&call), Err(MarketError::InvalidSeat));
    }

    #[test]
    fn test_platform_fee_limit() {
        let ok = LedgerCall::SetPlatformFee {
            fee_bps: Bps::new(500),
        };
        let too_high = LedgerCall::SetPlatformFee {
            fee_bps: Bps::new(501),
        };
        assert_eq!(validate_call(&ok), Ok(()));
        assert!(matches!(
            validate_call(&too_high),
            Err(MarketError::FeeTooHigh { .. })
        ));
    }

    #[test]
    fn test_zero_price_listing_rejected() {
        let call = LedgerCall::CreateListing {
            ticket_id: crate::types::TicketId::new(1),
            price: Wei::ZERO,
        };
        assert_eq!(validate_call(&call), Err(MarketError::InvalidPrice));
    }

    #[test]
    fn test_payment_boundary() {
        assert_eq!(require_payment(Wei::new(110), Wei::new(110)), Ok(()));
        assert!(require_payment(Wei::new(110), Wei::new(109)).is_err());
    }
}
