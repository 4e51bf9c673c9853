// VRF Lottery Program - Errors
use solana_program::{
    decode_error::DecodeError,
    msg,
    program_error::{PrintProgramError, ProgramError},
};
use thiserror::Error;

use crate::state::LotteryState;

/// Errors that may be returned by the lottery program
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LotteryError {
    /// Entry paid less than the entrance fee
    #[error("Not enough lamports entered")]
    NotEnoughEntered,

    /// Entry attempted while a winner is being calculated
    #[error("Lottery is not open")]
    NotOpen,

    /// Upkeep was performed while the readiness check is false
    #[error("Upkeep not needed (pot: {pot}, players: {num_players}, state: {state:?})")]
    UpkeepNotNeeded {
        pot: u64,
        num_players: u64,
        state: LotteryState,
    },

    /// Fulfillment does not match the outstanding request
    #[error("Nonexistent request")]
    NonexistentRequest,

    /// Paying the winner failed, the resolution was rolled back
    #[error("Transfer to winner failed")]
    TransferFailed,

    /// Fulfillment was not signed by the coordinator authority
    #[error("Only the coordinator can fulfill requests")]
    OnlyCoordinatorCanFulfill,

    /// The lottery account has no room for another entry
    #[error("Lottery is full")]
    LotteryFull,

    /// Fulfillment carried no random words
    #[error("No random words supplied")]
    NoRandomWords,

    /// Initialization parameters are out of range
    #[error("Invalid lottery configuration")]
    InvalidConfig,

    /// The coordinator did not answer with a request id
    #[error("Invalid coordinator response")]
    InvalidCoordinatorResponse,

    /// Pot arithmetic overflowed
    #[error("Arithmetic overflow")]
    Overflow,

    /// Initialize was not signed by the program's upgrade authority
    #[error("Signer is not the program upgrade authority")]
    Unauthorized,

    /// The coordinator rejected the randomness request
    #[error("Randomness request failed: {0}")]
    RandomnessRequestFailed(ProgramError),
}

impl LotteryError {
    /// Custom program error code reported for this error. Coordinator
    /// failures keep the coordinator's own error and have none.
    pub fn code(&self) -> Option<u32> {
        let code = match self {
            LotteryError::NotEnoughEntered => 0,
            LotteryError::NotOpen => 1,
            LotteryError::UpkeepNotNeeded { .. } => 2,
            LotteryError::NonexistentRequest => 3,
            LotteryError::TransferFailed => 4,
            LotteryError::OnlyCoordinatorCanFulfill => 5,
            LotteryError::LotteryFull => 6,
            LotteryError::NoRandomWords => 7,
            LotteryError::InvalidConfig => 8,
            LotteryError::InvalidCoordinatorResponse => 9,
            LotteryError::Overflow => 10,
            LotteryError::Unauthorized => 11,
            LotteryError::RandomnessRequestFailed(_) => return None,
        };
        Some(code)
    }
}

impl From<LotteryError> for ProgramError {
    fn from(e: LotteryError) -> Self {
        match (e.code(), e) {
            (Some(code), _) => ProgramError::Custom(code),
            // the coordinator's own error is surfaced unchanged
            (None, LotteryError::RandomnessRequestFailed(inner)) => inner,
            (None, _) => ProgramError::InvalidArgument,
        }
    }
}

impl<T> DecodeError<T> for LotteryError {
    fn type_of() -> &'static str {
        "Lottery Error"
    }
}

impl PrintProgramError for LotteryError {
    fn print<E>(&self) {
        msg!("{}", self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_codes_are_stable() {
        assert_eq!(
            ProgramError::from(LotteryError::NotEnoughEntered),
            ProgramError::Custom(0)
        );
        assert_eq!(
            ProgramError::from(LotteryError::UpkeepNotNeeded {
                pot: 0,
                num_players: 0,
                state: LotteryState::Open,
            }),
            ProgramError::Custom(2)
        );
        assert_eq!(
            ProgramError::from(LotteryError::TransferFailed),
            ProgramError::Custom(4)
        );
    }

    #[test]
    fn coordinator_errors_pass_through() {
        let err = LotteryError::RandomnessRequestFailed(ProgramError::InsufficientFunds);
        assert_eq!(err.code(), None);
        assert_eq!(ProgramError::from(err), ProgramError::InsufficientFunds);
    }

    #[test]
    fn every_own_error_has_a_distinct_code() {
        let errors = [
            LotteryError::NotEnoughEntered,
            LotteryError::NotOpen,
            LotteryError::UpkeepNotNeeded {
                pot: 0,
                num_players: 0,
                state: LotteryState::Calculating,
            },
            LotteryError::NonexistentRequest,
            LotteryError::TransferFailed,
            LotteryError::OnlyCoordinatorCanFulfill,
            LotteryError::LotteryFull,
            LotteryError::NoRandomWords,
            LotteryError::InvalidConfig,
            LotteryError::InvalidCoordinatorResponse,
            LotteryError::Overflow,
            LotteryError::Unauthorized,
        ];
        for (expected, err) in errors.iter().enumerate() {
            assert_eq!(err.code(), Some(expected as u32));
        }
        assert_eq!(
            <LotteryError as DecodeError<LotteryError>>::type_of(),
            "Lottery Error"
        );
    }
}
