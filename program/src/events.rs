// VRF Lottery Program - Events
use std::fmt;

use solana_program::{msg, pubkey::Pubkey};

/// Observable lottery events, logged in the order they happen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LotteryEvent {
    /// A participant entered the current round
    EntryRecorded { participant: Pubkey },
    /// Randomness was requested from the coordinator
    RequestedLotteryWinner { request_id: u64 },
    /// The round was resolved and the pot paid out
    WinnerPicked { winner: Pubkey },
}

impl LotteryEvent {
    /// Write the event to the program log
    pub fn emit(&self) {
        msg!("{}", self);
    }
}

impl fmt::Display for LotteryEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LotteryEvent::EntryRecorded { participant } => {
                write!(f, "EntryRecorded: {}", participant)
            }
            LotteryEvent::RequestedLotteryWinner { request_id } => {
                write!(f, "RequestedLotteryWinner: {}", request_id)
            }
            LotteryEvent::WinnerPicked { winner } => write!(f, "WinnerPicked: {}", winner),
        }
    }
}
