// VRF Lottery Program - Lottery state machine
//
// Pure transitions over `Lottery`. The outside world is reached only through
// `RandomnessCoordinator` and `PrizeTransfer`, so every transition can be
// driven without a runtime.
use solana_program::{clock::UnixTimestamp, msg, program_error::ProgramError, pubkey::Pubkey};

use crate::{
    coordinator::RandomnessRequest,
    error::LotteryError,
    events::LotteryEvent,
    state::{Lottery, LotteryConfig, LotteryState},
};

/// Outbound half of the request/fulfill protocol
pub trait RandomnessCoordinator {
    /// Submit a request and return the id the fulfillment will carry
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError>;
}

/// Moves the pot to the winner
pub trait PrizeTransfer {
    fn transfer_prize(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError>;
}

impl Lottery {
    /// Record one entry for `participant` paying `amount` lamports.
    pub fn enter(
        &mut self,
        config: &LotteryConfig,
        participant: Pubkey,
        amount: u64,
    ) -> Result<LotteryEvent, LotteryError> {
        if amount < config.entrance_fee {
            return Err(LotteryError::NotEnoughEntered);
        }
        if self.state != LotteryState::Open {
            return Err(LotteryError::NotOpen);
        }
        if self.players.len() >= config.max_players as usize {
            return Err(LotteryError::LotteryFull);
        }
        let pot = self.pot.checked_add(amount).ok_or(LotteryError::Overflow)?;

        self.players.push(participant);
        self.pot = pot;
        Ok(LotteryEvent::EntryRecorded { participant })
    }

    /// Whether a draw may start at `now`. Never mutates.
    pub fn check_upkeep(&self, config: &LotteryConfig, now: UnixTimestamp) -> bool {
        let is_open = self.state == LotteryState::Open;
        let time_passed = now.saturating_sub(self.last_timestamp) > config.interval;
        let has_players = !self.players.is_empty();
        let has_balance = self.pot > 0;
        is_open && time_passed && has_players && has_balance
    }

    /// Close the round and ask the coordinator for randomness.
    pub fn perform_upkeep<C: RandomnessCoordinator>(
        &mut self,
        config: &LotteryConfig,
        now: UnixTimestamp,
        coordinator: &mut C,
    ) -> Result<LotteryEvent, LotteryError> {
        if !self.check_upkeep(config, now) {
            return Err(LotteryError::UpkeepNotNeeded {
                pot: self.pot,
                num_players: self.players.len() as u64,
                state: self.state,
            });
        }

        self.state = LotteryState::Calculating;
        let request_id = match coordinator.request_random_words(&RandomnessRequest::from(config)) {
            Ok(request_id) => request_id,
            Err(err) => {
                msg!("Randomness request rejected: {}", err);
                self.state = LotteryState::Open;
                return Err(LotteryError::RandomnessRequestFailed(err));
            }
        };
        self.pending_request = Some(request_id);

        Ok(LotteryEvent::RequestedLotteryWinner { request_id })
    }

    /// Player that `random_word` selects from the current entries.
    pub fn winner_for(&self, random_word: u64) -> Option<Pubkey> {
        let index = random_word.checked_rem(self.players.len() as u64)?;
        self.players.get(index as usize).copied()
    }

    /// Resolve the outstanding request: pick, pay and reset.
    ///
    /// The payout is part of the transition. If it fails, the lottery is
    /// restored to exactly what it was before the call, still calculating
    /// and still holding the same request, players and pot.
    pub fn fulfill_random_words<P: PrizeTransfer>(
        &mut self,
        request_id: u64,
        random_words: &[u64],
        now: UnixTimestamp,
        payout: &mut P,
    ) -> Result<LotteryEvent, LotteryError> {
        if self.pending_request != Some(request_id) {
            return Err(LotteryError::NonexistentRequest);
        }
        let random_word = *random_words.first().ok_or(LotteryError::NoRandomWords)?;
        let winner = self
            .winner_for(random_word)
            .ok_or(LotteryError::TransferFailed)?;

        let snapshot = self.clone();
        let prize = self.pot;

        self.recent_winner = Some(winner);
        self.players.clear();
        self.pot = 0;
        self.last_timestamp = now;
        self.state = LotteryState::Open;
        self.pending_request = None;

        if let Err(err) = payout.transfer_prize(&winner, prize) {
            msg!("Prize transfer to {} failed: {}", winner, err);
            *self = snapshot;
            return Err(LotteryError::TransferFailed);
        }

        Ok(LotteryEvent::WinnerPicked { winner })
    }
}
