// VRF Lottery Program - State
use arrayref::{array_mut_ref, array_ref, array_refs, mut_array_refs};
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    clock::UnixTimestamp,
    program_error::ProgramError,
    program_pack::{IsInitialized, Pack, Sealed},
    pubkey::{Pubkey, PUBKEY_BYTES},
};

/// Seed of the config PDA
pub const CONFIG_SEED: &[u8] = b"config";
/// Seed of the lottery PDA
pub const LOTTERY_SEED: &[u8] = b"lottery";
/// Block confirmations the coordinator waits for before answering
pub const REQUEST_CONFIRMATIONS: u16 = 3;
/// Random words requested per draw
pub const NUM_WORDS: u32 = 1;

/// Status of the lottery
#[derive(BorshSerialize, BorshDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LotteryState {
    /// Accepting entries
    Open,
    /// Waiting for the coordinator to deliver randomness
    Calculating,
}

/// Immutable lottery parameters, written once by `Initialize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotteryConfig {
    /// Is the account initialized
    pub is_initialized: bool,
    /// Program that randomness requests are sent to
    pub coordinator_program: Pubkey,
    /// Only key allowed to deliver fulfillments
    pub coordinator_authority: Pubkey,
    /// Minimum payment for one entry, in lamports
    pub entrance_fee: u64,
    /// Seconds that must pass between draws
    pub interval: UnixTimestamp,
    /// Oracle route (key hash) the request is priced against
    pub key_hash: [u8; 32],
    /// Coordinator subscription paying for requests
    pub subscription_id: u64,
    /// Compute budget granted to the fulfillment
    pub callback_gas_limit: u32,
    /// Confirmations requested from the coordinator
    pub request_confirmations: u16,
    /// Capacity of the lottery account
    pub max_players: u32,
}

impl LotteryConfig {
    pub fn entrance_fee(&self) -> u64 {
        self.entrance_fee
    }

    pub fn interval(&self) -> UnixTimestamp {
        self.interval
    }
}

impl Sealed for LotteryConfig {}

impl IsInitialized for LotteryConfig {
    fn is_initialized(&self) -> bool {
        self.is_initialized
    }
}

impl Pack for LotteryConfig {
    const LEN: usize = 1 + 32 + 32 + 8 + 8 + 32 + 8 + 4 + 2 + 4;

    fn unpack_from_slice(src: &[u8]) -> Result<Self, ProgramError> {
        let src = array_ref![src, 0, LotteryConfig::LEN];
        let (
            is_initialized,
            coordinator_program,
            coordinator_authority,
            entrance_fee,
            interval,
            key_hash,
            subscription_id,
            callback_gas_limit,
            request_confirmations,
            max_players,
        ) = array_refs![src, 1, 32, 32, 8, 8, 32, 8, 4, 2, 4];

        let is_initialized = match is_initialized {
            [0] => false,
            [1] => true,
            _ => return Err(ProgramError::InvalidAccountData),
        };

        Ok(LotteryConfig {
            is_initialized,
            coordinator_program: Pubkey::new_from_array(*coordinator_program),
            coordinator_authority: Pubkey::new_from_array(*coordinator_authority),
            entrance_fee: u64::from_le_bytes(*entrance_fee),
            interval: UnixTimestamp::from_le_bytes(*interval),
            key_hash: *key_hash,
            subscription_id: u64::from_le_bytes(*subscription_id),
            callback_gas_limit: u32::from_le_bytes(*callback_gas_limit),
            request_confirmations: u16::from_le_bytes(*request_confirmations),
            max_players: u32::from_le_bytes(*max_players),
        })
    }

    fn pack_into_slice(&self, dst: &mut [u8]) {
        let dst = array_mut_ref![dst, 0, LotteryConfig::LEN];
        let (
            is_initialized_dst,
            coordinator_program_dst,
            coordinator_authority_dst,
            entrance_fee_dst,
            interval_dst,
            key_hash_dst,
            subscription_id_dst,
            callback_gas_limit_dst,
            request_confirmations_dst,
            max_players_dst,
        ) = mut_array_refs![dst, 1, 32, 32, 8, 8, 32, 8, 4, 2, 4];

        is_initialized_dst[0] = self.is_initialized as u8;
        coordinator_program_dst.copy_from_slice(self.coordinator_program.as_ref());
        coordinator_authority_dst.copy_from_slice(self.coordinator_authority.as_ref());
        *entrance_fee_dst = self.entrance_fee.to_le_bytes();
        *interval_dst = self.interval.to_le_bytes();
        key_hash_dst.copy_from_slice(&self.key_hash);
        *subscription_id_dst = self.subscription_id.to_le_bytes();
        *callback_gas_limit_dst = self.callback_gas_limit.to_le_bytes();
        *request_confirmations_dst = self.request_confirmations.to_le_bytes();
        *max_players_dst = self.max_players.to_le_bytes();
    }
}

/// Mutable lottery account, lives in the lottery PDA together with the pot
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Eq)]
pub struct Lottery {
    /// Is the lottery initialized
    pub is_initialized: bool,
    /// Bump of the lottery PDA
    pub bump: u8,
    /// Current status
    pub state: LotteryState,
    /// Entrants in submission order, one element per entry
    pub players: Vec<Pubkey>,
    /// Lamports collected this round, excluding rent
    pub pot: u64,
    /// Outstanding randomness request, set only while calculating
    pub pending_request: Option<u64>,
    /// Start of the current round
    pub last_timestamp: UnixTimestamp,
    /// Winner of the previous round
    pub recent_winner: Option<Pubkey>,
}

impl Lottery {
    /// Create an open lottery whose first round starts at `now`
    pub fn new(bump: u8, now: UnixTimestamp) -> Self {
        Self {
            is_initialized: true,
            bump,
            state: LotteryState::Open,
            players: Vec::new(),
            pot: 0,
            pending_request: None,
            last_timestamp: now,
            recent_winner: None,
        }
    }

    /// Account size needed to hold `max_players` entries
    pub fn space(max_players: u32) -> usize {
        1 // is_initialized
            + 1 // bump
            + 1 // state
            + 4 + PUBKEY_BYTES * max_players as usize // players
            + 8 // pot
            + 1 + 8 // pending_request
            + 8 // last_timestamp
            + 1 + PUBKEY_BYTES // recent_winner
    }

    pub fn lottery_state(&self) -> LotteryState {
        self.state
    }

    pub fn player(&self, index: usize) -> Option<&Pubkey> {
        self.players.get(index)
    }

    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    pub fn recent_winner(&self) -> Option<&Pubkey> {
        self.recent_winner.as_ref()
    }

    pub fn last_timestamp(&self) -> UnixTimestamp {
        self.last_timestamp
    }

    pub fn pot(&self) -> u64 {
        self.pot
    }

    pub fn pending_request(&self) -> Option<u64> {
        self.pending_request
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> LotteryConfig {
        LotteryConfig {
            is_initialized: true,
            coordinator_program: Pubkey::new_unique(),
            coordinator_authority: Pubkey::new_unique(),
            entrance_fee: 10_000_000,
            interval: 30,
            key_hash: [7u8; 32],
            subscription_id: 8378,
            callback_gas_limit: 500_000,
            request_confirmations: REQUEST_CONFIRMATIONS,
            max_players: 16,
        }
    }

    #[test]
    fn config_packs_into_fixed_len() {
        let config = test_config();
        let mut data = vec![0u8; LotteryConfig::LEN];
        LotteryConfig::pack(config, &mut data).unwrap();

        let unpacked = LotteryConfig::unpack(&data).unwrap();
        assert_eq!(unpacked, config);
        assert_eq!(unpacked.entrance_fee(), 10_000_000);
        assert_eq!(unpacked.interval(), 30);
    }

    #[test]
    fn zeroed_config_is_uninitialized() {
        let data = vec![0u8; LotteryConfig::LEN];
        assert_eq!(
            LotteryConfig::unpack(&data),
            Err(ProgramError::UninitializedAccount)
        );
    }

    #[test]
    fn full_lottery_fits_its_space() {
        let max_players = 8;
        let mut lottery = Lottery::new(254, 1_700_000_000);
        lottery.players = (0..max_players).map(|_| Pubkey::new_unique()).collect();
        lottery.pot = u64::MAX;
        lottery.state = LotteryState::Calculating;
        lottery.pending_request = Some(42);
        lottery.recent_winner = Some(Pubkey::new_unique());

        let bytes = lottery.try_to_vec().unwrap();
        assert_eq!(bytes.len(), Lottery::space(max_players));

        // accounts are allocated at full size, trailing bytes stay zero
        let mut data = vec![0u8; Lottery::space(max_players + 4)];
        lottery.serialize(&mut &mut data[..]).unwrap();
        let decoded = Lottery::deserialize(&mut &data[..]).unwrap();
        assert_eq!(decoded, lottery);
    }

    #[test]
    fn accessors_read_without_mutation() {
        let first = Pubkey::new_unique();
        let mut lottery = Lottery::new(255, 100);
        lottery.players.push(first);
        lottery.players.push(first);

        assert_eq!(lottery.lottery_state(), LotteryState::Open);
        assert_eq!(lottery.num_players(), 2);
        assert_eq!(lottery.player(1), Some(&first));
        assert_eq!(lottery.player(2), None);
        assert_eq!(lottery.recent_winner(), None);
        assert_eq!(lottery.last_timestamp(), 100);
        assert_eq!(lottery.pending_request(), None);
    }
}
