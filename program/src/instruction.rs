// VRF Lottery Program - Instructions
use solana_program::{
    clock::UnixTimestamp,
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::utils::{find_config_address, find_lottery_address, find_program_data_address};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LotteryInstruction {
    /// Create the config and lottery accounts
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The program's upgrade authority, funding both accounts
    /// 1. `[writable]` The config account (PDA)
    /// 2. `[writable]` The lottery account (PDA)
    /// 3. `[]` The coordinator program randomness is requested from
    /// 4. `[]` The coordinator authority that delivers fulfillments
    /// 5. `[]` The system program
    /// 6. `[]` The program data account of this program
    Initialize {
        /// Minimum entry payment in lamports
        entrance_fee: u64,
        /// Seconds between draws
        interval: UnixTimestamp,
        /// Oracle route the request is priced against
        key_hash: [u8; 32],
        /// Coordinator subscription paying for requests
        subscription_id: u64,
        /// Compute budget granted to the fulfillment
        callback_gas_limit: u32,
        /// Number of entries the lottery account can hold
        max_players: u32,
    },

    /// Enter the current round
    ///
    /// Accounts expected:
    /// 0. `[signer, writable]` The participant paying the entry
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    /// 3. `[]` The system program
    EnterLottery {
        /// Lamports paid, at least the entrance fee
        amount: u64,
    },

    /// Report whether a draw can start. Answer is one byte of return data.
    ///
    /// Accounts expected:
    /// 0. `[]` The config account
    /// 1. `[]` The lottery account
    CheckUpkeep,

    /// Close the round and request randomness from the coordinator
    ///
    /// Accounts expected:
    /// 0. `[signer]` Any keeper
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    /// 3. `[]` The coordinator program
    /// Remaining accounts are forwarded to the coordinator
    PerformUpkeep,

    /// Deliver randomness for the outstanding request
    ///
    /// Accounts expected:
    /// 0. `[signer]` The coordinator authority
    /// 1. `[]` The config account
    /// 2. `[writable]` The lottery account
    /// 3. `[writable]` The winner selected by the first random word
    FulfillRandomWords {
        request_id: u64,
        random_words: Vec<u64>,
    },
}

impl LotteryInstruction {
    /// Unpacks a byte buffer into a LotteryInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        Ok(match tag {
            0 => {
                let (entrance_fee, rest) = Self::unpack_u64(rest)?;
                let (interval, rest) = Self::unpack_i64(rest)?;
                let (key_hash, rest) = Self::unpack_fixed_bytes::<32>(rest)?;
                let (subscription_id, rest) = Self::unpack_u64(rest)?;
                let (callback_gas_limit, rest) = Self::unpack_u32(rest)?;
                let (max_players, _) = Self::unpack_u32(rest)?;
                Self::Initialize {
                    entrance_fee,
                    interval,
                    key_hash,
                    subscription_id,
                    callback_gas_limit,
                    max_players,
                }
            }
            1 => {
                let (amount, _) = Self::unpack_u64(rest)?;
                Self::EnterLottery { amount }
            }
            2 => Self::CheckUpkeep,
            3 => Self::PerformUpkeep,
            4 => {
                let (request_id, rest) = Self::unpack_u64(rest)?;
                let (count, mut rest) = Self::unpack_u32(rest)?;
                // each word needs 8 bytes, reject before allocating
                if rest.len() / 8 < count as usize {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let mut random_words = Vec::with_capacity(count as usize);
                for _ in 0..count {
                    let (word, next) = Self::unpack_u64(rest)?;
                    random_words.push(word);
                    rest = next;
                }
                Self::FulfillRandomWords {
                    request_id,
                    random_words,
                }
            }
            _ => return Err(ProgramError::InvalidInstructionData),
        })
    }

    /// Packs a LotteryInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::Initialize {
                entrance_fee,
                interval,
                key_hash,
                subscription_id,
                callback_gas_limit,
                max_players,
            } => {
                buf.push(0);
                buf.extend_from_slice(&entrance_fee.to_le_bytes());
                buf.extend_from_slice(&interval.to_le_bytes());
                buf.extend_from_slice(key_hash);
                buf.extend_from_slice(&subscription_id.to_le_bytes());
                buf.extend_from_slice(&callback_gas_limit.to_le_bytes());
                buf.extend_from_slice(&max_players.to_le_bytes());
            }
            Self::EnterLottery { amount } => {
                buf.push(1);
                buf.extend_from_slice(&amount.to_le_bytes());
            }
            Self::CheckUpkeep => buf.push(2),
            Self::PerformUpkeep => buf.push(3),
            Self::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                buf.push(4);
                buf.extend_from_slice(&request_id.to_le_bytes());
                buf.extend_from_slice(&(random_words.len() as u32).to_le_bytes());
                for word in random_words {
                    buf.extend_from_slice(&word.to_le_bytes());
                }
            }
        }
        buf
    }

    fn unpack_u64(input: &[u8]) -> Result<(u64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((u64::from_le_bytes(bytes), rest))
    }

    fn unpack_i64(input: &[u8]) -> Result<(i64, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<8>(input)?;
        Ok((i64::from_le_bytes(bytes), rest))
    }

    fn unpack_u32(input: &[u8]) -> Result<(u32, &[u8]), ProgramError> {
        let (bytes, rest) = Self::unpack_fixed_bytes::<4>(input)?;
        Ok((u32::from_le_bytes(bytes), rest))
    }

    fn unpack_fixed_bytes<const N: usize>(input: &[u8]) -> Result<([u8; N], &[u8]), ProgramError> {
        if input.len() < N {
            return Err(ProgramError::InvalidInstructionData);
        }
        let (bytes, rest) = input.split_at(N);
        let bytes = bytes
            .try_into()
            .map_err(|_| ProgramError::InvalidInstructionData)?;
        Ok((bytes, rest))
    }
}

/// Create initialize instruction
#[allow(clippy::too_many_arguments)]
pub fn initialize(
    program_id: &Pubkey,
    payer: &Pubkey,
    coordinator_program: &Pubkey,
    coordinator_authority: &Pubkey,
    entrance_fee: u64,
    interval: UnixTimestamp,
    key_hash: [u8; 32],
    subscription_id: u64,
    callback_gas_limit: u32,
    max_players: u32,
) -> Instruction {
    let (config, _) = find_config_address(program_id);
    let (lottery, _) = find_lottery_address(program_id);
    let (program_data, _) = find_program_data_address(program_id);
    let data = LotteryInstruction::Initialize {
        entrance_fee,
        interval,
        key_hash,
        subscription_id,
        callback_gas_limit,
        max_players,
    }
    .pack();

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(config, false),
            AccountMeta::new(lottery, false),
            AccountMeta::new_readonly(*coordinator_program, false),
            AccountMeta::new_readonly(*coordinator_authority, false),
            AccountMeta::new_readonly(system_program::id(), false),
            AccountMeta::new_readonly(program_data, false),
        ],
        data,
    }
}

/// Create enter_lottery instruction
pub fn enter_lottery(program_id: &Pubkey, participant: &Pubkey, amount: u64) -> Instruction {
    let (config, _) = find_config_address(program_id);
    let (lottery, _) = find_lottery_address(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*participant, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(lottery, false),
            AccountMeta::new_readonly(system_program::id(), false),
        ],
        data: LotteryInstruction::EnterLottery { amount }.pack(),
    }
}

/// Create check_upkeep instruction
pub fn check_upkeep(program_id: &Pubkey) -> Instruction {
    let (config, _) = find_config_address(program_id);
    let (lottery, _) = find_lottery_address(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(config, false),
            AccountMeta::new_readonly(lottery, false),
        ],
        data: LotteryInstruction::CheckUpkeep.pack(),
    }
}

/// Create perform_upkeep instruction
pub fn perform_upkeep(
    program_id: &Pubkey,
    keeper: &Pubkey,
    coordinator_program: &Pubkey,
    coordinator_accounts: &[AccountMeta],
) -> Instruction {
    let (config, _) = find_config_address(program_id);
    let (lottery, _) = find_lottery_address(program_id);

    let mut accounts = vec![
        AccountMeta::new_readonly(*keeper, true),
        AccountMeta::new_readonly(config, false),
        AccountMeta::new(lottery, false),
        AccountMeta::new_readonly(*coordinator_program, false),
    ];
    accounts.extend_from_slice(coordinator_accounts);

    Instruction {
        program_id: *program_id,
        accounts,
        data: LotteryInstruction::PerformUpkeep.pack(),
    }
}

/// Create fulfill_random_words instruction
pub fn fulfill_random_words(
    program_id: &Pubkey,
    coordinator_authority: &Pubkey,
    winner: &Pubkey,
    request_id: u64,
    random_words: Vec<u64>,
) -> Instruction {
    let (config, _) = find_config_address(program_id);
    let (lottery, _) = find_lottery_address(program_id);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new_readonly(*coordinator_authority, true),
            AccountMeta::new_readonly(config, false),
            AccountMeta::new(lottery, false),
            AccountMeta::new(*winner, false),
        ],
        data: LotteryInstruction::FulfillRandomWords {
            request_id,
            random_words,
        }
        .pack(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpack_initialize() {
        let instruction = LotteryInstruction::Initialize {
            entrance_fee: 10_000_000,
            interval: 30,
            key_hash: [0xd8; 32],
            subscription_id: 8378,
            callback_gas_limit: 500_000,
            max_players: 64,
        };
        let data = instruction.pack();
        assert_eq!(data.len(), 1 + 8 + 8 + 32 + 8 + 4 + 4);
        assert_eq!(LotteryInstruction::unpack(&data), Ok(instruction));
    }

    #[test]
    fn unpack_fulfill_reads_every_word() {
        let data = LotteryInstruction::FulfillRandomWords {
            request_id: 1,
            random_words: vec![5, u64::MAX],
        }
        .pack();

        assert_eq!(
            LotteryInstruction::unpack(&data),
            Ok(LotteryInstruction::FulfillRandomWords {
                request_id: 1,
                random_words: vec![5, u64::MAX],
            })
        );
    }

    #[test]
    fn unpack_rejects_bad_input() {
        assert_eq!(
            LotteryInstruction::unpack(&[]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            LotteryInstruction::unpack(&[9]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            LotteryInstruction::unpack(&[1, 0, 0, 0]),
            Err(ProgramError::InvalidInstructionData)
        );

        // claims three words but carries one
        let mut data = vec![4];
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&5u64.to_le_bytes());
        assert_eq!(
            LotteryInstruction::unpack(&data),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn builders_target_the_program_pdas() {
        let program_id = Pubkey::new_unique();
        let participant = Pubkey::new_unique();
        let (lottery, _) = find_lottery_address(&program_id);

        let ix = enter_lottery(&program_id, &participant, 10);
        assert_eq!(ix.accounts[0], AccountMeta::new(participant, true));
        assert_eq!(ix.accounts[2], AccountMeta::new(lottery, false));

        let ix = check_upkeep(&program_id);
        assert!(ix.accounts.iter().all(|meta| !meta.is_writable));
    }

    #[test]
    fn initialize_passes_program_data() {
        let program_id = Pubkey::new_unique();
        let authority = Pubkey::new_unique();
        let ix = initialize(
            &program_id,
            &authority,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            10_000_000,
            30,
            [0; 32],
            1,
            500_000,
            8,
        );

        assert_eq!(ix.accounts.len(), 7);
        assert_eq!(ix.accounts[0], AccountMeta::new(authority, true));
        assert_eq!(
            ix.accounts[6],
            AccountMeta::new_readonly(find_program_data_address(&program_id).0, false)
        );
    }
}
