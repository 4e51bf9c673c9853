// VRF Lottery Program - Randomness coordinator bridge
use solana_program::{
    account_info::AccountInfo,
    instruction::{AccountMeta, Instruction},
    msg,
    program::{get_return_data, invoke_signed},
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::{
    error::LotteryError,
    lottery::RandomnessCoordinator,
    state::{LotteryConfig, LOTTERY_SEED, NUM_WORDS},
};

/// Parameters of one randomness request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomnessRequest {
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_gas_limit: u32,
    pub num_words: u32,
}

impl From<&LotteryConfig> for RandomnessRequest {
    fn from(config: &LotteryConfig) -> Self {
        Self {
            key_hash: config.key_hash,
            subscription_id: config.subscription_id,
            request_confirmations: config.request_confirmations,
            callback_gas_limit: config.callback_gas_limit,
            num_words: NUM_WORDS,
        }
    }
}

/// Instructions understood by the coordinator program
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CoordinatorInstruction {
    /// Request random words for the signing consumer
    ///
    /// Accounts expected:
    /// 0. `[signer]` The consumer (lottery PDA)
    /// Remaining accounts are coordinator specific (subscription, queue...)
    ///
    /// Return data: the request id as 8 little endian bytes
    RequestRandomWords(RandomnessRequest),
}

impl CoordinatorInstruction {
    const REQUEST_RANDOM_WORDS_LEN: usize = 32 + 8 + 2 + 4 + 4;

    /// Unpacks a byte buffer into a CoordinatorInstruction
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        let (tag, rest) = input
            .split_first()
            .ok_or(ProgramError::InvalidInstructionData)?;

        match tag {
            0 => {
                if rest.len() < Self::REQUEST_RANDOM_WORDS_LEN {
                    return Err(ProgramError::InvalidInstructionData);
                }
                let (key_hash, rest) = rest.split_at(32);
                let (subscription_id, rest) = rest.split_at(8);
                let (request_confirmations, rest) = rest.split_at(2);
                let (callback_gas_limit, num_words) = rest.split_at(4);

                Ok(Self::RequestRandomWords(RandomnessRequest {
                    key_hash: key_hash
                        .try_into()
                        .map_err(|_| ProgramError::InvalidInstructionData)?,
                    subscription_id: u64::from_le_bytes(
                        subscription_id
                            .try_into()
                            .map_err(|_| ProgramError::InvalidInstructionData)?,
                    ),
                    request_confirmations: u16::from_le_bytes(
                        request_confirmations
                            .try_into()
                            .map_err(|_| ProgramError::InvalidInstructionData)?,
                    ),
                    callback_gas_limit: u32::from_le_bytes(
                        callback_gas_limit
                            .try_into()
                            .map_err(|_| ProgramError::InvalidInstructionData)?,
                    ),
                    num_words: u32::from_le_bytes(
                        num_words[..4]
                            .try_into()
                            .map_err(|_| ProgramError::InvalidInstructionData)?,
                    ),
                }))
            }
            _ => Err(ProgramError::InvalidInstructionData),
        }
    }

    /// Packs a CoordinatorInstruction into a byte buffer
    pub fn pack(&self) -> Vec<u8> {
        match self {
            Self::RequestRandomWords(request) => {
                let mut buf = Vec::with_capacity(1 + Self::REQUEST_RANDOM_WORDS_LEN);
                buf.push(0);
                buf.extend_from_slice(&request.key_hash);
                buf.extend_from_slice(&request.subscription_id.to_le_bytes());
                buf.extend_from_slice(&request.request_confirmations.to_le_bytes());
                buf.extend_from_slice(&request.callback_gas_limit.to_le_bytes());
                buf.extend_from_slice(&request.num_words.to_le_bytes());
                buf
            }
        }
    }
}

/// Read the request id the coordinator left in the return data
pub fn read_request_id(
    coordinator_program: &Pubkey,
    return_data: Option<(Pubkey, Vec<u8>)>,
) -> Result<u64, LotteryError> {
    let (program_id, data) = return_data.ok_or(LotteryError::InvalidCoordinatorResponse)?;
    if program_id != *coordinator_program {
        msg!("Return data set by {} instead of the coordinator", program_id);
        return Err(LotteryError::InvalidCoordinatorResponse);
    }
    // trailing zero bytes may be stripped from return data
    if data.len() > 8 {
        return Err(LotteryError::InvalidCoordinatorResponse);
    }
    let mut bytes = [0u8; 8];
    bytes[..data.len()].copy_from_slice(&data);
    Ok(u64::from_le_bytes(bytes))
}

/// Sends requests to the coordinator program, signed by the lottery PDA
pub struct CpiCoordinator<'a, 'b> {
    pub coordinator_program: &'b AccountInfo<'a>,
    pub lottery: &'b AccountInfo<'a>,
    pub remaining_accounts: &'b [AccountInfo<'a>],
    pub lottery_bump: u8,
}

impl<'a, 'b> RandomnessCoordinator for CpiCoordinator<'a, 'b> {
    fn request_random_words(&mut self, request: &RandomnessRequest) -> Result<u64, ProgramError> {
        let mut metas = vec![AccountMeta::new_readonly(*self.lottery.key, true)];
        metas.extend(self.remaining_accounts.iter().map(|acc| AccountMeta {
            pubkey: *acc.key,
            is_signer: acc.is_signer,
            is_writable: acc.is_writable,
        }));

        let mut infos = vec![self.lottery.clone(), self.coordinator_program.clone()];
        infos.extend_from_slice(self.remaining_accounts);

        invoke_signed(
            &Instruction {
                program_id: *self.coordinator_program.key,
                accounts: metas,
                data: CoordinatorInstruction::RequestRandomWords(*request).pack(),
            },
            &infos,
            &[&[LOTTERY_SEED, &[self.lottery_bump]]],
        )?;

        read_request_id(self.coordinator_program.key, get_return_data())
            .map_err(ProgramError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RandomnessRequest {
        RandomnessRequest {
            key_hash: [0xd8; 32],
            subscription_id: 8378,
            request_confirmations: 3,
            callback_gas_limit: 500_000,
            num_words: 1,
        }
    }

    #[test]
    fn request_wire_layout() {
        let data = CoordinatorInstruction::RequestRandomWords(request()).pack();
        assert_eq!(data.len(), 51);
        assert_eq!(data[0], 0);
        assert_eq!(&data[1..33], &[0xd8; 32]);
        assert_eq!(&data[33..41], &8378u64.to_le_bytes());
        assert_eq!(&data[41..43], &3u16.to_le_bytes());
        assert_eq!(&data[43..47], &500_000u32.to_le_bytes());
        assert_eq!(&data[47..51], &1u32.to_le_bytes());

        assert_eq!(
            CoordinatorInstruction::unpack(&data),
            Ok(CoordinatorInstruction::RequestRandomWords(request()))
        );
    }

    #[test]
    fn truncated_request_is_rejected() {
        let data = CoordinatorInstruction::RequestRandomWords(request()).pack();
        assert_eq!(
            CoordinatorInstruction::unpack(&data[..50]),
            Err(ProgramError::InvalidInstructionData)
        );
        assert_eq!(
            CoordinatorInstruction::unpack(&[]),
            Err(ProgramError::InvalidInstructionData)
        );
    }

    #[test]
    fn request_id_must_come_from_coordinator() {
        let coordinator = Pubkey::new_unique();

        assert_eq!(
            read_request_id(&coordinator, Some((coordinator, 9u64.to_le_bytes().to_vec()))),
            Ok(9)
        );
        assert_eq!(
            read_request_id(&coordinator, None),
            Err(LotteryError::InvalidCoordinatorResponse)
        );
        assert_eq!(
            read_request_id(
                &coordinator,
                Some((Pubkey::new_unique(), 9u64.to_le_bytes().to_vec()))
            ),
            Err(LotteryError::InvalidCoordinatorResponse)
        );
        assert_eq!(
            read_request_id(&coordinator, Some((coordinator, vec![1]))),
            Ok(1)
        );
        assert_eq!(
            read_request_id(&coordinator, Some((coordinator, vec![1; 9]))),
            Err(LotteryError::InvalidCoordinatorResponse)
        );
    }
}
