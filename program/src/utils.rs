// VRF Lottery Program - Utility Functions
use arrayref::{array_ref, array_refs};
use solana_program::{
    bpf_loader_upgradeable, native_token::LAMPORTS_PER_SOL, program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::state::{CONFIG_SEED, LOTTERY_SEED};

/// Find the program derived address of the config account
pub fn find_config_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[CONFIG_SEED], program_id)
}

/// Find the program derived address of the lottery account
pub fn find_lottery_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[LOTTERY_SEED], program_id)
}

/// Find the upgradeable loader's program data account for a program
pub fn find_program_data_address(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[program_id.as_ref()], &bpf_loader_upgradeable::id())
}

/// Length of the program data header: state tag, slot, optional authority
pub const PROGRAM_DATA_METADATA_LEN: usize = 45;
const PROGRAM_DATA_STATE: u32 = 3;

/// Read the upgrade authority out of a program data account.
/// `None` means the program was deployed as immutable.
pub fn program_upgrade_authority(data: &[u8]) -> Result<Option<Pubkey>, ProgramError> {
    if data.len() < PROGRAM_DATA_METADATA_LEN {
        return Err(ProgramError::InvalidAccountData);
    }
    let metadata = array_ref![data, 0, PROGRAM_DATA_METADATA_LEN];
    let (state, _slot, has_authority, authority) = array_refs![metadata, 4, 8, 1, 32];
    if u32::from_le_bytes(*state) != PROGRAM_DATA_STATE {
        return Err(ProgramError::InvalidAccountData);
    }
    match has_authority {
        [0] => Ok(None),
        [1] => Ok(Some(Pubkey::new_from_array(*authority))),
        _ => Err(ProgramError::InvalidAccountData),
    }
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / LAMPORTS_PER_SOL as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pdas_are_distinct_per_program() {
        let program_id = Pubkey::new_unique();
        let (config, _) = find_config_address(&program_id);
        let (lottery, _) = find_lottery_address(&program_id);
        assert_ne!(config, lottery);
        assert_ne!(lottery, find_lottery_address(&Pubkey::new_unique()).0);
    }

    fn program_data(state: u32, authority: Option<Pubkey>) -> Vec<u8> {
        let mut data = vec![0u8; PROGRAM_DATA_METADATA_LEN + 8];
        data[..4].copy_from_slice(&state.to_le_bytes());
        data[4..12].copy_from_slice(&42u64.to_le_bytes());
        if let Some(authority) = authority {
            data[12] = 1;
            data[13..45].copy_from_slice(authority.as_ref());
        }
        data
    }

    #[test]
    fn reads_upgrade_authority() {
        let authority = Pubkey::new_unique();
        assert_eq!(
            program_upgrade_authority(&program_data(PROGRAM_DATA_STATE, Some(authority))),
            Ok(Some(authority))
        );
        assert_eq!(
            program_upgrade_authority(&program_data(PROGRAM_DATA_STATE, None)),
            Ok(None)
        );
    }

    #[test]
    fn rejects_other_loader_accounts() {
        // a program account, not its data
        assert_eq!(
            program_upgrade_authority(&program_data(2, Some(Pubkey::new_unique()))),
            Err(ProgramError::InvalidAccountData)
        );
        assert_eq!(
            program_upgrade_authority(&[3, 0, 0, 0]),
            Err(ProgramError::InvalidAccountData)
        );
    }

    #[test]
    fn program_data_is_owned_by_the_loader_seed() {
        let program_id = Pubkey::new_unique();
        let (address, _) = find_program_data_address(&program_id);
        assert_ne!(address, find_program_data_address(&Pubkey::new_unique()).0);
        assert_ne!(address, find_config_address(&program_id).0);
    }

    #[test]
    fn lamports_display_as_sol() {
        assert_eq!(lamports_to_sol(10_000_000), 0.01);
        assert_eq!(lamports_to_sol(LAMPORTS_PER_SOL), 1.0);
    }
}
