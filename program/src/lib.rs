// VRF Lottery Program
// A recurring lottery paid out with randomness from an external coordinator

pub mod coordinator;
pub mod entrypoint;
pub mod error;
pub mod events;
pub mod instruction;
pub mod lottery;
pub mod processor;
pub mod state;
pub mod utils;

use solana_program::{account_info::AccountInfo, entrypoint::ProgramResult, pubkey::Pubkey};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    processor::Processor::process(program_id, accounts, instruction_data)
}
