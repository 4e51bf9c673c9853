// VRF Lottery Program - Instruction Processor
use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    bpf_loader_upgradeable,
    clock::{Clock, UnixTimestamp},
    entrypoint::ProgramResult,
    msg,
    program::{invoke, invoke_signed, set_return_data},
    program_error::ProgramError,
    program_pack::Pack,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    coordinator::CpiCoordinator,
    error::LotteryError,
    instruction::LotteryInstruction,
    lottery::PrizeTransfer,
    state::{Lottery, LotteryConfig, CONFIG_SEED, LOTTERY_SEED, REQUEST_CONFIRMATIONS},
    utils::{
        find_config_address, find_lottery_address, find_program_data_address, lamports_to_sol,
        program_upgrade_authority,
    },
};

/// Program state handler.
pub struct Processor;

impl Processor {
    /// Process a lottery instruction
    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = LotteryInstruction::unpack(instruction_data)?;

        match instruction {
            LotteryInstruction::Initialize {
                entrance_fee,
                interval,
                key_hash,
                subscription_id,
                callback_gas_limit,
                max_players,
            } => {
                msg!("Instruction: Initialize");
                let config = LotteryConfig {
                    is_initialized: true,
                    coordinator_program: Pubkey::default(),
                    coordinator_authority: Pubkey::default(),
                    entrance_fee,
                    interval,
                    key_hash,
                    subscription_id,
                    callback_gas_limit,
                    request_confirmations: REQUEST_CONFIRMATIONS,
                    max_players,
                };
                Self::process_initialize(program_id, accounts, config)
            }
            LotteryInstruction::EnterLottery { amount } => {
                msg!("Instruction: Enter Lottery");
                Self::process_enter_lottery(program_id, accounts, amount)
            }
            LotteryInstruction::CheckUpkeep => {
                msg!("Instruction: Check Upkeep");
                Self::process_check_upkeep(program_id, accounts)
            }
            LotteryInstruction::PerformUpkeep => {
                msg!("Instruction: Perform Upkeep");
                Self::process_perform_upkeep(program_id, accounts)
            }
            LotteryInstruction::FulfillRandomWords {
                request_id,
                random_words,
            } => {
                msg!("Instruction: Fulfill Random Words");
                Self::process_fulfill_random_words(program_id, accounts, request_id, &random_words)
            }
        }
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        mut config: LotteryConfig,
    ) -> ProgramResult {
        // Get accounts
        let account_info_iter = &mut accounts.iter();
        let payer_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let coordinator_authority_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;
        let program_data_info = next_account_info(account_info_iter)?;

        // Verify payer is signer
        if !payer_info.is_signer {
            msg!("Payer must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        // Only the upgrade authority may configure the lottery
        if *program_data_info.key != find_program_data_address(program_id).0
            || *program_data_info.owner != bpf_loader_upgradeable::id()
        {
            msg!("Invalid program data account");
            return Err(ProgramError::InvalidArgument);
        }
        let upgrade_authority = program_upgrade_authority(&program_data_info.data.borrow())?;
        if upgrade_authority != Some(*payer_info.key) {
            return Err(reject(LotteryError::Unauthorized));
        }

        // Validate parameters
        if config.entrance_fee == 0 || config.interval <= 0 || config.max_players == 0 {
            msg!("Entrance fee, interval and capacity must be positive");
            return Err(reject(LotteryError::InvalidConfig));
        }

        // Verify PDAs
        let (expected_config, config_bump) = find_config_address(program_id);
        let (expected_lottery, lottery_bump) = find_lottery_address(program_id);
        if *config_info.key != expected_config || *lottery_info.key != expected_lottery {
            msg!("Invalid config or lottery account address");
            return Err(ProgramError::InvalidArgument);
        }

        if config_info.owner == program_id || lottery_info.owner == program_id {
            msg!("Lottery is already initialized");
            return Err(ProgramError::AccountAlreadyInitialized);
        }

        config.coordinator_program = *coordinator_program_info.key;
        config.coordinator_authority = *coordinator_authority_info.key;

        // Create config and lottery accounts
        let rent = Rent::get()?;
        create_pda_account(
            payer_info,
            config_info,
            system_program_info,
            program_id,
            &rent,
            LotteryConfig::LEN,
            &[CONFIG_SEED, &[config_bump]],
        )?;
        create_pda_account(
            payer_info,
            lottery_info,
            system_program_info,
            program_id,
            &rent,
            Lottery::space(config.max_players),
            &[LOTTERY_SEED, &[lottery_bump]],
        )?;

        // Save state
        let now = Clock::get()?.unix_timestamp;
        LotteryConfig::pack(config, &mut config_info.data.borrow_mut())?;
        save_lottery(&Lottery::new(lottery_bump, now), lottery_info)?;

        msg!(
            "Lottery initialized: EntranceFee={} SOL, Interval={}s, Capacity={}, Coordinator={}",
            lamports_to_sol(config.entrance_fee),
            config.interval,
            config.max_players,
            config.coordinator_program
        );
        Ok(())
    }

    fn process_enter_lottery(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let participant_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let system_program_info = next_account_info(account_info_iter)?;

        if !participant_info.is_signer {
            msg!("Participant must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        let config = load_config(program_id, config_info)?;
        let mut lottery = load_lottery(program_id, lottery_info)?;

        let event = lottery
            .enter(&config, *participant_info.key, amount)
            .map_err(reject)?;

        // Transfer entry to the lottery account
        invoke(
            &system_instruction::transfer(participant_info.key, lottery_info.key, amount),
            &[
                participant_info.clone(),
                lottery_info.clone(),
                system_program_info.clone(),
            ],
        )?;

        save_lottery(&lottery, lottery_info)?;
        event.emit();
        Ok(())
    }

    fn process_check_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;

        let config = load_config(program_id, config_info)?;
        let lottery = load_lottery(program_id, lottery_info)?;

        let upkeep_needed = lottery.check_upkeep(&config, Clock::get()?.unix_timestamp);
        msg!("Upkeep needed: {}", upkeep_needed);
        set_return_data(&[upkeep_needed as u8]);
        Ok(())
    }

    fn process_perform_upkeep(program_id: &Pubkey, accounts: &[AccountInfo]) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let keeper_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let coordinator_program_info = next_account_info(account_info_iter)?;
        let remaining_accounts = account_info_iter.as_slice();

        if !keeper_info.is_signer {
            msg!("Keeper must sign the transaction");
            return Err(ProgramError::MissingRequiredSignature);
        }

        // Verify coordinator matches config
        let config = load_config(program_id, config_info)?;
        if *coordinator_program_info.key != config.coordinator_program {
            msg!("Coordinator program does not match the configured one");
            return Err(ProgramError::IncorrectProgramId);
        }
        let mut lottery = load_lottery(program_id, lottery_info)?;

        let mut coordinator = CpiCoordinator {
            coordinator_program: coordinator_program_info,
            lottery: lottery_info,
            remaining_accounts,
            lottery_bump: lottery.bump,
        };
        let now = Clock::get()?.unix_timestamp;
        let event = lottery
            .perform_upkeep(&config, now, &mut coordinator)
            .map_err(reject)?;

        save_lottery(&lottery, lottery_info)?;
        event.emit();
        Ok(())
    }

    fn process_fulfill_random_words(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        request_id: u64,
        random_words: &[u64],
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let config_info = next_account_info(account_info_iter)?;
        let lottery_info = next_account_info(account_info_iter)?;
        let winner_info = next_account_info(account_info_iter)?;

        // Verify coordinator authority is signer
        let config = load_config(program_id, config_info)?;
        if !authority_info.is_signer || *authority_info.key != config.coordinator_authority {
            return Err(reject(LotteryError::OnlyCoordinatorCanFulfill));
        }
        let mut lottery = load_lottery(program_id, lottery_info)?;

        let mut payout = LamportPayout {
            lottery: lottery_info,
            winner: winner_info,
        };
        let now: UnixTimestamp = Clock::get()?.unix_timestamp;
        let prize = lottery.pot;
        let event = lottery
            .fulfill_random_words(request_id, random_words, now, &mut payout)
            .map_err(reject)?;

        save_lottery(&lottery, lottery_info)?;
        msg!("Paid {} SOL to {}", lamports_to_sol(prize), winner_info.key);
        event.emit();
        Ok(())
    }
}

/// Pays the pot out of the lottery PDA by moving lamports directly
struct LamportPayout<'a, 'b> {
    lottery: &'b AccountInfo<'a>,
    winner: &'b AccountInfo<'a>,
}

impl<'a, 'b> PrizeTransfer for LamportPayout<'a, 'b> {
    fn transfer_prize(&mut self, winner: &Pubkey, amount: u64) -> Result<(), ProgramError> {
        if self.winner.key != winner {
            msg!("Winner account {} is not the drawn winner {}", self.winner.key, winner);
            return Err(ProgramError::InvalidArgument);
        }
        if !self.winner.is_writable || self.winner.key == self.lottery.key {
            msg!("Winner account cannot receive the prize");
            return Err(ProgramError::InvalidArgument);
        }

        let remaining = self
            .lottery
            .lamports()
            .checked_sub(amount)
            .ok_or(ProgramError::InsufficientFunds)?;
        let credited = self
            .winner
            .lamports()
            .checked_add(amount)
            .ok_or(ProgramError::InvalidArgument)?;

        **self.lottery.try_borrow_mut_lamports()? = remaining;
        **self.winner.try_borrow_mut_lamports()? = credited;
        Ok(())
    }
}

/// Log a lottery error and turn it into a program error
fn reject(err: LotteryError) -> ProgramError {
    msg!("{}", err);
    err.into()
}

fn create_pda_account<'a>(
    payer: &AccountInfo<'a>,
    new_account: &AccountInfo<'a>,
    system_program: &AccountInfo<'a>,
    owner: &Pubkey,
    rent: &Rent,
    space: usize,
    seeds: &[&[u8]],
) -> ProgramResult {
    let required_lamports = rent.minimum_balance(space);
    let current_lamports = new_account.lamports();
    if current_lamports == 0 {
        return invoke_signed(
            &system_instruction::create_account(
                payer.key,
                new_account.key,
                required_lamports,
                space as u64,
                owner,
            ),
            &[payer.clone(), new_account.clone(), system_program.clone()],
            &[seeds],
        );
    }

    // create_account refuses an address that already holds lamports
    let top_up = required_lamports.saturating_sub(current_lamports);
    if top_up > 0 {
        invoke(
            &system_instruction::transfer(payer.key, new_account.key, top_up),
            &[payer.clone(), new_account.clone(), system_program.clone()],
        )?;
    }
    invoke_signed(
        &system_instruction::allocate(new_account.key, space as u64),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )?;
    invoke_signed(
        &system_instruction::assign(new_account.key, owner),
        &[new_account.clone(), system_program.clone()],
        &[seeds],
    )
}

fn load_config(program_id: &Pubkey, config_info: &AccountInfo) -> Result<LotteryConfig, ProgramError> {
    if config_info.owner != program_id {
        msg!("Config account must be owned by this program");
        return Err(ProgramError::IncorrectProgramId);
    }
    if *config_info.key != find_config_address(program_id).0 {
        msg!("Invalid config account address");
        return Err(ProgramError::InvalidArgument);
    }
    LotteryConfig::unpack(&config_info.data.borrow())
}

fn load_lottery(program_id: &Pubkey, lottery_info: &AccountInfo) -> Result<Lottery, ProgramError> {
    if lottery_info.owner != program_id {
        msg!("Lottery account must be owned by this program");
        return Err(ProgramError::IncorrectProgramId);
    }
    let lottery = Lottery::deserialize(&mut &lottery_info.data.borrow()[..])?;
    if !lottery.is_initialized {
        return Err(ProgramError::UninitializedAccount);
    }
    let expected = Pubkey::create_program_address(&[LOTTERY_SEED, &[lottery.bump]], program_id)
        .map_err(|_| ProgramError::InvalidSeeds)?;
    if *lottery_info.key != expected {
        msg!("Invalid lottery account address");
        return Err(ProgramError::InvalidArgument);
    }
    Ok(lottery)
}

fn save_lottery(lottery: &Lottery, lottery_info: &AccountInfo) -> ProgramResult {
    lottery.serialize(&mut &mut lottery_info.data.borrow_mut()[..])?;
    Ok(())
}
