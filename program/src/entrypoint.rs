//! Program entrypoint
#![cfg(not(feature = "no-entrypoint"))]

use solana_program::entrypoint;

use crate::process_instruction;

entrypoint!(process_instruction);
