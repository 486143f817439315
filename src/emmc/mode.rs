//! Region selection with a sanity check of the first block.
//!
//! Signature mismatches are reported and returned, never raised: they are common
//! across hardware revisions and say little about whether I/O will work.

use serde_json::json;

use crate::device::{BlockSession, Region};
use crate::emmc::block::Block;
use crate::emmc::error::EmmcError;
use crate::emmc::session::EmmcSession;
use crate::ui::prelude::*;

pub const BOOT0_SIGNATURES: [&[u8; 9]; 2] = [b"EMMC_BOOT", b"BADD_BOOT"];
pub const USER_MARKER: [u8; 2] = [0x55, 0xAA];
const USER_MARKER_OFFSET: usize = 510;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureCheck {
    Valid,
    Mismatch { found: Vec<u8> },
}

impl SignatureCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, SignatureCheck::Valid)
    }
}

pub fn check_boot0_signature(block: &Block) -> SignatureCheck {
    let head = &block[..9];
    if BOOT0_SIGNATURES.iter().any(|sig| head == &sig[..]) {
        SignatureCheck::Valid
    } else {
        SignatureCheck::Mismatch {
            found: head.to_vec(),
        }
    }
}

pub fn check_user_marker(block: &Block) -> SignatureCheck {
    let tail = &block[USER_MARKER_OFFSET..USER_MARKER_OFFSET + 2];
    if tail == USER_MARKER {
        SignatureCheck::Valid
    } else {
        SignatureCheck::Mismatch {
            found: tail.to_vec(),
        }
    }
}

pub fn switch_to_boot0<S: BlockSession>(
    session: &mut EmmcSession<S>,
) -> Result<SignatureCheck, EmmcError> {
    session.select_region(Region::Boot0)?;
    let block = session.read_block(0)?;
    let check = check_boot0_signature(&block);
    if let SignatureCheck::Mismatch { found } = &check {
        emit(
            Level::Warn,
            "mode.boot0.signature",
            &format!(
                "{} Unexpected BOOT0 header {:?}; continuing anyway.",
                char::from(NerdFont::Warning),
                String::from_utf8_lossy(found)
            ),
            Some(json!({ "found": found })),
        );
    }
    Ok(check)
}

/// Select the user area. Any partition table decoded earlier is stale afterwards.
pub fn switch_to_user<S: BlockSession>(
    session: &mut EmmcSession<S>,
) -> Result<SignatureCheck, EmmcError> {
    session.select_region(Region::User)?;
    let block = session.read_block(0)?;
    let check = check_user_marker(&block);
    if let SignatureCheck::Mismatch { found } = &check {
        emit(
            Level::Warn,
            "mode.user.marker",
            &format!(
                "{} Boot sector ends in {:02x?} instead of 55 aa. There may be a problem with \
                 the partition table; it is probably safe to ignore this.",
                char::from(NerdFont::Warning),
                found
            ),
            Some(json!({ "found": found })),
        );
    }
    Ok(check)
}
