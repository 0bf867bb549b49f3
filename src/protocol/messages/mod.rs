//! SMB1 command messages

use super::constants::SmbCommand;
use super::message::{SmbRequestBuilder, SmbResponse};
use crate::error::Result;

pub mod close;
pub mod negotiate;
pub mod open;
pub mod read;
pub mod session;
pub mod tree;

/// A request that knows how to fill the parameter and data blocks
pub trait SmbRequest {
    const COMMAND: SmbCommand;

    fn write_blocks(&self, builder: &mut SmbRequestBuilder);
}

/// A response decoded from a validated [`SmbResponse`]
pub trait SmbReply: Sized {
    fn parse(response: &SmbResponse) -> Result<Self>;
}

#[cfg(test)]
pub(crate) fn test_response(
    command: SmbCommand,
    tree_id: u16,
    user_id: u16,
    fill: impl FnOnce(&mut SmbRequestBuilder),
) -> SmbResponse {
    use super::header::{MultiplexCounter, SmbHeader};

    let header = SmbHeader {
        command,
        error_class: 0,
        error_code: 0,
        flags: 0x80,
        flags2: 0x0001,
        tree_id,
        process_id: 0,
        user_id,
        multiplex_id: MultiplexCounter::new().next(),
    };
    let mut builder = SmbRequestBuilder::new(header);
    fill(&mut builder);
    SmbResponse::parse(builder.build().expect("valid test response")).expect("parsable")
}
