//! OPEN step strategies
//!
//! SMB1 has three ways to open a file. Which one a connection uses is chosen
//! once, from configuration or from the capabilities the server advertised.

use super::config::OpenStrategyKind;
use super::connection::SmbConnection;
use crate::error::{Error, Result};
use crate::protocol::access::{
    legacy_open_mode, CreationDisposition, DesiredAccess, FileAttributes, ShareAccess,
};
use crate::protocol::constants::CAP_NT_SMBS;
use crate::protocol::messages::negotiate::NegotiateResponse;
use crate::protocol::messages::open::{
    LegacyOpenResponse, NtCreateAndXRequest, NtCreateAndXResponse, OpenAndXRequest,
    OpenAndXResponse, OpenRequest, OpenResponse,
};
use async_trait::async_trait;

/// Win32-style arguments of an open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenParams {
    pub access: DesiredAccess,
    pub share: ShareAccess,
    pub disposition: CreationDisposition,
    pub attributes: FileAttributes,
}

impl OpenParams {
    /// Read-only open of an existing file, sharing read access
    pub fn read_existing() -> Self {
        Self {
            access: DesiredAccess::GENERIC_READ,
            share: ShareAccess::FILE_SHARE_READ,
            disposition: CreationDisposition::OpenExisting,
            attributes: FileAttributes::NORMAL,
        }
    }
}

impl Default for OpenParams {
    fn default() -> Self {
        Self::read_existing()
    }
}

#[async_trait]
pub trait OpenStrategy: Send + Sync {
    fn kind(&self) -> OpenStrategyKind;

    /// Reject parameters this strategy cannot express, before any I/O
    fn check(&self, _params: &OpenParams) -> Result<()> {
        Ok(())
    }

    async fn open(
        &self,
        conn: &mut SmbConnection,
        file_name: &str,
        params: &OpenParams,
    ) -> Result<OpenResponse>;
}

/// SMB_COM_OPEN; existing files only
pub struct LegacyOpen;

#[async_trait]
impl OpenStrategy for LegacyOpen {
    fn kind(&self) -> OpenStrategyKind {
        OpenStrategyKind::Legacy
    }

    fn check(&self, params: &OpenParams) -> Result<()> {
        if params.disposition != CreationDisposition::OpenExisting {
            return Err(Error::InvalidParameter(format!(
                "SMB_COM_OPEN cannot honour {:?}",
                params.disposition
            )));
        }
        Ok(())
    }

    async fn open(
        &self,
        conn: &mut SmbConnection,
        file_name: &str,
        params: &OpenParams,
    ) -> Result<OpenResponse> {
        let request = OpenRequest {
            access_mode: legacy_open_mode(params.access, params.share),
            file_name: file_name.to_string(),
        };
        let LegacyOpenResponse(response) = conn.transact(&request).await?;
        Ok(response)
    }
}

/// SMB_COM_OPEN_ANDX
pub struct AndXOpen;

#[async_trait]
impl OpenStrategy for AndXOpen {
    fn kind(&self) -> OpenStrategyKind {
        OpenStrategyKind::AndX
    }

    async fn open(
        &self,
        conn: &mut SmbConnection,
        file_name: &str,
        params: &OpenParams,
    ) -> Result<OpenResponse> {
        let request = OpenAndXRequest {
            access_mode: legacy_open_mode(params.access, params.share),
            // Only the low byte carries DOS attributes
            file_attributes: (params.attributes.bits() & 0x00FF) as u16,
            open_function: params.disposition.open_function(),
            file_name: file_name.to_string(),
        };
        let OpenAndXResponse(response) = conn.transact(&request).await?;
        Ok(response)
    }
}

/// SMB_COM_NT_CREATE_ANDX
pub struct NtCreateOpen;

#[async_trait]
impl OpenStrategy for NtCreateOpen {
    fn kind(&self) -> OpenStrategyKind {
        OpenStrategyKind::NtCreate
    }

    async fn open(
        &self,
        conn: &mut SmbConnection,
        file_name: &str,
        params: &OpenParams,
    ) -> Result<OpenResponse> {
        if file_name.len() >= u16::MAX as usize {
            return Err(Error::InvalidPath(format!(
                "{} byte file name does not fit NT_CREATE_ANDX",
                file_name.len()
            )));
        }
        let request = NtCreateAndXRequest {
            desired_access: params.access.bits(),
            file_attributes: params.attributes.bits(),
            share_access: params.share.bits(),
            create_disposition: params.disposition.nt_disposition(),
            file_name: file_name.to_string(),
        };
        let NtCreateAndXResponse(response) = conn.transact(&request).await?;
        Ok(response)
    }
}

/// Strategy object for an explicit choice; `Auto` has no fixed strategy
pub fn fixed_strategy(kind: OpenStrategyKind) -> Option<Box<dyn OpenStrategy>> {
    match kind {
        OpenStrategyKind::Auto => None,
        OpenStrategyKind::Legacy => Some(Box::new(LegacyOpen)),
        OpenStrategyKind::AndX => Some(Box::new(AndXOpen)),
        OpenStrategyKind::NtCreate => Some(Box::new(NtCreateOpen)),
    }
}

/// Resolve `kind` against what the server advertised
pub fn select_strategy(
    kind: OpenStrategyKind,
    negotiated: &NegotiateResponse,
) -> Box<dyn OpenStrategy> {
    fixed_strategy(kind).unwrap_or_else(|| {
        if negotiated.capabilities & CAP_NT_SMBS != 0 {
            Box::new(NtCreateOpen)
        } else {
            Box::new(LegacyOpen)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negotiated(capabilities: u32) -> NegotiateResponse {
        NegotiateResponse {
            dialect_index: 0,
            security_mode: 0,
            max_mpx_count: 1,
            max_buffer_size: 4356,
            capabilities,
        }
    }

    #[test]
    fn test_auto_selection_follows_capabilities() {
        let nt = select_strategy(OpenStrategyKind::Auto, &negotiated(CAP_NT_SMBS));
        assert_eq!(nt.kind(), OpenStrategyKind::NtCreate);

        let legacy = select_strategy(OpenStrategyKind::Auto, &negotiated(0));
        assert_eq!(legacy.kind(), OpenStrategyKind::Legacy);
    }

    #[test]
    fn test_explicit_choice_wins() {
        let andx = select_strategy(OpenStrategyKind::AndX, &negotiated(CAP_NT_SMBS));
        assert_eq!(andx.kind(), OpenStrategyKind::AndX);
        assert!(fixed_strategy(OpenStrategyKind::Auto).is_none());
    }

    #[test]
    fn test_legacy_rejects_create_dispositions() {
        let mut params = OpenParams::read_existing();
        assert!(LegacyOpen.check(&params).is_ok());

        for disposition in [
            CreationDisposition::CreateNew,
            CreationDisposition::CreateAlways,
            CreationDisposition::OpenAlways,
            CreationDisposition::TruncateExisting,
        ] {
            params.disposition = disposition;
            assert!(matches!(
                LegacyOpen.check(&params),
                Err(Error::InvalidParameter(_))
            ));
            assert!(AndXOpen.check(&params).is_ok());
            assert!(NtCreateOpen.check(&params).is_ok());
        }
    }
}
