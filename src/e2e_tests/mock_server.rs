//! Scripted SMB1 server for end-to-end tests
//!
//! Speaks just enough NetBIOS and SMB1 to walk a client through the open
//! sequence and serve READs from an in-memory file. Every request it sees is
//! recorded so tests can assert on what went over the wire.

use crate::error::dos_codes;
use crate::netbios::{NetBiosHeader, NetBiosMessage};
use crate::protocol::constants::{offsets, SmbCommand, CAP_NT_SMBS};
use crate::protocol::header::SmbHeader;
use crate::protocol::message::SmbRequestBuilder;
use crate::protocol::NetBiosMessageType;
use byteorder::{ByteOrder, LittleEndian};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const TREE_ID: u16 = 0x0001;
pub const USER_ID: u16 = 0x0800;
pub const FILE_ID: u16 = 0x4001;

/// Ways the server can misbehave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Never answer the NetBIOS session request
    SilentSession,
    /// Answer the session request negatively
    RejectSession,
    /// Answer `command` with a WordCount that overruns the frame
    BadWordCount(SmbCommand),
    /// Fail the nth READ (0-based) with ERRDOS/ERRbadfid
    ReadError(usize),
    /// Answer `command` with ERRDOS/ERRnoaccess
    Deny(SmbCommand),
    /// Return at most this many bytes per READ, whatever the request asked
    ShortReads(usize),
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub file: Vec<u8>,
    pub capabilities: u32,
    /// MaxBufferSize advertised in the NEGOTIATE reply
    pub max_buffer_size: u32,
    pub fault: Option<Fault>,
}

impl MockConfig {
    pub fn serving(file: Vec<u8>) -> Self {
        Self {
            file,
            capabilities: CAP_NT_SMBS,
            max_buffer_size: 16644,
            fault: None,
        }
    }

    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn with_capabilities(mut self, capabilities: u32) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_max_buffer_size(mut self, max_buffer_size: u32) -> Self {
        self.max_buffer_size = max_buffer_size;
        self
    }
}

/// One request as the server saw it
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub header: SmbHeader,
    pub parameters: Vec<u8>,
    pub data: Vec<u8>,
}

impl RecordedRequest {
    fn word(&self, index: usize) -> u16 {
        LittleEndian::read_u16(&self.parameters[index * 2..])
    }
}

pub struct MockSmbServer {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    connections: Arc<AtomicUsize>,
    _task: tokio::task::JoinHandle<()>,
}

impl MockSmbServer {
    pub async fn start(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));

        let task = {
            let requests = requests.clone();
            let connections = connections.clone();
            tokio::spawn(async move {
                while let Ok((stream, _)) = listener.accept().await {
                    connections.fetch_add(1, Ordering::SeqCst);
                    let session = Session {
                        stream,
                        config: config.clone(),
                        requests: requests.clone(),
                        reads: 0,
                    };
                    tokio::spawn(session.run());
                }
            })
        };

        Self {
            addr,
            requests,
            connections,
            _task: task,
        }
    }

    /// `\\127.0.0.1\public\path`
    pub fn unc(&self, path: &str) -> String {
        format!(r"\\{}\public\{}", self.addr.ip(), path)
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn commands(&self) -> Vec<SmbCommand> {
        self.requests().iter().map(|r| r.header.command).collect()
    }

    /// `(count, offset)` of every READ received
    pub fn reads(&self) -> Vec<(u16, u32)> {
        self.requests()
            .iter()
            .filter(|r| r.header.command == SmbCommand::Read)
            .map(|r| (r.word(1), LittleEndian::read_u32(&r.parameters[4..])))
            .collect()
    }

    /// MaxBufferSize the client advertised in its SESSION_SETUP
    pub fn client_max_buffer(&self) -> Option<u16> {
        self.requests()
            .iter()
            .find(|r| r.header.command == SmbCommand::SessionSetupAndX)
            .map(|r| r.word(2))
    }
}

struct Session {
    stream: TcpStream,
    config: MockConfig,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    reads: usize,
}

impl Session {
    async fn run(mut self) {
        let Some(request) = self.read_frame().await else {
            return;
        };
        assert_eq!(request.header.message_type, NetBiosMessageType::SessionRequest);

        match self.config.fault {
            Some(Fault::SilentSession) => {
                tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                return;
            }
            Some(Fault::RejectSession) => {
                let reply = NetBiosMessage::negative_response(0x82).unwrap();
                self.stream.write_all(&reply.to_bytes()).await.ok();
                return;
            }
            _ => {}
        }
        let reply = NetBiosMessage::positive_response().unwrap();
        if self.stream.write_all(&reply.to_bytes()).await.is_err() {
            return;
        }

        while let Some(frame) = self.read_frame().await {
            let reply = self.answer(&frame.payload);
            let framed = NetBiosMessage::session_message(reply).unwrap();
            if self.stream.write_all(&framed.to_bytes()).await.is_err() {
                return;
            }
        }
    }

    async fn read_frame(&mut self) -> Option<NetBiosMessage> {
        let mut header = [0u8; NetBiosHeader::SIZE];
        self.stream.read_exact(&mut header).await.ok()?;
        let parsed = NetBiosHeader::parse(&header).ok()?;
        let mut frame = header.to_vec();
        frame.resize(NetBiosHeader::SIZE + parsed.length as usize, 0);
        self.stream
            .read_exact(&mut frame[NetBiosHeader::SIZE..])
            .await
            .ok()?;
        NetBiosMessage::parse(&frame).ok()
    }

    fn answer(&mut self, raw: &[u8]) -> Vec<u8> {
        let header = SmbHeader::parse(raw).unwrap();
        let word_count = raw[offsets::WORD_COUNT] as usize;
        let params_end = offsets::PARAMETERS + word_count * 2;
        let byte_count = LittleEndian::read_u16(&raw[params_end..]) as usize;
        let request = RecordedRequest {
            header: header.clone(),
            parameters: raw[offsets::PARAMETERS..params_end].to_vec(),
            data: raw[params_end + 2..params_end + 2 + byte_count].to_vec(),
        };
        self.requests.lock().unwrap().push(request.clone());

        let mut reply = SmbHeader {
            flags: 0x80,
            ..header
        };
        match reply.command {
            SmbCommand::SessionSetupAndX => reply.user_id = USER_ID,
            SmbCommand::TreeConnectAndX => reply.tree_id = TREE_ID,
            _ => {}
        }

        match self.config.fault {
            Some(Fault::BadWordCount(command)) if command == reply.command => {
                let mut buf = reply.serialize().unwrap();
                buf.extend_from_slice(&[0xFF, 0x00, 0x00]);
                return buf;
            }
            Some(Fault::Deny(command)) if command == reply.command => {
                return error_reply(reply, 0x01, dos_codes::ERR_NO_ACCESS);
            }
            _ => {}
        }

        let mut builder = SmbRequestBuilder::new(reply.clone());
        match reply.command {
            SmbCommand::Negotiate => {
                builder
                    .param_u16(0) // DialectIndex
                    .param_u8(0x03) // SecurityMode
                    .param_u16(50) // MaxMpxCount
                    .param_u16(1) // MaxNumberVcs
                    .param_u32(self.config.max_buffer_size)
                    .param_u32(65536) // MaxRawSize
                    .param_u32(0) // SessionKey
                    .param_u32(self.config.capabilities)
                    .param_u64(0) // SystemTime
                    .param_u16(0) // ServerTimeZone
                    .param_u8(0); // ChallengeLength
            }
            SmbCommand::SessionSetupAndX => {
                builder
                    .param_u8(0xFF)
                    .param_u8(0)
                    .param_u16(0)
                    .param_u16(0x0001); // Action: logged in as guest
            }
            SmbCommand::TreeConnectAndX => {
                builder
                    .param_u8(0xFF)
                    .param_u8(0)
                    .param_u16(0)
                    .param_u16(0); // OptionalSupport
                builder.data_bytes(b"A:\0");
            }
            SmbCommand::Open => {
                builder
                    .param_u16(FILE_ID)
                    .param_u16(0x20)
                    .param_u32(0)
                    .param_u32(self.config.file.len() as u32)
                    .param_u16(request.word(0));
            }
            SmbCommand::OpenAndX => {
                builder
                    .param_u8(0xFF)
                    .param_u8(0)
                    .param_u16(0)
                    .param_u16(FILE_ID)
                    .param_u16(0x20)
                    .param_u32(0)
                    .param_u32(self.config.file.len() as u32)
                    .param_u16(request.word(4))
                    .param_u16(0) // ResourceType: disk file
                    .param_u16(0)
                    .param_u16(0x0001) // Action: opened
                    .param_u32(0)
                    .param_u16(0);
            }
            SmbCommand::NtCreateAndX => {
                builder
                    .param_u8(0xFF)
                    .param_u8(0)
                    .param_u16(0)
                    .param_u8(0) // OplockLevel
                    .param_u16(FILE_ID)
                    .param_u32(1) // CreateAction: opened
                    .param_u64(0)
                    .param_u64(0)
                    .param_u64(0)
                    .param_u64(0)
                    .param_u32(0x80)
                    .param_u64(self.config.file.len() as u64) // AllocationSize
                    .param_u64(self.config.file.len() as u64) // EndOfFile
                    .param_u16(0)
                    .param_u16(0)
                    .param_u8(0);
            }
            SmbCommand::Read => {
                let nth = self.reads;
                self.reads += 1;
                if self.config.fault == Some(Fault::ReadError(nth)) {
                    return error_reply(reply, 0x01, dos_codes::ERR_BAD_FID);
                }

                let mut count = request.word(1) as usize;
                if let Some(Fault::ShortReads(cap)) = self.config.fault {
                    count = count.min(cap);
                }
                let offset = LittleEndian::read_u32(&request.parameters[4..]) as usize;
                let start = offset.min(self.config.file.len());
                let end = (start + count).min(self.config.file.len());
                let chunk = &self.config.file[start..end];

                builder
                    .param_u16(chunk.len() as u16)
                    .param_u64(0);
                builder
                    .data_u8(0x01)
                    .data_bytes(&(chunk.len() as u16).to_le_bytes())
                    .data_bytes(chunk);
            }
            SmbCommand::Close => {}
            other => panic!("mock server does not handle {:?}", other),
        }
        builder.build().unwrap()
    }
}

fn error_reply(mut header: SmbHeader, class: u8, code: u16) -> Vec<u8> {
    header.error_class = class;
    header.error_code = code;
    SmbRequestBuilder::new(header).build().unwrap()
}

/// Deterministic file contents
pub fn test_file(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
