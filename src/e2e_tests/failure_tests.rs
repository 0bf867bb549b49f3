//! Failure handling: nothing is registered for a failed open, and reads
//! report what they transferred before failing

use super::mock_server::{test_file, Fault, MockConfig, MockSmbServer};
use super::read_tests::client_for;
use crate::client::{FileHandle, HandleRegistry, OpenParams, OpenStrategyKind};
use crate::error::{dos_codes, Error, SmbErrorClass};
use crate::protocol::access::CreationDisposition;
use crate::protocol::constants::SmbCommand;
use std::time::{Duration, Instant};

#[tokio::test]
async fn test_bad_unc_fails_before_any_io() {
    let server = MockSmbServer::start(MockConfig::serving(test_file(10))).await;
    let client = client_for(&server, OpenStrategyKind::Auto);

    for unc in [r"\\127.0.0.1", r"\\127.0.0.1\public", r"127.0.0.1\public\f"] {
        assert_eq!(
            client.create_file(unc, &OpenParams::read_existing()).await,
            FileHandle::INVALID
        );
        assert!(matches!(
            client.open(unc, &OpenParams::read_existing()).await,
            Err(Error::InvalidPath(_))
        ));
    }

    assert_eq!(server.connections(), 0);
    assert!(client.registry().is_empty().await);
}

#[tokio::test]
async fn test_legacy_create_rejected_before_any_io() {
    let server = MockSmbServer::start(MockConfig::serving(test_file(10))).await;
    let client = client_for(&server, OpenStrategyKind::Legacy);

    let params = OpenParams {
        disposition: CreationDisposition::CreateAlways,
        ..OpenParams::read_existing()
    };
    assert!(matches!(
        client.open(&server.unc("new.txt"), &params).await,
        Err(Error::InvalidParameter(_))
    ));
    assert_eq!(server.connections(), 0);
}

#[tokio::test]
async fn test_session_request_timeout() {
    let server = MockSmbServer::start(
        MockConfig::serving(test_file(10)).with_fault(Fault::SilentSession),
    )
    .await;
    let client = client_for(&server, OpenStrategyKind::Auto);

    let started = Instant::now();
    let result = client
        .open(&server.unc("f.bin"), &OpenParams::read_existing())
        .await;
    assert!(matches!(result, Err(Error::Timeout)));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(client.registry().is_empty().await);
}

#[tokio::test]
async fn test_session_rejected() {
    let server = MockSmbServer::start(
        MockConfig::serving(test_file(10)).with_fault(Fault::RejectSession),
    )
    .await;
    let client = client_for(&server, OpenStrategyKind::Auto);

    let result = client
        .open(&server.unc("f.bin"), &OpenParams::read_existing())
        .await;
    assert!(matches!(result, Err(Error::SessionRejected(_))));
}

#[tokio::test]
async fn test_out_of_bounds_word_count_fails_cleanly() {
    for command in [SmbCommand::Negotiate, SmbCommand::TreeConnectAndX] {
        let server = MockSmbServer::start(
            MockConfig::serving(test_file(10)).with_fault(Fault::BadWordCount(command)),
        )
        .await;
        let client = client_for(&server, OpenStrategyKind::Auto);

        let result = client
            .open(&server.unc("f.bin"), &OpenParams::read_existing())
            .await;
        assert!(matches!(result, Err(Error::ParseError(_))), "{:?}", command);
        assert_eq!(server.commands().last(), Some(&command));
        assert!(client.registry().is_empty().await);
    }
}

#[tokio::test]
async fn test_smb_error_aborts_open() {
    let server = MockSmbServer::start(
        MockConfig::serving(test_file(10)).with_fault(Fault::Deny(SmbCommand::NtCreateAndX)),
    )
    .await;
    let client = client_for(&server, OpenStrategyKind::Auto);

    match client
        .open(&server.unc("secret.txt"), &OpenParams::read_existing())
        .await
    {
        Err(Error::Smb { class, code }) => {
            assert_eq!(class, SmbErrorClass::Dos);
            assert_eq!(code, dos_codes::ERR_NO_ACCESS);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(client.registry().is_empty().await);
}

#[tokio::test]
async fn test_read_failure_keeps_partial_count() {
    let file = test_file(4000);
    let server =
        MockSmbServer::start(MockConfig::serving(file.clone()).with_fault(Fault::ReadError(2)))
            .await;
    let client = client_for(&server, OpenStrategyKind::Auto);
    let handle = client
        .open(&server.unc("f.bin"), &OpenParams::read_existing())
        .await
        .unwrap();

    let mut buffer = vec![0u8; 4096];
    let outcome = client.read_file(handle, &mut buffer).await;
    assert_eq!(outcome.bytes_read, 2048);
    assert_eq!(&buffer[..2048], &file[..2048]);
    assert!(matches!(outcome.error, Some(Error::Smb { .. })));

    // Offset reflects the bytes that did arrive
    assert_eq!(client.registry().get_info(handle).await.unwrap().offset, 2048);
    assert_eq!(server.reads().len(), 3);
}
