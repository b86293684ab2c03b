//! Stream relay tests
//!
//! Byte stream to event sequence behaviour, independent of any provider

use bytes::Bytes;
use futures::{stream, StreamExt};
use modelcompare::models::StreamEvent;
use modelcompare::services::relay::{RecordDecoder, StreamRelay};
use std::io;

type Chunk = Result<Bytes, io::Error>;

fn chunks(parts: &[&[u8]]) -> Vec<Chunk> {
    parts.iter().map(|p| Ok(Bytes::copy_from_slice(p))).collect()
}

async fn relay(chunks: Vec<Chunk>) -> Vec<StreamEvent> {
    StreamRelay::new(stream::iter(chunks)).collect().await
}

fn fragment(text: &str) -> StreamEvent {
    StreamEvent::TokenFragment(text.to_string())
}

const OPENAI_PAYLOAD: &str = concat!(
    "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"你好\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"，世界\"}}]}\n\n",
    "data: {\"choices\":[{\"delta\":{\"content\":\"! 👋\"}}]}\n\n",
    "data: [DONE]\n\n",
);

#[tokio::test]
async fn test_two_records_then_close() {
    let events = relay(chunks(&[
        b"data: {\"choices\":[{\"delta\":{\"content\":\"He\"}}]}\n\n",
        b"data: {\"choices\":[{\"delta\":{\"content\":\"llo\"}}]}\n\n",
    ]))
    .await;

    assert_eq!(events, vec![fragment("He"), fragment("llo"), StreamEvent::End]);
}

#[tokio::test]
async fn test_result_field() {
    let events = relay(chunks(&[
        "data: {\"id\":\"as-1\",\"result\":\"嗨\",\"is_end\":true}\n\n".as_bytes(),
    ]))
    .await;

    assert_eq!(events, vec![fragment("嗨"), StreamEvent::End]);
}

#[tokio::test]
async fn test_done_marker_is_neither_fragment_nor_end() {
    // [DONE] followed by more data: the stream only ends on close
    let events = relay(chunks(&[
        b"data: {\"result\":\"a\"}\n",
        b"data: [DONE]\n",
        b"data: {\"result\":\"b\"}\n",
    ]))
    .await;

    assert_eq!(events, vec![fragment("a"), fragment("b"), StreamEvent::End]);
}

#[tokio::test]
async fn test_malformed_record_is_skipped() {
    let events = relay(chunks(&[
        b"data: {\"result\":\"one\"}\n\n",
        b"data: {\"result\": oops\n\n",
        b"data: {\"result\":\"two\"}\n\n",
    ]))
    .await;

    assert_eq!(events, vec![fragment("one"), fragment("two"), StreamEvent::End]);
}

#[tokio::test]
async fn test_empty_stream_ends() {
    assert_eq!(relay(Vec::new()).await, vec![StreamEvent::End]);
}

#[tokio::test]
async fn test_exactly_one_terminal_event() {
    let ok = relay(chunks(&[OPENAI_PAYLOAD.as_bytes()])).await;
    let failed = relay(vec![
        Ok(Bytes::from_static(b"data: {\"result\":\"x\"}\n")),
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed early")),
    ])
    .await;

    for events in [ok, failed] {
        let terminals = events.iter().filter(|e| e.is_terminal()).count();
        assert_eq!(terminals, 1);
        assert!(events.last().unwrap().is_terminal());
    }
}

#[tokio::test]
async fn test_read_error_synthesizes_error_event() {
    let events = relay(vec![
        Ok(Bytes::from_static(b"data: {\"result\":\"partial\"}\n")),
        Err(io::Error::new(io::ErrorKind::ConnectionAborted, "aborted")),
    ])
    .await;

    assert_eq!(events[0], fragment("partial"));
    match &events[1] {
        StreamEvent::Error(message) => assert!(message.contains("aborted")),
        other => panic!("Expected error event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_chunk_boundary_insensitive() {
    let bytes = OPENAI_PAYLOAD.as_bytes();
    let whole = relay(chunks(&[bytes])).await;
    assert_eq!(
        whole,
        vec![fragment("你好"), fragment("，世界"), fragment("! 👋"), StreamEvent::End]
    );

    for split in 1..bytes.len() {
        let events = relay(chunks(&[&bytes[..split], &bytes[split..]])).await;
        assert_eq!(events, whole, "split at byte {}", split);
    }
}

#[tokio::test]
async fn test_byte_at_a_time() {
    let bytes = OPENAI_PAYLOAD.as_bytes();
    let parts: Vec<&[u8]> = bytes.chunks(1).collect();

    let events = relay(chunks(&parts)).await;
    assert_eq!(events, relay(chunks(&[bytes])).await);
}

#[test]
fn test_crlf_records() {
    let mut decoder = RecordDecoder::new();
    let fragments = decoder.feed(b"data: {\"result\":\"a\"}\r\n\r\ndata: {\"result\":\"b\"}\r\n");
    assert_eq!(fragments, vec!["a".to_string(), "b".to_string()]);
    assert!(decoder.finish().is_empty());
}

#[test]
fn test_non_data_records_ignored() {
    let mut decoder = RecordDecoder::new();
    let fragments = decoder.feed(b": keep-alive\nevent: message\nid: 7\ndata: {\"result\":\"z\"}\n");
    assert_eq!(fragments, vec!["z".to_string()]);
}
