#![cfg(unix)]

use std::sync::Arc;

use streamchan_bridge::{ExitReason, Reader, TypeRegistry, Value, Writer};
use tokio::net::UnixStream;

#[tokio::test]
async fn socket_pair_closes_and_joins_cleanly() {
    let (left, right) = UnixStream::pair().expect("socket pair should be creatable");
    let registry = Arc::new(TypeRegistry::new());

    let writer = Writer::new(left, Arc::clone(&registry));
    let mut reader = Reader::new(right, registry);

    for word in ["alpha", "beta", "gamma"] {
        writer
            .send(Value::new(word.to_string()))
            .await
            .expect("send should succeed");
    }
    for word in ["alpha", "beta", "gamma"] {
        let value = reader.recv().await.expect("value should arrive");
        assert_eq!(value.downcast::<String>().expect("string"), word);
    }

    writer.close();
    let exit = writer.join().await.expect("writer should join");
    assert_eq!(exit.reason, ExitReason::Shutdown);
    assert_eq!(exit.transferred, 3);

    assert!(reader.recv().await.is_none());
    let exit = reader.join().await.expect("reader should join");
    assert_eq!(exit.reason, ExitReason::EndOfStream);
    assert_eq!(exit.transferred, 3);
    assert_eq!(exit.faults, 0);
}

#[tokio::test]
async fn split_halves_carry_both_directions() {
    let (left, right) = UnixStream::pair().expect("socket pair should be creatable");
    let registry = Arc::new(TypeRegistry::new());

    let (left_read, left_write) = left.into_split();
    let (right_read, right_write) = right.into_split();

    let ping = Writer::new(left_write, Arc::clone(&registry));
    let mut pong_in = Reader::new(right_read, Arc::clone(&registry));
    let pong = Writer::new(right_write, Arc::clone(&registry));
    let mut ping_in = Reader::new(left_read, registry);

    ping.send(Value::new(1u64)).await.expect("ping should send");
    let got = pong_in.recv().await.expect("ping should arrive");
    let next = got.downcast::<u64>().expect("u64") + 1;
    pong.send(Value::new(next)).await.expect("pong should send");
    let back = ping_in.recv().await.expect("pong should arrive");
    assert_eq!(back.downcast::<u64>().expect("u64"), 2);

    ping.close();
    pong.close();
    for writer in [ping, pong] {
        let exit = writer.join().await.expect("writer should join");
        assert_eq!(exit.reason, ExitReason::Shutdown);
    }
    for reader in [pong_in, ping_in] {
        let exit = reader.join().await.expect("reader should join");
        assert_eq!(exit.reason, ExitReason::EndOfStream);
    }
}
