// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_notify_adapter_records_calls() {
    let adapter = FakeNotifyAdapter::new();
    adapter.notify("title", "message").await.unwrap();
    let calls = adapter.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].title, "title");
    assert_eq!(calls[0].message, "message");
}
