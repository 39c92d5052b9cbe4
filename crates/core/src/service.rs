//! Line-oriented JSON protocol over a [`Ledger`].
//!
//! A request is an object keyed by the operation name, e.g.
//! `{"record": {"asset": "..", "from": "..", "to": "..", "amount": 5}}`, or a
//! bare string for operations without arguments (`"summary"`). Gated
//! operations carry the calling identity explicitly in `caller`.
//!
//! Externally tagged on purpose: internally tagged enums buffer their content
//! and cannot carry amounts above `u64::MAX`.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::engine::Ledger;
use crate::error::{ErrorKind, LedgerError};
use crate::events::LedgerEvent;
use crate::time_source::TimeSource;
use crate::types::{
    Address, AssetRecord, LedgerSummary, SnapshotId, SnapshotRecord, TransactionRecord, TxId,
};

fn default_tx_type() -> String {
    "transfer".to_owned()
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Request {
    Register {
        caller: Address,
        asset: Address,
        name: String,
        symbol: String,
        total_supply: u128,
    },
    SetActive {
        caller: Address,
        asset: Address,
        active: bool,
    },
    GetAsset {
        asset: Address,
    },
    Record {
        asset: Address,
        from: Address,
        to: Address,
        amount: u128,
        #[serde(default = "default_tx_type")]
        tx_type: String,
    },
    GetTransaction {
        id: TxId,
    },
    ListForAsset {
        asset: Address,
    },
    CreateSnapshot {
        caller: Address,
        asset: Address,
        volume_24h: u128,
        avg_tx_size: u128,
    },
    GetSnapshot {
        id: SnapshotId,
    },
    TransferPrivilege {
        caller: Address,
        new_identity: Address,
    },
    IsHolder {
        asset: Address,
        address: Address,
    },
    Summary,
    RegisteredAssets,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum Reply {
    Asset(AssetRecord),
    Transaction(TransactionRecord),
    Snapshot(SnapshotRecord),
    Summary(LedgerSummary),
    Addresses(Vec<Address>),
    Ids(Vec<u64>),
    Id(u64),
    Flag(bool),
    Done(()),
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Response {
    Ok(Reply),
    Error(ErrorBody),
}

impl From<Result<Reply, LedgerError>> for Response {
    fn from(result: Result<Reply, LedgerError>) -> Self {
        match result {
            Ok(reply) => Response::Ok(reply),
            Err(e) => Response::Error(ErrorBody {
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    }
}

impl Response {
    /// Reply for a line that could not be decoded into a [`Request`].
    pub fn malformed(err: &serde_json::Error) -> Self {
        Response::Error(ErrorBody {
            kind: ErrorKind::InvalidInput,
            message: format!("malformed request: {err}"),
        })
    }
}

/// Envelope for a notification written alongside responses.
#[derive(Serialize, Debug)]
pub struct Notification<'a> {
    pub event: &'a LedgerEvent,
}

pub fn handle<T: TimeSource>(ledger: &Ledger<T>, request: Request) -> Response {
    dispatch(ledger, request).into()
}

/// Answer one protocol line.
///
/// The output is the response line followed by one `{"event": ..}` line per
/// notification waiting on `events`, each newline-terminated. A line that is
/// not a valid request gets an `InvalidInput` response. Blank lines produce
/// no output.
pub fn respond_line<T: TimeSource>(
    ledger: &Ledger<T>,
    events: &mut broadcast::Receiver<LedgerEvent>,
    line: &str,
) -> serde_json::Result<String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(String::new());
    }
    let response = match serde_json::from_str::<Request>(line) {
        Ok(request) => handle(ledger, request),
        Err(e) => {
            tracing::debug!(error = %e, "malformed request");
            Response::malformed(&e)
        }
    };

    let mut out = serde_json::to_string(&response)?;
    out.push('\n');
    drain_events(events, &mut out)?;
    Ok(out)
}

fn drain_events(
    events: &mut broadcast::Receiver<LedgerEvent>,
    out: &mut String,
) -> serde_json::Result<()> {
    loop {
        match events.try_recv() {
            Ok(event) => {
                out.push_str(&serde_json::to_string(&Notification { event: &event })?);
                out.push('\n');
            }
            Err(TryRecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event buffer overflowed; notifications dropped");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return Ok(()),
        }
    }
}

fn dispatch<T: TimeSource>(ledger: &Ledger<T>, request: Request) -> Result<Reply, LedgerError> {
    let reply = match request {
        Request::Register {
            caller,
            asset,
            name,
            symbol,
            total_supply,
        } => Reply::Asset(ledger.register(&caller, asset, &name, &symbol, total_supply)?),
        Request::SetActive {
            caller,
            asset,
            active,
        } => Reply::Asset(ledger.set_active(&caller, &asset, active)?),
        Request::GetAsset { asset } => Reply::Asset(ledger.asset(&asset)?),
        Request::Record {
            asset,
            from,
            to,
            amount,
            tx_type,
        } => Reply::Id(ledger.record(asset, from, to, amount, &tx_type)?),
        Request::GetTransaction { id } => Reply::Transaction(ledger.transaction(id)?),
        Request::ListForAsset { asset } => Reply::Ids(ledger.transactions_for_asset(&asset)?),
        Request::CreateSnapshot {
            caller,
            asset,
            volume_24h,
            avg_tx_size,
        } => Reply::Id(ledger.create_snapshot(&caller, asset, volume_24h, avg_tx_size)?),
        Request::GetSnapshot { id } => Reply::Snapshot(ledger.snapshot(id)?),
        Request::TransferPrivilege {
            caller,
            new_identity,
        } => {
            ledger.transfer_privilege(&caller, new_identity)?;
            Reply::Done(())
        }
        Request::IsHolder { asset, address } => Reply::Flag(ledger.is_holder(&asset, &address)),
        Request::Summary => Reply::Summary(ledger.summary()),
        Request::RegisteredAssets => Reply::Addresses(ledger.registered_assets()),
    };
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{BroadcastSink, MemorySink};
    use crate::time_source::SharedMockTimeSource;
    use serde_json::json;

    const ADMIN: Address = Address::new([0xAD; 32]);
    const ASSET: Address = Address::new([0xA1; 32]);

    fn make_ledger() -> Ledger<SharedMockTimeSource> {
        Ledger::with_parts(ADMIN, SharedMockTimeSource::new(), MemorySink::new()).unwrap()
    }

    fn request(value: serde_json::Value) -> Request {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_register_and_record_over_protocol() {
        let ledger = make_ledger();

        let resp = handle(
            &ledger,
            request(json!({
                "register": {
                    "caller": ADMIN.to_string(),
                    "asset": ASSET.to_string(),
                    "name": "Foo",
                    "symbol": "FOO",
                    "total_supply": 1000
                }
            })),
        );
        assert!(matches!(resp, Response::Ok(Reply::Asset(ref a)) if a.symbol == "FOO"));

        let resp = handle(
            &ledger,
            request(json!({
                "record": {
                    "asset": ASSET.to_string(),
                    "from": Address::new([1; 32]).to_string(),
                    "to": Address::new([2; 32]).to_string(),
                    "amount": 50
                }
            })),
        );
        assert_eq!(resp, Response::Ok(Reply::Id(0)));
        assert_eq!(ledger.transaction(0).unwrap().tx_type, "transfer");

        let resp = handle(&ledger, Request::ListForAsset { asset: ASSET });
        assert_eq!(resp, Response::Ok(Reply::Ids(vec![0])));
    }

    #[test]
    fn test_errors_carry_kind() {
        let ledger = make_ledger();
        let resp = handle(
            &ledger,
            Request::CreateSnapshot {
                caller: Address::new([5; 32]),
                asset: ASSET,
                volume_24h: 1,
                avg_tx_size: 1,
            },
        );
        let Response::Error(body) = resp else {
            panic!("expected error, got {resp:?}");
        };
        assert_eq!(body.kind, ErrorKind::Unauthorized);

        let json = serde_json::to_value(Response::Error(body)).unwrap();
        assert_eq!(json["error"]["kind"], "Unauthorized");
    }

    #[test]
    fn test_response_wire_shape() {
        let json = serde_json::to_value(Response::Ok(Reply::Id(3))).unwrap();
        assert_eq!(json, json!({ "ok": 3 }));

        let json = serde_json::to_value(Response::Ok(Reply::Done(()))).unwrap();
        assert_eq!(json, json!({ "ok": null }));
    }

    #[test]
    fn test_unknown_op_is_malformed() {
        let err = serde_json::from_str::<Request>(r#"{"delete":{"id":1}}"#).unwrap_err();
        let resp = Response::malformed(&err);
        assert!(matches!(resp, Response::Error(ref b) if b.kind == ErrorKind::InvalidInput));
    }

    #[test]
    fn test_amounts_above_u64_parse() {
        let line = format!(
            r#"{{"create_snapshot":{{"caller":"{ADMIN}","asset":"{ASSET}","volume_24h":{},"avg_tx_size":1}}}}"#,
            u128::MAX
        );
        let req: Request = serde_json::from_str(&line).unwrap();
        assert!(matches!(req, Request::CreateSnapshot { volume_24h, .. } if volume_24h == u128::MAX));
    }

    #[test]
    fn test_unit_requests_are_bare_strings() {
        assert_eq!(
            serde_json::from_str::<Request>(r#""summary""#).unwrap(),
            Request::Summary
        );
    }

    fn broadcast_ledger() -> (
        Ledger<SharedMockTimeSource>,
        broadcast::Receiver<LedgerEvent>,
    ) {
        let sink = BroadcastSink::new(64);
        let rx = sink.subscribe();
        let ledger = Ledger::with_parts(ADMIN, SharedMockTimeSource::new(), sink).unwrap();
        (ledger, rx)
    }

    fn parse_lines(out: &str) -> Vec<serde_json::Value> {
        out.lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn register_line() -> String {
        json!({
            "register": {
                "caller": ADMIN.to_string(),
                "asset": ASSET.to_string(),
                "name": "Foo",
                "symbol": "FOO",
                "total_supply": 1000
            }
        })
        .to_string()
    }

    fn record_line(from: u8, to: u8, amount: u64) -> String {
        json!({
            "record": {
                "asset": ASSET.to_string(),
                "from": Address::new([from; 32]).to_string(),
                "to": Address::new([to; 32]).to_string(),
                "amount": amount
            }
        })
        .to_string()
    }

    #[test]
    fn test_response_followed_by_its_events() {
        let (ledger, mut rx) = broadcast_ledger();

        let lines = parse_lines(&respond_line(&ledger, &mut rx, &register_line()).unwrap());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["ok"]["symbol"], "FOO");
        assert_eq!(lines[1]["event"]["event"], "asset_registered");

        let lines = parse_lines(&respond_line(&ledger, &mut rx, &record_line(1, 2, 50)).unwrap());
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], json!({ "ok": 0 }));
        assert_eq!(lines[1]["event"]["event"], "transfer_recorded");
        assert_eq!(lines[1]["event"]["transaction_count"], 1);
        assert_eq!(lines[2]["event"]["event"], "holder_count_updated");
        assert_eq!(lines[2]["event"]["unique_holders"], 1);
        assert_eq!(lines[3]["event"]["unique_holders"], 2);
    }

    #[test]
    fn test_malformed_line_then_processing_continues() {
        let (ledger, mut rx) = broadcast_ledger();

        let lines = parse_lines(&respond_line(&ledger, &mut rx, "not json").unwrap());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["error"]["kind"], "InvalidInput");

        let lines = parse_lines(&respond_line(&ledger, &mut rx, &register_line()).unwrap());
        assert!(lines[0]["ok"].is_object());
        assert_eq!(ledger.asset_count(), 1);
    }

    #[test]
    fn test_rejected_request_emits_no_events() {
        let (ledger, mut rx) = broadcast_ledger();
        respond_line(&ledger, &mut rx, &register_line()).unwrap();

        let lines = parse_lines(&respond_line(&ledger, &mut rx, &record_line(1, 2, 0)).unwrap());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["error"]["kind"], "InvalidAmount");
        assert_eq!(ledger.transaction_count(), 0);
    }

    #[test]
    fn test_blank_line_is_silent() {
        let (ledger, mut rx) = broadcast_ledger();
        assert_eq!(respond_line(&ledger, &mut rx, "   ").unwrap(), "");
    }

    #[test]
    fn test_summary_and_listing() {
        let ledger = make_ledger();
        ledger.register(&ADMIN, ASSET, "Foo", "FOO", 1).unwrap();
        assert_eq!(
            handle(&ledger, Request::RegisteredAssets),
            Response::Ok(Reply::Addresses(vec![ASSET]))
        );
        assert_eq!(
            handle(&ledger, Request::Summary),
            Response::Ok(Reply::Summary(LedgerSummary {
                assets: 1,
                transactions: 0,
                snapshots: 0,
            }))
        );
    }
}
