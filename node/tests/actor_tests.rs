//! The single-writer actor and config loading from disk.

use std::io::Write;

use trustdao_governance::ProposalState;
use trustdao_node::{
    spawn_actor, Command, DaoNode, LogEntry, LogFormat, NodeConfig, NodeError, Query, QueryValue,
    Reply,
};
use trustdao_types::{NodeAddress, SystemClock};

fn addr(n: u8) -> NodeAddress {
    let mut bytes = [0u8; 20];
    bytes[19] = n;
    NodeAddress::from_bytes(bytes)
}

fn fast_config() -> NodeConfig {
    NodeConfig::from_toml_str(
        r#"
        queue_depth = 4

        [settings]
        "proposals.vote.delay.time" = 0
        "proposals.cooldown.time" = 0
        "#,
    )
    .unwrap()
}

#[tokio::test]
async fn actor_applies_concurrent_submissions_one_at_a_time() {
    let config = fast_config();
    let guardian = config.guardian().unwrap();
    let node = DaoNode::new(&config, SystemClock).unwrap();
    let (handle, task) = spawn_actor(node, config.queue_depth);

    for n in 1..=9 {
        handle
            .submit(LogEntry::at(0, Command::RegisterNode { node: addr(n) }))
            .await
            .unwrap();
        let reply = handle
            .submit(LogEntry::at(
                0,
                Command::BootstrapMember {
                    caller: guardian.clone(),
                    id: format!("node{n}"),
                    email: "ops@example.org".into(),
                    node: addr(n),
                },
            ))
            .await
            .unwrap();
        assert!(!reply.is_rejected());
    }

    let id = match handle
        .submit(LogEntry::at(
            1,
            Command::Propose {
                proposer: addr(1),
                message: "rotate".into(),
                payload: trustdao_governance::ProposalPayload::Leave { refund: addr(1) },
            },
        ))
        .await
        .unwrap()
    {
        Reply::Proposed { id } => id,
        other => panic!("unexpected reply {other:?}"),
    };

    // Nine voters race; ceil(9 * 0.51) = 5 votes decide it and the rest
    // must see AlreadyDecided, never a lost update.
    let mut voters = Vec::new();
    for n in 1..=9 {
        let handle = handle.clone();
        voters.push(tokio::spawn(async move {
            handle
                .submit(LogEntry::at(
                    2,
                    Command::Vote {
                        id,
                        voter: addr(n),
                        support: true,
                    },
                ))
                .await
                .unwrap()
        }));
    }
    let mut accepted = 0;
    let mut decided = 0;
    for voter in voters {
        match voter.await.unwrap() {
            Reply::Voted { .. } => accepted += 1,
            Reply::Rejected { .. } => decided += 1,
            other => panic!("unexpected reply {other:?}"),
        }
    }
    assert_eq!(accepted, 5);
    assert_eq!(decided, 4);

    let reply = handle
        .submit(LogEntry::at(2, Command::Query(Query::VotesFor { id })))
        .await
        .unwrap();
    assert_eq!(reply, Reply::Value(QueryValue::Count(5)));
    let reply = handle
        .submit(LogEntry::at(2, Command::Query(Query::ProposalState { id })))
        .await
        .unwrap();
    assert_eq!(reply, Reply::Value(QueryValue::State(ProposalState::Succeeded)));

    drop(handle);
    let node = task.await.unwrap();
    assert_eq!(node.dao().member_count(), 9);
    assert_eq!(node.rejected(), 4);
}

#[tokio::test]
async fn submit_after_stop_reports_actor_stopped() {
    let config = NodeConfig::default();
    let node = DaoNode::new(&config, SystemClock).unwrap();
    let (handle, task) = spawn_actor(node, 1);
    let other = handle.clone();
    task.abort();
    let _ = task.await;
    let err = other
        .submit(LogEntry::now(Command::Query(Query::MemberCount)))
        .await
        .unwrap_err();
    assert!(matches!(err, NodeError::ActorStopped));
    drop(handle);
}

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
guardian = "0x00000000000000000000000000000000000000AB"
log_format = "json"
log_level = "debug"
stop_on_error = true

[settings]
"members.minimum" = 4
"members.challenge.cost" = "2000000000000000000"
"#
    )
    .unwrap();

    let config = NodeConfig::from_toml_file(file.path()).unwrap();
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(config.log_level, "debug");
    assert!(config.stop_on_error);
    assert_eq!(config.guardian().unwrap(), addr(0xab));

    let mut node = DaoNode::new(&config, SystemClock).unwrap();
    let reply = node.apply(LogEntry::at(
        0,
        Command::Query(Query::Setting {
            key: trustdao_store::SettingKey::new("members", "members.challenge.cost"),
        }),
    ));
    assert_eq!(
        reply,
        Reply::Value(QueryValue::Setting(Some(trustdao_store::SettingValue::Uint(
            2_000_000_000_000_000_000
        ))))
    );
}

#[test]
fn missing_config_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = NodeConfig::from_toml_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, NodeError::Config(_)));
}
