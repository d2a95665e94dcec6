use std::collections::HashMap;
use std::sync::Arc;

use regsync::EtcdRegistry;
use regsync::Reconcile;
use regsync::RegistryConfig;
use regsync::ServiceTarget;
use serde_json::json;
use serde_json::Value;
use tempfile::tempdir;
use warp::http::StatusCode;
use warp::Filter;

use crate::common::registration;
use crate::common::service_config;

/// Answers plain reads from `keys` the way etcd v2 does; unknown keys get
/// error code 100.
fn fake_etcd(keys: HashMap<&'static str, Value>) -> String {
    let keys = Arc::new(keys);
    let route = warp::get()
        .and(warp::path("v2"))
        .and(warp::path("keys"))
        .and(warp::path::tail())
        .map(move |tail: warp::path::Tail| {
            let key = format!("/{}", tail.as_str());
            match keys.get(key.as_str()) {
                Some(node) => warp::reply::with_status(
                    warp::reply::json(&json!({"action": "get", "node": node})),
                    StatusCode::OK,
                ),
                None => warp::reply::with_status(
                    warp::reply::json(&json!({
                        "errorCode": 100,
                        "message": "Key not found",
                        "cause": key,
                        "index": 42
                    })),
                    StatusCode::NOT_FOUND,
                ),
            }
        });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    format!("http://{addr}")
}

fn leaf(
    key: &str,
    value: &str,
) -> Value {
    json!({"key": key, "value": value, "modifiedIndex": 7, "createdIndex": 7})
}

/// # Case: the heartOfGold registration served by an etcd v2 endpoint
///
/// Expected: the rendered configuration carries its name, URL, state and
/// buffering override
#[tokio::test]
async fn service_target_should_render_from_etcd_keys_api() {
    let heart_of_gold = registration("heartOfGold", "8.8.8.8");
    let endpoint = fake_etcd(HashMap::from([
        (
            "/services",
            json!({
                "key": "/services",
                "dir": true,
                "nodes": [{"key": "/services/heartOfGold", "dir": true, "modifiedIndex": 5}]
            }),
        ),
        (
            "/services/heartOfGold",
            json!({
                "key": "/services/heartOfGold",
                "dir": true,
                "nodes": [leaf("/services/heartOfGold/ces:heartOfGold:80", &heart_of_gold)]
            }),
        ),
        ("/state/heartOfGold", leaf("/state/heartOfGold", "installed")),
        (
            "/config/nginx/buffering/heartOfGold",
            leaf("/config/nginx/buffering/heartOfGold", "off"),
        ),
    ]));

    let registry = EtcdRegistry::new(&RegistryConfig {
        endpoints: vec![endpoint],
        ..Default::default()
    })
    .unwrap();

    let dir = tempdir().unwrap();
    let mut config = service_config(dir.path());
    std::fs::write(
        &config.template,
        "{{#each services}}{{name}} {{url}} {{state}} {{proxyBuffering}}\n{{/each}}",
    )
    .unwrap();
    config.tag = None;
    let target = ServiceTarget::new(Arc::new(registry), config);

    target.reconcile().await.unwrap();

    assert_eq!(
        std::fs::read_to_string(target.writer().target()).unwrap(),
        "heartOfGold http://8.8.8.8 installed off\n"
    );
}
