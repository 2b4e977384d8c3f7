mod common;

use std::sync::Arc;

use drydock_core::{ResourceType, Status};
use drydock_engine::{Engine, EngineError, StateDocument};

use common::{test_home, MockFactory, Op};

const SINGLE_FILE: &str = r#"
blueprint:
  title: single container
resources:
  - name: onprem
    type: network
    subnet: 10.5.0.0/16
  - name: consul
    type: container
    depends_on: [network.onprem]
    image:
      name: consul:1.8.1
"#;

/// Eight declared resources; the synthesized image cache makes nine.
const SINGLE_K3S: &str = r#"
resources:
  - name: cloud
    type: network
    subnet: 10.5.0.0/16
  - name: k3s
    type: k8s_cluster
    depends_on: [network.cloud]
    networks:
      - name: network.cloud
  - name: consul
    type: helm
    depends_on: [k8s_cluster.k3s]
    cluster: k8s_cluster.k3s
    chart: hashicorp/consul
  - name: vault
    type: helm
    depends_on: [k8s_cluster.k3s]
    cluster: k8s_cluster.k3s
    chart: hashicorp/vault
  - name: consul-http
    type: ingress
    depends_on: [helm.consul]
    target: k8s_cluster.k3s
    ports: [{ local: "8500" }]
  - name: consul-lan
    type: ingress
    depends_on: [helm.consul]
    target: k8s_cluster.k3s
    ports: [{ local: "8301" }]
  - name: vault-http
    type: ingress
    depends_on: [helm.vault]
    target: k8s_cluster.k3s
    ports: [{ local: "8200" }]
  - name: KUBECONFIG
    type: output
    depends_on: [k8s_cluster.k3s]
    value: /tmp/kubeconfig
"#;

const FAILED_STATE: &str = r#"
{
  "blueprint": null,
  "resources": [
    { "name": "dc1", "status": "failed", "subnet": "10.15.0.0/16", "type": "network" }
  ]
}
"#;

const MODIFICATION_STATE: &str = r#"
{
  "blueprint": null,
  "resources": [
    { "name": "dc1", "status": "pending_modification", "subnet": "10.15.0.0/16", "type": "network" }
  ]
}
"#;

const PENDING_UPDATE_STATE: &str = r#"
{
  "blueprint": null,
  "resources": [
    { "name": "dc1", "status": "pending_update", "subnet": "10.15.0.0/16", "type": "network" }
  ]
}
"#;

const DISABLED_STATE: &str = r#"
{
  "blueprint": null,
  "resources": [
    { "name": "dc1", "status": "pending_creation", "subnet": "10.15.0.0/16", "type": "network" },
    { "name": "dc1", "status": "disabled", "disabled": true, "type": "container" }
  ]
}
"#;

fn write_config(home: &common::TestHome, contents: &str) -> String {
    let path = home.dir.path().join("config.yaml");
    std::fs::write(&path, contents).unwrap();
    path.to_string_lossy().to_string()
}

fn engine_with(factory: &Arc<MockFactory>) -> Engine {
    Engine::new(common::stub_clients(), factory.clone())
}

fn position_of(calls: &[String], name: &str) -> usize {
    calls
        .iter()
        .position(|c| c == name)
        .unwrap_or_else(|| panic!("{name} not found in {calls:?}"))
}

#[tokio::test]
async fn test_apply_creates_all_declared_resources_and_the_cache() {
    let home = test_home(None);
    let config = write_config(&home, SINGLE_FILE);

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    let blueprint = engine.apply(&config).await.unwrap();
    assert_eq!(blueprint.unwrap().title.unwrap(), "single container");

    let creates = factory.names_for(Op::Create);
    assert_eq!(creates.len(), 3);
    assert_eq!(creates[0], "onprem");
    assert_eq!(factory.count(Op::Destroy), 0);

    assert_eq!(engine.resource_count_for_type(ResourceType::ImageCache), 1);

    let state = StateDocument::load().unwrap();
    assert_eq!(state.resources.len(), 3);
    for resource in state.resources.iter() {
        assert_eq!(resource.status, Status::Applied, "{}", resource.fqdn());
    }
}

#[tokio::test]
async fn test_apply_calls_providers_in_dependency_order() {
    let home = test_home(None);
    let config = write_config(&home, SINGLE_K3S);

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    engine.apply(&config).await.unwrap();

    let creates = factory.names_for(Op::Create);
    assert_eq!(creates.len(), 9);

    let position = |name: &str| position_of(&creates, name);

    assert!(position("cloud") < position("docker-cache"));
    assert!(position("docker-cache") < position("k3s"));
    for dependent in ["consul", "vault", "KUBECONFIG"] {
        assert!(position("k3s") < position(dependent), "{dependent}");
    }
    assert!(position("consul") < position("consul-http"));
    assert!(position("consul") < position("consul-lan"));
    assert!(position("vault") < position("vault-http"));
}

#[tokio::test]
async fn test_apply_recreates_failed_resources() {
    let _home = test_home(Some(FAILED_STATE));

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    engine.apply("").await.unwrap();

    assert_eq!(factory.names_for(Op::Destroy), vec!["dc1"]);
    // dc1 plus the always-created image cache
    assert_eq!(factory.count(Op::Create), 2);

    let state = StateDocument::load().unwrap();
    assert_eq!(
        state.resources.find_resource("network.dc1").unwrap().status,
        Status::Applied
    );
}

#[tokio::test]
async fn test_apply_recreates_modified_resources() {
    let _home = test_home(Some(MODIFICATION_STATE));

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    engine.apply("").await.unwrap();

    assert_eq!(factory.names_for(Op::Destroy), vec!["dc1"]);
    assert_eq!(factory.count(Op::Create), 2);
}

#[tokio::test]
async fn test_apply_leaves_pending_update_resources_alone() {
    let _home = test_home(Some(PENDING_UPDATE_STATE));

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    engine.apply("").await.unwrap();

    // only the image cache; pending_update is already reconciled
    assert_eq!(factory.names_for(Op::Create), vec!["docker-cache"]);
    assert_eq!(factory.count(Op::Destroy), 0);
}

#[tokio::test]
async fn test_apply_never_touches_disabled_resources() {
    let _home = test_home(Some(DISABLED_STATE));

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    engine.apply("").await.unwrap();

    assert_eq!(factory.count(Op::Destroy), 0);
    let creates = factory.names_for(Op::Create);
    assert_eq!(creates.len(), 2, "network and cache only: {creates:?}");

    let state = StateDocument::load().unwrap();
    assert_eq!(
        state.resources.find_resource("container.dc1").unwrap().status,
        Status::Disabled
    );
}

#[tokio::test]
async fn test_second_apply_is_idempotent() {
    let home = test_home(None);
    let config = write_config(&home, SINGLE_FILE);

    let first = Arc::new(MockFactory::new());
    engine_with(&first).apply(&config).await.unwrap();
    assert_eq!(first.count(Op::Create), 3);

    let second = Arc::new(MockFactory::new());
    engine_with(&second).apply(&config).await.unwrap();
    assert_eq!(second.count(Op::Create), 0);
    assert_eq!(second.count(Op::Destroy), 0);
}

#[tokio::test]
async fn test_apply_failure_stops_scheduling() {
    let home = test_home(None);
    let config = write_config(&home, SINGLE_K3S);

    let factory = Arc::new(MockFactory::failing(&[("cloud", "boom")]));
    let engine = engine_with(&factory);

    let err = engine.apply(&config).await.unwrap_err();
    assert!(matches!(err, EngineError::Provider { .. }), "{err}");
    assert!(err.to_string().contains("boom"));

    // cloud is the only leaf, so nothing else was ever scheduled
    assert_eq!(factory.names_for(Op::Create), vec!["cloud"]);

    // the partial run is persisted so the next apply can resume
    let state = StateDocument::load().unwrap();
    assert_eq!(
        state.resources.find_resource("network.cloud").unwrap().status,
        Status::Failed
    );
    assert_eq!(
        state.resources.find_resource("k8s_cluster.k3s").unwrap().status,
        Status::PendingCreation
    );
}

#[tokio::test]
async fn test_apply_returns_error_when_recovery_fails() {
    let _home = test_home(Some(FAILED_STATE));

    let factory = Arc::new(MockFactory::failing(&[("dc1", "boom")]));
    let engine = engine_with(&factory);

    let err = engine.apply("").await.unwrap_err();
    assert!(err.to_string().contains("boom"));

    // best-effort destroy, then the create that failed again
    assert_eq!(factory.count(Op::Destroy), 1);
    assert_eq!(factory.names_for(Op::Create), vec!["dc1"]);

    let state = StateDocument::load().unwrap();
    assert_eq!(
        state.resources.find_resource("network.dc1").unwrap().status,
        Status::Failed
    );
}

#[tokio::test]
async fn test_parse_config_instantiates_no_providers() {
    let home = test_home(None);
    let config = write_config(&home, SINGLE_FILE);

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    let parsed = engine.parse_config(&config).unwrap();
    assert_eq!(parsed.resources.len(), 2);
    assert_eq!(engine.resource_count_for_type(ResourceType::Container), 1);

    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn test_apply_with_variables_reaches_the_parser() {
    let home = test_home(None);
    let config = write_config(
        &home,
        r#"
resources:
  - name: onprem
    type: network
    subnet: ${subnet}
"#,
    );

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    let vars = std::collections::HashMap::from([("subnet".to_string(), "10.9.0.0/16".to_string())]);
    engine
        .apply_with_variables(&config, &vars, None)
        .await
        .unwrap();

    let state = StateDocument::load().unwrap();
    let network = state.resources.find_resource("network.onprem").unwrap();
    assert_eq!(network.payload["subnet"], "10.9.0.0/16");
}

#[tokio::test]
async fn test_destroy_runs_in_reverse_dependency_order() {
    let home = test_home(None);
    let config = write_config(&home, SINGLE_K3S);

    engine_with(&Arc::new(MockFactory::new()))
        .apply(&config)
        .await
        .unwrap();

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);
    engine.destroy("", false).await.unwrap();

    let destroys = factory.names_for(Op::Destroy);
    assert_eq!(destroys.len(), 9);

    let position = |name: &str| position_of(&destroys, name);

    for dependent in [
        "consul",
        "vault",
        "consul-http",
        "vault-http",
        "consul-lan",
        "KUBECONFIG",
    ] {
        assert!(position(dependent) < position("k3s"), "{dependent}");
    }
    assert!(position("k3s") < position("docker-cache"));
    assert!(position("docker-cache") < position("cloud"));

    let state = StateDocument::load().unwrap();
    assert!(state.resources.is_empty());
    assert!(state.blueprint.is_none());
}

#[tokio::test]
async fn test_destroy_drops_disabled_and_never_created_resources() {
    let _home = test_home(Some(DISABLED_STATE));

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    engine.destroy("", true).await.unwrap();

    // neither resource ever fully existed, but destroy is tolerant and
    // is still driven for both before they leave the state
    assert_eq!(factory.count(Op::Destroy), 2);
    assert_eq!(factory.count(Op::Create), 0);

    let state = StateDocument::load().unwrap();
    assert!(state.resources.find_resource("container.dc1").is_err());
    assert!(state.resources.is_empty());
}

#[tokio::test]
async fn test_destroy_without_force_halts_at_the_failure() {
    let home = test_home(None);
    let config = write_config(&home, SINGLE_K3S);

    engine_with(&Arc::new(MockFactory::new()))
        .apply(&config)
        .await
        .unwrap();

    let factory = Arc::new(MockFactory::failing(&[("k3s", "boom")]));
    let engine = engine_with(&factory);

    let err = engine.destroy("", false).await.unwrap_err();
    assert!(err.to_string().contains("boom"));

    // the six dependents, then k3s; its own dependencies are never reached
    assert_eq!(factory.count(Op::Destroy), 7);

    let state = StateDocument::load().unwrap();
    assert_eq!(
        state.resources.find_resource("k8s_cluster.k3s").unwrap().status,
        Status::Failed
    );
    assert_eq!(
        state.resources.find_resource("network.cloud").unwrap().status,
        Status::Applied
    );
}

#[tokio::test]
async fn test_destroy_with_force_continues_past_failures() {
    let home = test_home(None);
    let config = write_config(&home, SINGLE_K3S);

    engine_with(&Arc::new(MockFactory::new()))
        .apply(&config)
        .await
        .unwrap();

    let factory = Arc::new(MockFactory::failing(&[("k3s", "boom")]));
    let engine = engine_with(&factory);

    let err = engine.destroy("", true).await.unwrap_err();
    assert!(err.to_string().contains("boom"));

    // every resource is attempted despite the failure
    assert_eq!(factory.count(Op::Destroy), 9);

    let state = StateDocument::load().unwrap();
    assert_eq!(state.resources.len(), 1, "only the failed resource remains");
    assert_eq!(
        state.resources.find_resource("k8s_cluster.k3s").unwrap().status,
        Status::Failed
    );
}

#[tokio::test]
async fn test_cancel_stops_scheduling_but_not_running_visits() {
    let home = test_home(None);
    let config = write_config(&home, SINGLE_FILE);

    let mut factory = MockFactory::new();
    let gate = factory.gate_for("onprem");
    let factory = Arc::new(factory);

    let engine = Arc::new(engine_with(&factory));

    let running = {
        let engine = engine.clone();
        let config = config.clone();
        tokio::spawn(async move { engine.apply(&config).await })
    };

    // wait until the network create is in flight, then cancel and let
    // it finish
    gate.started.notified().await;
    engine.cancel();
    gate.release.notify_one();

    let err = running.await.unwrap().unwrap_err();
    assert!(matches!(err, EngineError::Cancelled), "{err}");

    assert_eq!(factory.names_for(Op::Create), vec!["onprem"]);

    let state = StateDocument::load().unwrap();
    assert_eq!(
        state.resources.find_resource("network.onprem").unwrap().status,
        Status::Applied
    );
    assert_eq!(
        state.resources.find_resource("container.consul").unwrap().status,
        Status::PendingCreation
    );
}

#[tokio::test]
async fn test_apply_rejects_unknown_dependencies() {
    let home = test_home(None);
    let config = write_config(
        &home,
        r#"
resources:
  - name: consul
    type: container
    depends_on: [network.missing]
    image:
      name: consul:1.8.1
"#,
    );

    let factory = Arc::new(MockFactory::new());
    let engine = engine_with(&factory);

    let err = engine.apply(&config).await.unwrap_err();
    assert!(matches!(err, EngineError::Config(_)), "{err}");
    assert!(factory.calls().is_empty());
}

#[tokio::test]
async fn test_apply_rejects_cycles() {
    let home = test_home(None);
    let config = write_config(
        &home,
        r#"
resources:
  - name: a
    type: container
    depends_on: [container.b]
    image: { name: x }
  - name: b
    type: container
    depends_on: [container.a]
    image: { name: x }
"#,
    );

    let engine = engine_with(&Arc::new(MockFactory::new()));
    let err = engine.apply(&config).await.unwrap_err();
    assert!(matches!(err, EngineError::Cycle(_)), "{err}");
}
