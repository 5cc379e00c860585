mod common;

use common::{RecordingTransport, process, string};
use courier::contract::{ContractType, DefaultMethod, MethodDecl, ParameterDecl, RequestAnnotation};
use courier::http::HttpMethod;
use courier::{DispatchTarget, Executor, Value};
use futures::future::join_all;
use std::sync::Arc;

fn contract() -> ContractType {
    ContractType::new("Counter")
        .annotate(RequestAnnotation::new().value("/counters"))
        .method(
            MethodDecl::new("bump", string())
                .annotate(RequestAnnotation::to(HttpMethod::Post, "/{name}"))
                .parameter(ParameterDecl::new(string()).param("name")),
        )
        .method(
            MethodDecl::new("describe", string()).with_default(DefaultMethod::new(|_| {
                Ok(Value::from("a counter client"))
            })),
        )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_share_one_client() -> anyhow::Result<()> {
    let contract = contract();
    let definitions = process(&contract)?;
    let transport = RecordingTransport::new(200, "ok");
    let client = Arc::new(
        DispatchTarget::builder(&contract, &definitions)
            .transport(transport.clone())
            .executor(Executor::current())
            .build()?,
    );

    let calls = (0..32).map(|i| {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .invoke_named("bump", vec![Value::from(format!("c{i}"))])
                .await
        })
    });
    for result in join_all(calls).await {
        let reply = result??;
        assert_eq!(reply.into_value(), Some(Value::from("ok")));
    }

    let mut uris: Vec<String> = transport
        .requests()
        .iter()
        .map(|r| r.uri().to_string())
        .collect();
    uris.sort();
    uris.dedup();
    assert_eq!(uris.len(), 32);
    assert!(uris.iter().all(|uri| uri.starts_with("/counters/c")));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_default_method_binding() -> anyhow::Result<()> {
    let contract = contract();
    let definitions = process(&contract)?;
    let transport = RecordingTransport::new(200, "unused");
    let client = Arc::new(
        DispatchTarget::builder(&contract, &definitions)
            .transport(transport.clone())
            .build()?,
    );
    assert_eq!(client.bound_handlers(), 1);

    let calls = (0..16).map(|_| {
        let client = client.clone();
        tokio::spawn(async move { client.invoke_named("describe", vec![]).await })
    });
    for result in join_all(calls).await {
        let reply = result??;
        assert_eq!(reply.into_value(), Some(Value::from("a counter client")));
    }

    assert_eq!(client.bound_handlers(), 2);
    assert!(transport.requests().is_empty());
    Ok(())
}
