#![allow(dead_code)]

use async_trait::async_trait;
use courier::contract::{AnnotationContract, Contract, ContractType, MethodDefinition};
use courier::http::{RequestSpec, Response, Transport, TransportError};
use courier::types::{ClassInfo, DeclaredType, TypeUniverse};
use std::sync::{Arc, Mutex};

/// Transport that records requests and answers every call with the same
/// response
pub struct RecordingTransport {
    status: u16,
    body: String,
    requests: Mutex<Vec<RequestSpec>>,
}

impl RecordingTransport {
    pub fn new(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RequestSpec> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn last(&self) -> RequestSpec {
        self.requests().pop().expect("at least one request")
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: RequestSpec) -> Result<Response, TransportError> {
        self.requests.lock().expect("requests lock").push(request);
        Ok(Response::new(self.status).with_body(self.body.clone()))
    }
}

pub fn string() -> DeclaredType {
    DeclaredType::class("String")
}

/// A universe with the built-ins plus the given contract classes
pub fn universe(contracts: &[&str]) -> Arc<TypeUniverse> {
    let mut universe = TypeUniverse::with_builtins();
    for contract in contracts {
        universe.define(ClassInfo::new(*contract));
    }
    Arc::new(universe)
}

pub fn process(contract: &ContractType) -> anyhow::Result<Vec<MethodDefinition>> {
    let processor = AnnotationContract::new(universe(&[contract.name.as_str()]));
    Ok(processor.apply(contract)?)
}
