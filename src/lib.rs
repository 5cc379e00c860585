//! # courier
//!
//! Declarative HTTP clients. A contract describes methods and the requests
//! they stand for; courier turns the contract into a client whose calls are
//! expanded into requests, sent through a transport and decoded back into the
//! declared return types.
//!
//! ```no_run
//! use courier::contract::{AnnotationContract, Contract, ContractType, MethodDecl, ParameterDecl, RequestAnnotation};
//! use courier::types::{ClassInfo, DeclaredType, TypeUniverse};
//! use courier::{DispatchTarget, HttpMethod, Value};
//! use std::sync::Arc;
//!
//! # async fn run() -> courier::Result<()> {
//! let mut universe = TypeUniverse::with_builtins();
//! universe.define(ClassInfo::new("GitHub"));
//!
//! let string = || DeclaredType::class("String");
//! let contract = ContractType::new("GitHub").method(
//!     MethodDecl::new("readme", string())
//!         .annotate(RequestAnnotation::to(HttpMethod::Get, "/repos/{owner}/{repo}/readme"))
//!         .parameter(ParameterDecl::new(string()).param("owner"))
//!         .parameter(ParameterDecl::new(string()).param("repo")),
//! );
//!
//! let definitions = AnnotationContract::new(Arc::new(universe)).apply(&contract)?;
//! let client = DispatchTarget::builder(&contract, &definitions)
//!     .base_url("https://api.github.com")?
//!     .build()?;
//!
//! let readme = client
//!     .invoke_named("readme", vec![Value::from("rust-lang"), Value::from("rust")])
//!     .await?;
//! # let _ = readme;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod contract;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod template;
pub mod types;
pub mod value;

pub use config::ClientOptions;
pub use contract::{AnnotationContract, Contract, ContractType, MethodDefinition, MethodKey};
pub use dispatch::{DispatchError, DispatchTarget, Executor, Reply};
pub use error::{Error, Result};
pub use http::{HttpMethod, RequestSpec, Response};
pub use template::{ExpanderRegistry, UriTemplate, Variables};
pub use types::{TypeDescription, TypeResolver, TypeUniverse};
pub use value::{Bean, Value};
