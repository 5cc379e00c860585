//! Call dispatch: routing invocations to method handlers

pub mod error;
pub mod exception;
pub mod handler;
pub mod reply;
pub mod target;

pub use error::DispatchError;
pub use exception::{ExceptionHandler, NoopExceptionHandler, RethrowExceptionHandler};
pub use handler::{GuardMethodHandler, HttpMethodHandler, MethodHandler};
pub use reply::{Executor, PendingReply, Reply};
pub use target::{DispatchTarget, TargetBuilder};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientOptions;
    use crate::contract::{
        AnnotationContract, Contract, ContractType, DefaultMethod, MethodDecl, MethodKey,
        ParameterDecl, RequestAnnotation,
    };
    use crate::error::Error;
    use crate::http::{
        DecodeError, HttpMethod, InterceptorError, JsonDecoder, MockTransport, RequestSpec,
        Response, TransportError,
    };
    use crate::template::{ExpansionContext, ExpansionError, ExpressionExpander};
    use crate::types::universe::ClassInfo;
    use crate::types::{DeclaredType, TypeUniverse};
    use crate::value::Value;
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn string() -> DeclaredType {
        DeclaredType::class("String")
    }

    fn contract() -> ContractType {
        ContractType::new("Api")
            .method(
                MethodDecl::new("get", string())
                    .annotate(RequestAnnotation::to(HttpMethod::Get, "/items/{id}"))
                    .annotate(crate::contract::Annotation::headers(["X-Item: {id}"]))
                    .parameter(ParameterDecl::new(string()).param("id")),
            )
            .method(
                MethodDecl::new("create", DeclaredType::class("Void"))
                    .annotate(RequestAnnotation::to(HttpMethod::Post, "/items"))
                    .parameter(ParameterDecl::new(string()).body()),
            )
            .method(
                MethodDecl::new("raw", DeclaredType::class("Response"))
                    .annotate(RequestAnnotation::new().value("/raw")),
            )
            .method(
                MethodDecl::new("later", DeclaredType::parameterized("Future", vec![string()]))
                    .annotate(RequestAnnotation::new().value("/later")),
            )
            .method(
                MethodDecl::new("greeting", string())
                    .parameter(ParameterDecl::new(string()))
                    .with_default(DefaultMethod::new(|args| {
                        let name = args.first().and_then(Value::as_str).unwrap_or("nobody");
                        Ok(Value::from(format!("hello {name}")))
                    })),
            )
            .method(MethodDecl::new("close", DeclaredType::class("Void")))
    }

    fn definitions(contract: &ContractType) -> Vec<crate::contract::MethodDefinition> {
        let mut universe = TypeUniverse::with_builtins();
        universe.define(ClassInfo::new("Api"));
        AnnotationContract::new(Arc::new(universe))
            .apply(contract)
            .expect("valid contract")
    }

    fn client(transport: Arc<MockTransport>) -> TargetBuilder {
        let contract = contract();
        let definitions = definitions(&contract);
        DispatchTarget::builder(&contract, &definitions)
            .transport(transport)
            .base_url("http://localhost:8080/v1")
            .expect("valid base url")
    }

    fn key(name: &str, parameters: &[&str]) -> MethodKey {
        MethodKey::new("Api", name, parameters.iter().copied())
    }

    struct UppercaseExpander;

    impl ExpressionExpander for UppercaseExpander {
        fn expand(
            &self,
            context: &ExpansionContext<'_>,
            value: &Value,
        ) -> Result<Option<String>, ExpansionError> {
            Ok(value
                .to_scalar_string()
                .map(|raw| context.encode(&raw.to_uppercase())))
        }
    }

    struct RefusingExpander;

    impl ExpressionExpander for RefusingExpander {
        fn expand(
            &self,
            context: &ExpansionContext<'_>,
            _value: &Value,
        ) -> Result<Option<String>, ExpansionError> {
            Err(ExpansionError::expander(context.spec.name.as_str(), "refused"))
        }
    }

    #[tokio::test]
    async fn test_get_expands_uri_and_headers() {
        let transport = Arc::new(MockTransport::new(vec![
            Response::new(200).with_body("found"),
        ]));
        let target = client(transport.clone()).build().expect("builds");

        let reply = target
            .invoke(&key("get", &["String"]), vec![Value::from("a b")])
            .await
            .expect("succeeds");
        assert_eq!(reply.into_value(), Some(Value::from("found")));

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method(), HttpMethod::Get);
        assert_eq!(requests[0].uri(), "http://localhost:8080/v1/items/a%20b");
        assert_eq!(requests[0].headers().first("x-item"), Some("a b"));
    }

    #[tokio::test]
    async fn test_body_is_encoded_and_void_decodes_to_null() {
        let transport = Arc::new(MockTransport::new(vec![Response::new(201).with_body("ignored")]));
        let target = client(transport.clone()).build().expect("builds");

        let reply = target
            .invoke_named("create", vec![Value::from("payload")])
            .await
            .expect("succeeds");
        assert_eq!(reply.into_value(), Some(Value::Null));

        let requests = transport.requests();
        assert_eq!(requests[0].method(), HttpMethod::Post);
        assert_eq!(requests[0].body(), Some(&b"payload"[..]));
    }

    #[tokio::test]
    async fn test_response_return_type_is_passed_through() {
        let transport = Arc::new(MockTransport::new(vec![
            Response::new(500).with_body("boom"),
        ]));
        let target = client(transport).build().expect("builds");

        let reply = target.invoke_named("raw", vec![]).await.expect("succeeds");
        let response = reply.into_response().expect("raw response");
        assert_eq!(response.status(), 500);
        assert_eq!(response.text().expect("text"), "boom");
    }

    #[tokio::test]
    async fn test_default_method_runs_without_transport() {
        let transport = Arc::new(MockTransport::new(vec![]));
        let target = client(transport.clone()).build().expect("builds");
        let before = target.bound_handlers();

        let greeting = key("greeting", &["String"]);
        for _ in 0..2 {
            let reply = target
                .invoke(&greeting, vec![Value::from("ada")])
                .await
                .expect("succeeds");
            assert_eq!(reply.into_value(), Some(Value::from("hello ada")));
        }
        assert_eq!(target.bound_handlers(), before + 1);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let target = client(Arc::new(MockTransport::new(vec![])))
            .exception_handler(Arc::new(NoopExceptionHandler))
            .build()
            .expect("builds");

        let result = target.invoke_named("close", vec![]).await;
        assert!(matches!(
            result,
            Err(Error::Dispatch(DispatchError::Unsupported { .. }))
        ));

        let unknown = target.invoke(&key("missing", &[]), vec![]).await;
        assert!(matches!(
            unknown,
            Err(Error::Dispatch(DispatchError::Unsupported { .. }))
        ));
    }

    #[tokio::test]
    async fn test_invoke_named_errors() {
        let contract = contract().method(
            MethodDecl::new("get", string())
                .annotate(RequestAnnotation::new().value("/items"))
                .parameter(ParameterDecl::new(DeclaredType::class("Int")).param("page")),
        );
        let definitions = definitions(&contract);
        let target = DispatchTarget::builder(&contract, &definitions)
            .transport(Arc::new(MockTransport::new(vec![])))
            .build()
            .expect("builds");

        assert!(matches!(
            target.invoke_named("nope", vec![]).await,
            Err(Error::Dispatch(DispatchError::UnknownMethod(_)))
        ));
        match target.invoke_named("get", vec![]).await {
            Err(Error::Dispatch(DispatchError::AmbiguousMethod { candidates, .. })) => {
                assert_eq!(candidates, vec!["Api#get(String)", "Api#get(Int)"]);
            }
            other => panic!("expected ambiguity, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_argument_count_is_checked() {
        let target = client(Arc::new(MockTransport::new(vec![])))
            .build()
            .expect("builds");
        let result = target.invoke(&key("get", &["String"]), vec![]).await;
        assert!(matches!(
            result,
            Err(Error::Dispatch(DispatchError::ArgumentCount {
                expected: 1,
                actual: 0,
                ..
            }))
        ));
    }

    #[tokio::test]
    async fn test_transport_error_keeps_context() {
        let target = client(Arc::new(MockTransport::failing("refused")))
            .build()
            .expect("builds");
        match target.invoke_named("raw", vec![]).await {
            Err(Error::Transport { method, uri, source }) => {
                assert_eq!(method, HttpMethod::Get);
                assert_eq!(uri, "http://localhost:8080/v1/raw");
                assert!(matches!(source, TransportError::Connect(_)));
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_exception_handler_sees_failures() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let handler = move |_error: Error| -> crate::error::Result<()> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let target = client(Arc::new(MockTransport::failing("refused")))
            .exception_handler(Arc::new(handler))
            .build()
            .expect("builds");

        let reply = target.invoke_named("raw", vec![]).await.expect("suppressed");
        assert_eq!(reply.into_value(), Some(Value::Null));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_interceptors_run_in_order_before_io() {
        let transport = Arc::new(MockTransport::new(vec![Response::new(200)]));
        let first = |request: &mut RequestSpec| -> Result<(), InterceptorError> {
            request.header("X-Order", "first");
            Ok(())
        };
        let second = |request: &mut RequestSpec| -> Result<(), InterceptorError> {
            request.header("X-Order", "second");
            Ok(())
        };
        let target = client(transport.clone())
            .interceptor(Arc::new(first))
            .interceptor(Arc::new(second))
            .build()
            .expect("builds");
        target.invoke_named("raw", vec![]).await.expect("succeeds");
        assert_eq!(
            transport.requests()[0].headers().get("x-order"),
            Some(&["first".to_string(), "second".to_string()][..])
        );

        let rejecting = Arc::new(MockTransport::new(vec![Response::new(200)]));
        let reject = |_request: &mut RequestSpec| -> Result<(), InterceptorError> {
            Err(InterceptorError::new("guard", "no"))
        };
        let target = client(rejecting.clone())
            .interceptor(Arc::new(reject))
            .build()
            .expect("builds");
        assert!(matches!(
            target.invoke_named("raw", vec![]).await,
            Err(Error::Interceptor(_))
        ));
        assert!(rejecting.requests().is_empty());
    }

    #[tokio::test]
    async fn test_decode_errors_can_be_suppressed() {
        let response = || Response::new(200).with_body("not json");

        let strict = client(Arc::new(MockTransport::new(vec![response()])))
            .decoder(Arc::new(JsonDecoder))
            .build()
            .expect("builds");
        assert!(matches!(
            strict.invoke_named("get", vec![Value::from("1")]).await,
            Err(Error::Decode(DecodeError::Json(_)))
        ));

        let lenient = client(Arc::new(MockTransport::new(vec![response()])))
            .decoder(Arc::new(JsonDecoder))
            .options(
                ClientOptions::new()
                    .with_base_url("http://localhost:8080/v1")
                    .expect("valid")
                    .with_suppress_decode_errors(true),
            )
            .build()
            .expect("builds");
        let reply = lenient
            .invoke_named("get", vec![Value::from("1")])
            .await
            .expect("suppressed");
        assert_eq!(reply.into_value(), Some(Value::Null));
    }

    #[tokio::test]
    async fn test_spawned_container_call_is_pending() {
        let transport = Arc::new(MockTransport::new(vec![
            Response::new(200).with_body("eventually"),
            Response::new(200).with_body("now"),
        ]));
        let target = client(transport)
            .executor(Executor::current())
            .build()
            .expect("builds");

        let reply = target.invoke_named("later", vec![]).await.expect("spawned");
        assert!(reply.is_pending());
        let resolved = reply.resolve().await.expect("completes");
        assert_eq!(resolved.into_value(), Some(Value::from("eventually")));

        let direct = target
            .invoke_named("get", vec![Value::from("1")])
            .await
            .expect("completes");
        assert_eq!(direct.into_value(), Some(Value::from("now")));
    }

    #[tokio::test]
    async fn test_custom_expander_and_unencoded_binding() {
        let contract = ContractType::new("Api").method(
            MethodDecl::new("pair", string())
                .annotate(RequestAnnotation::new().value("/x/{raw}/{up}"))
                .parameter(ParameterDecl::new(string()).param_with("raw", None, false))
                .parameter(ParameterDecl::new(string()).param_with(
                    "up",
                    Some(Arc::new(UppercaseExpander)),
                    true,
                )),
        );
        let definitions = definitions(&contract);
        let bindings = definitions[0].parameter_bindings();
        assert!(!bindings[&0].encoded());
        assert!(bindings[&0].expander().is_none());
        assert!(bindings[&1].encoded());
        assert!(bindings[&1].expander().is_some());

        let transport = Arc::new(MockTransport::new(vec![Response::new(200)]));
        let target = DispatchTarget::builder(&contract, &definitions)
            .transport(transport.clone())
            .build()
            .expect("builds");
        target
            .invoke_named("pair", vec![Value::from("a/b c"), Value::from("a c")])
            .await
            .expect("succeeds");
        assert_eq!(transport.requests()[0].uri(), "/x/a/b c/A%20C");
    }

    #[tokio::test]
    async fn test_inline_future_of_response_is_passed_through() {
        let contract = ContractType::new("Api").method(
            MethodDecl::new(
                "download",
                DeclaredType::parameterized("Future", vec![DeclaredType::class("Response")]),
            )
            .annotate(RequestAnnotation::new().value("/download")),
        );
        let definitions = definitions(&contract);
        let transport = Arc::new(MockTransport::new(vec![
            Response::new(404).with_body("missing"),
        ]));
        let target = DispatchTarget::builder(&contract, &definitions)
            .transport(transport)
            .executor(Executor::Inline)
            .build()
            .expect("builds");

        let reply = target.invoke_named("download", vec![]).await.expect("succeeds");
        assert!(!reply.is_pending());
        let response = reply.into_response().expect("raw response");
        assert_eq!(response.status(), 404);
        assert_eq!(response.text().expect("text"), "missing");
    }

    #[tokio::test]
    async fn test_expansion_failure_goes_through_exception_handler() {
        let contract = ContractType::new("Api").method(
            MethodDecl::new("lookup", string())
                .annotate(RequestAnnotation::new().value("/lookup/{id}"))
                .parameter(ParameterDecl::new(string()).param_with(
                    "id",
                    Some(Arc::new(RefusingExpander)),
                    true,
                )),
        );
        let definitions = definitions(&contract);

        let transport = Arc::new(MockTransport::new(vec![]));
        let strict = DispatchTarget::builder(&contract, &definitions)
            .transport(transport.clone())
            .build()
            .expect("builds");
        match strict.invoke_named("lookup", vec![Value::from("7")]).await {
            Err(Error::TemplateExpansion(ExpansionError::Expander { variable, .. })) => {
                assert_eq!(variable, "id");
            }
            other => panic!("expected an expansion error, got {other:?}"),
        }

        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let handler = move |error: Error| -> crate::error::Result<()> {
            assert!(matches!(error, Error::TemplateExpansion(_)));
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };
        let lenient = DispatchTarget::builder(&contract, &definitions)
            .transport(transport.clone())
            .exception_handler(Arc::new(handler))
            .build()
            .expect("builds");
        let reply = lenient
            .invoke_named("lookup", vec![Value::from("7")])
            .await
            .expect("suppressed");
        assert_eq!(reply.into_value(), Some(Value::Null));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_nested_return_type_binds_owner_variable() {
        let mut universe = TypeUniverse::with_builtins();
        universe.define(ClassInfo::new("User"));
        universe.define(ClassInfo::new("Crud").with_type_parameters(&["T"]));
        universe.define(ClassInfo::new("Outer").with_type_parameters(&["T"]));
        universe.define(ClassInfo::new("Page").with_type_parameters(&["E"]));
        universe.define(ClassInfo::new("Api").extends(DeclaredType::parameterized(
            "Crud",
            vec![DeclaredType::class("User")],
        )));

        let page = DeclaredType::nested(
            DeclaredType::parameterized("Outer", vec![DeclaredType::variable("T", "Crud")]),
            "Page",
            vec![string()],
        );
        let contract = ContractType::new("Api").method(
            MethodDecl::new("page", page)
                .declared_by("Crud")
                .annotate(RequestAnnotation::new().value("/page")),
        );
        let definitions = AnnotationContract::new(Arc::new(universe))
            .apply(&contract)
            .expect("valid contract");
        assert_eq!(
            definitions[0].return_type().to_string(),
            "Outer<User>.Page<String>"
        );

        let transport = Arc::new(MockTransport::new(vec![
            Response::new(200).with_body(r#"{"items":["a"]}"#),
        ]));
        let target = DispatchTarget::builder(&contract, &definitions)
            .transport(transport)
            .decoder(Arc::new(JsonDecoder))
            .build()
            .expect("builds");
        let reply = target.invoke_named("page", vec![]).await.expect("succeeds");
        assert_eq!(
            reply.into_value(),
            Some(Value::map([("items", Value::list(["a"]))]))
        );
    }

    #[tokio::test]
    async fn test_base_url_query_is_kept() {
        let transport = Arc::new(MockTransport::new(vec![
            Response::new(200),
            Response::new(200),
        ]));
        let target = client(transport.clone())
            .base_url("http://localhost:8080/v1/?key=1")
            .expect("valid base url")
            .build()
            .expect("builds");

        target
            .invoke_named("get", vec![Value::from("a b")])
            .await
            .expect("succeeds");
        target.invoke_named("raw", vec![]).await.expect("succeeds");

        let requests = transport.requests();
        assert_eq!(
            requests[0].uri(),
            "http://localhost:8080/v1/items/a%20b?key=1"
        );
        assert_eq!(requests[1].uri(), "http://localhost:8080/v1/raw?key=1");
    }

    #[test]
    fn test_definitions_must_belong_to_contract() {
        let contract = contract();
        let definitions = definitions(&contract);
        let other = ContractType::new("Other");
        let result = DispatchTarget::builder(&other, &definitions)
            .transport(Arc::new(MockTransport::new(vec![])))
            .build();
        assert!(result.is_err_and(|e| e.is_configuration()));
    }

    #[test]
    fn test_identity() {
        let a = client(Arc::new(MockTransport::new(vec![]))).build().expect("builds");
        let b = client(Arc::new(MockTransport::new(vec![]))).build().expect("builds");
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "Api(http://localhost:8080/v1)");

        let hash = |target: &DispatchTarget| {
            let mut hasher = DefaultHasher::new();
            target.hash(&mut hasher);
            hasher.finish()
        };
        assert_eq!(hash(&a), hash(&b));

        let contract = contract();
        let definitions = definitions(&contract);
        let c = DispatchTarget::builder(&contract, &definitions)
            .transport(Arc::new(MockTransport::new(vec![])))
            .build()
            .expect("builds");
        assert_ne!(a, c);
        assert_eq!(c.to_string(), "Api");
    }
}
