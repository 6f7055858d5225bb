//! Property tests for traversal and registry invariants


use proptest::prelude::*;
use proxify::chain::ChainExit;
use proxify::interceptor::builtin::LoggingInterceptor;
use proxify::interceptor::Interceptor;
use proxify::invocation::{Fault, InteractionType, InvocationContext};
use proxify::registry::{InterceptorMetadata, InterceptorRegistry, RegistryError};
use proxify::testing::{Hook, HookJournal, RecordingInterceptor};
use serde_json::{json, Value};
use std::sync::Arc;
use test_helpers::{chain_of, stage_names};

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime should build")
        .block_on(future)
}

fn metadata(name: &str, description: &str) -> InterceptorMetadata {
    let stage_name = name.to_string();
    InterceptorMetadata::new(name, description, move |_config| {
        Ok(Arc::new(LoggingInterceptor::new(stage_name.clone())) as Arc<dyn Interceptor>)
    })
}

fn interaction() -> impl Strategy<Value = InteractionType> {
    prop::sample::select(InteractionType::ALL.to_vec())
}

proptest! {
    #[test]
    fn declining_chain_is_transparent(len in 1usize..12, phase in interaction()) {
        let journal = HookJournal::new();
        let chain = chain_of(
            stage_names(len)
                .into_iter()
                .map(|name| RecordingInterceptor::new(name, &journal).declining())
                .collect(),
        );

        let input = json!({"payload": len});
        let mut ctx = match phase {
            InteractionType::InvokeFault => InvocationContext::faulted(Fault::new("caller"), input),
            other => InvocationContext::with_interaction(other, input).unwrap(),
        };
        let before = ctx.clone();

        let status = block_on(chain.dispatch(&mut ctx)).unwrap();

        let expected_exit = if phase.is_forward() { ChainExit::Tail } else { ChainExit::Head };
        prop_assert_eq!(status.exit, expected_exit);
        prop_assert_eq!(status.steps, len);
        prop_assert_eq!(ctx.interaction(), before.interaction());
        prop_assert_eq!(ctx.fault(), before.fault());
        prop_assert_eq!(&ctx.input, &before.input);
        prop_assert!(block_on(journal.calls()).is_empty());
    }

    #[test]
    fn request_fault_unwinds_in_reverse(len in 1usize..12, failing in 0usize..12) {
        let failing = failing % len;
        let names = stage_names(len);
        let journal = HookJournal::new();
        let chain = chain_of(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let stage = RecordingInterceptor::new(name.clone(), &journal);
                    if i == failing {
                        stage.failing_on(Hook::HandleRequest)
                    } else {
                        stage.declining()
                    }
                })
                .collect(),
        );

        let mut ctx =
            InvocationContext::with_interaction(InteractionType::Invoke, Value::Null).unwrap();
        let status = block_on(chain.dispatch(&mut ctx)).unwrap();

        prop_assert_eq!(status.exit, ChainExit::Head);
        let fault = ctx.fault().unwrap();
        prop_assert_eq!(&fault.origin_name, &names[failing]);
        prop_assert!(fault.details.is_some());
        prop_assert_eq!(
            block_on(journal.stages_running(Hook::HandleFault)),
            vec![names[failing].clone()]
        );
    }

    #[test]
    fn every_stage_up_to_failure_handles_fault_once(len in 1usize..12, failing in 0usize..12) {
        let failing = failing % len;
        let names = stage_names(len);
        let journal = HookJournal::new();
        let chain = chain_of(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let stage = RecordingInterceptor::new(name.clone(), &journal);
                    if i == failing { stage.failing_on(Hook::HandleRequest) } else { stage }
                })
                .collect(),
        );

        let mut ctx =
            InvocationContext::with_interaction(InteractionType::Invoke, Value::Null).unwrap();
        block_on(chain.dispatch(&mut ctx)).unwrap();

        let expected: Vec<String> = names[..=failing].iter().rev().cloned().collect();
        prop_assert_eq!(block_on(journal.stages_running(Hook::HandleFault)), expected);
    }

    #[test]
    fn reserved_prefix_always_rejected(suffix in ".*", description in ".*") {
        let mut registry = InterceptorRegistry::new();
        let name = format!("system:{suffix}");

        let result = registry.register(metadata(&name, &description));

        prop_assert!(matches!(result, Err(RegistryError::ReservedName(_))));
        prop_assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_registration_keeps_first(name in "[a-z][a-z0-9_-]{0,16}") {
        let mut registry = InterceptorRegistry::new();
        registry.register(metadata(&name, "first")).unwrap();
        registry.register(metadata(&name, "second")).unwrap();

        prop_assert_eq!(registry.len(), 1);
        prop_assert_eq!(&registry.lookup_metadata(&name).unwrap().description, "first");
    }
}
