//! # Script executor.
//!
//! Runs a [`Script`] step-by-step on a spawned task:
//!
//! ```text
//! spawn_script(flow, script, trace)
//!   └─► task: for each step
//!         ├─ finish flag set?        → stop (normal completion)
//!         ├─ trace "step: <name>"
//!         ├─ race step vs. cancellation token
//!         └─ on cancellation (or a cancellation error bubbling out of the
//!            step): run the cancel handler at most once, then propagate
//!            NavError — never swallowed, never run on normal completion
//! ```
//!
//! External teardown is [`ScriptHandle::cancel`]; the handle also joins the
//! task for the final outcome.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::NavError;
use crate::runtime::NavFlow;
use crate::script::cx::{ScriptCx, TraceFn};
use crate::script::dsl::Script;

/// Handle to a running script task.
pub struct ScriptHandle {
    token: CancellationToken,
    task: JoinHandle<Result<(), NavError>>,
}

impl ScriptHandle {
    /// Requests cancellation; the script observes it before or during its
    /// next step and runs the cancel handler once.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for the script to complete and returns its outcome.
    ///
    /// A cancelled script resolves to [`NavError::ScriptCanceled`].
    pub async fn join(self) -> Result<(), NavError> {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(_) => Err(NavError::ScriptCanceled),
        }
    }
}

/// Spawns `script` against `flow` on the ambient runtime.
///
/// The script's output queue starts filling immediately, before the first
/// step runs, so outputs emitted right after spawning are not missed.
pub fn spawn_script<Out: Clone + Send + Sync + 'static>(
    flow: Arc<NavFlow<Out>>,
    script: Script<Out>,
    trace: Option<TraceFn>,
) -> ScriptHandle {
    let token = CancellationToken::new();
    let cx = Arc::new(ScriptCx::new(
        flow,
        Arc::new(AtomicBool::new(false)),
        trace,
    ));
    let task = tokio::spawn(execute(cx, script, token.clone()));
    ScriptHandle { token, task }
}

/// Drives the script's steps to completion, cancellation, or failure.
async fn execute<Out: Clone + Send + Sync + 'static>(
    cx: Arc<ScriptCx<Out>>,
    mut script: Script<Out>,
    token: CancellationToken,
) -> Result<(), NavError> {
    let mut cancel = script.cancel.take();

    for step in script.steps.drain(..) {
        if cx.is_finished() {
            break;
        }
        cx.trace(&format!("step: {}", step.name));

        let outcome = tokio::select! {
            // A token cancelled before the step starts skips it entirely.
            biased;
            _ = token.cancelled() => Err(NavError::ScriptCanceled),
            result = (step.run)(Arc::clone(&cx)) => result,
        };

        if let Err(err) = outcome {
            if err.is_cancellation() {
                if let Some(handler) = cancel.take() {
                    cx.trace(&format!("cancel: {}", handler.reason));
                    (handler.run)(Arc::clone(&cx)).await;
                }
            }
            return Err(err);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::script::dsl::{Branch, CaseMap};
    use crate::testutil::{Probe, ResultProbe, Sig};

    fn started_flow(root: &Arc<Probe>) -> Arc<NavFlow<Sig>> {
        let flow = NavFlow::builder().build(Arc::clone(root));
        flow.start();
        flow
    }

    async fn wait_depth(flow: &NavFlow<Sig>, depth: usize) {
        let mut rx = flow.subscribe_nav();
        timeout(Duration::from_secs(1), rx.wait_for(|s| s.len() == depth))
            .await
            .expect("depth reached")
            .expect("nav watch open");
    }

    #[tokio::test]
    async fn steps_run_in_order_and_finish_skips_the_tail() {
        let root = Probe::new(Some("root"));
        let flow = started_flow(&root);
        let log: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
        let traced: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let script = Script::builder()
            .step("one", {
                let log = Arc::clone(&log);
                move |_cx| async move {
                    log.lock().unwrap().push(1);
                    Ok(())
                }
            })
            .step("two", {
                let log = Arc::clone(&log);
                move |cx| async move {
                    log.lock().unwrap().push(2);
                    cx.finish();
                    Ok(())
                }
            })
            .step("three", {
                let log = Arc::clone(&log);
                move |_cx| async move {
                    log.lock().unwrap().push(3);
                    Ok(())
                }
            })
            .build();

        let trace: crate::script::TraceFn = {
            let traced = Arc::clone(&traced);
            Arc::new(move |msg: &str| traced.lock().unwrap().push(msg.to_string()))
        };
        let handle = spawn_script(flow, script, Some(trace));
        handle.join().await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec![1, 2]);
        assert_eq!(
            *traced.lock().unwrap(),
            vec!["step: one".to_string(), "step: two".to_string()]
        );
    }

    #[tokio::test]
    async fn cancel_handler_runs_exactly_once_on_cancellation() {
        let root = Probe::new(Some("root"));
        let flow = started_flow(&root);
        let cancelled = Arc::new(AtomicUsize::new(0));

        let script = Script::builder()
            .step("wait forever", |cx| async move {
                cx.await_output(|_| true).await?;
                Ok(())
            })
            .cancel("teardown", {
                let cancelled = Arc::clone(&cancelled);
                move |_cx| async move {
                    cancelled.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build();

        let handle = spawn_script(flow, script, None);
        tokio::task::yield_now().await;
        handle.cancel();

        let err = timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("script resolves")
            .unwrap_err();
        assert_eq!(err, NavError::ScriptCanceled);
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn cancelling_an_await_result_step_restores_the_stack() {
        let root = Probe::new(Some("root"));
        let flow = started_flow(&root);
        let node = ResultProbe::<u32>::new(Some("dialog"));

        let script = Script::builder()
            .step("await dialog", {
                let node = Arc::clone(&node);
                move |cx| async move {
                    cx.push_and_await(node, true).await?;
                    Ok(())
                }
            })
            .build();

        let handle = spawn_script(Arc::clone(&flow), script, None);
        wait_depth(&flow, 2).await;
        handle.cancel();

        let err = timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("script resolves")
            .unwrap_err();
        assert_eq!(err, NavError::ScriptCanceled);
        assert!(
            flow.nav_state().is_root_only(),
            "the awaited node must not leak onto the stack"
        );
    }

    #[tokio::test]
    async fn cancel_handler_never_runs_on_normal_completion() {
        let root = Probe::new(Some("root"));
        let flow = started_flow(&root);
        let cancelled = Arc::new(AtomicUsize::new(0));

        let script = Script::builder()
            .step("noop", |_cx| async move { Ok(()) })
            .cancel("teardown", {
                let cancelled = Arc::clone(&cancelled);
                move |_cx| async move {
                    cancelled.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build();

        spawn_script(flow, script, None).join().await.unwrap();
        assert_eq!(cancelled.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn dispose_resolves_a_pending_await_through_the_cancel_path() {
        let root = Probe::new(Some("root"));
        let flow = started_flow(&root);
        let cancelled = Arc::new(AtomicUsize::new(0));

        let script = Script::builder()
            .step("wait", |cx| async move {
                cx.await_output(|_| true).await?;
                Ok(())
            })
            .cancel("teardown", {
                let cancelled = Arc::clone(&cancelled);
                move |_cx| async move {
                    cancelled.fetch_add(1, Ordering::SeqCst);
                }
            })
            .build();

        let handle = spawn_script(Arc::clone(&flow), script, None);
        tokio::task::yield_now().await;
        flow.dispose();

        let err = timeout(Duration::from_secs(1), handle.join())
            .await
            .expect("script resolves")
            .unwrap_err();
        assert_eq!(err, NavError::OutputsClosed);
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn subflow_finish_terminates_the_outer_script() {
        let root = Probe::new(Some("root"));
        let flow = started_flow(&root);
        let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let script = Script::builder()
            .step("outer", {
                let log = Arc::clone(&log);
                move |cx| async move {
                    log.lock().unwrap().push("outer");
                    let sub = Script::builder()
                        .step("inner", |sub_cx| async move {
                            sub_cx.finish();
                            Ok(())
                        })
                        .step("inner tail", {
                            let log = Arc::clone(&log);
                            move |_cx| async move {
                                log.lock().unwrap().push("inner tail");
                                Ok(())
                            }
                        })
                        .build();
                    cx.run_subflow(sub).await
                }
            })
            .step("outer tail", {
                let log = Arc::clone(&log);
                move |_cx| async move {
                    log.lock().unwrap().push("outer tail");
                    Ok(())
                }
            })
            .build();

        spawn_script(flow, script, None).join().await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["outer"]);
    }

    #[tokio::test]
    async fn branch_dispatches_first_match_or_otherwise() {
        let root = Probe::new(Some("root"));
        let flow = started_flow(&root);
        let taken: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

        let script = Script::builder()
            .step("dispatch", {
                let taken = Arc::clone(&taken);
                move |cx| async move {
                    let arms = Branch::new()
                        .on(
                            |out| matches!(out, Sig::Close),
                            {
                                let taken = Arc::clone(&taken);
                                move |_out| async move {
                                    taken.lock().unwrap().push("close");
                                    Ok(())
                                }
                            },
                        )
                        .otherwise({
                            let taken = Arc::clone(&taken);
                            move |_out| async move {
                                taken.lock().unwrap().push("otherwise");
                                Ok(())
                            }
                        });
                    cx.branch(arms).await
                }
            })
            .build();

        let handle = spawn_script(Arc::clone(&flow), script, None);
        root.emit(Sig::Note("unmatched"));
        handle.join().await.unwrap();

        assert_eq!(*taken.lock().unwrap(), vec!["otherwise"]);
    }

    #[tokio::test]
    async fn typed_node_access_asserts_the_top_type() {
        let root = Probe::new(Some("root"));
        let flow = started_flow(&root);

        let script = Script::builder()
            .step("update top", |cx| async move {
                cx.update_node::<Probe, _>(|probe| {
                    probe.emit(Sig::Note("touched"));
                })?;
                Ok(())
            })
            .step("wrong type", |cx| async move {
                cx.with_node::<ResultProbe<u32>, _, _>(|_| ())?;
                Ok(())
            })
            .build();

        let err = spawn_script(flow, script, None).join().await.unwrap_err();
        assert!(matches!(err, NavError::NodeMismatch { .. }));
        assert_eq!(err.as_label(), "nav_node_mismatch");
    }

    #[tokio::test]
    async fn open_b_scenario_routes_and_captures_the_result() {
        let root = Probe::new(Some("R"));
        let flow = started_flow(&root);
        let a = Probe::new(Some("A"));
        let b = ResultProbe::<u32>::new(Some("B"));
        let captured: Arc<Mutex<Option<u32>>> = Arc::new(Mutex::new(None));

        let script = Script::builder()
            .step("open a", {
                let a = Arc::clone(&a);
                move |cx| async move {
                    cx.push(a)?;
                    Ok(())
                }
            })
            .step("route", {
                let b = Arc::clone(&b);
                let captured = Arc::clone(&captured);
                move |cx| async move {
                    let decision = cx
                        .await_case(
                            CaseMap::new()
                                .on(|out| matches!(out, Sig::OpenB).then_some("open-b"))
                                .on(|out| matches!(out, Sig::Close).then_some("close")),
                        )
                        .await?;
                    match decision {
                        "open-b" => {
                            let result = cx.push_and_await(b, true).await?;
                            *captured.lock().unwrap() = result.ok();
                        }
                        _ => {
                            cx.pop()?;
                        }
                    }
                    Ok(())
                }
            })
            .build();

        let handle = spawn_script(Arc::clone(&flow), script, None);

        wait_depth(&flow, 2).await;
        a.emit(Sig::OpenB);
        wait_depth(&flow, 3).await;
        b.complete(42);

        handle.join().await.unwrap();
        assert_eq!(*captured.lock().unwrap(), Some(42));

        let state = flow.nav_state();
        let tags: Vec<&str> = state.entries().iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["R", "A"]);
    }
}
