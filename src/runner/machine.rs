//! The batch Predict-Execute-Verify runner.

use super::error::{EngineError, RunFailure};
use super::hooks::AfterQueue;
use super::run_state::{CompletedAction, QueueEntry, RunState};
use super::state::{MachineState, RunnerState, ACTION_FAILURE};
use crate::action::{ActionDefinition, ActionKind, VerifyInput};
use crate::builder::{MachineDefinition, Route, RouteContext};
use crate::core::{DomainContext, Environment, State, StateHistory, StateTransition};
use crate::prediction::evaluate_snapshots;
use crate::report::RunReport;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use stillwater::effect::Effect;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// A single run of a composed machine.
///
/// Each call to [`step`](Self::step) performs the entry behaviour of the
/// current state and moves to the next one. Runs are strictly sequential:
/// actions execute one at a time in enqueue order.
pub struct PevMachine<K: ActionKind, D: DomainContext, Env: Environment> {
    definition: MachineDefinition<K, D, Env>,
    id: Uuid,
    started_at: DateTime<Utc>,
    current: MachineState,
    run: RunState<K, D>,
    history: StateHistory<MachineState>,
    handling_failure: bool,
    batch_open: bool,
    batch_start: usize,
    routing_hops: usize,
}

impl<K: ActionKind, D: DomainContext, Env: Environment> PevMachine<K, D, Env> {
    pub(crate) fn new(definition: MachineDefinition<K, D, Env>, domain: D) -> Self {
        let current = definition
            .resolve_target(definition.initial())
            .unwrap_or_else(|| MachineState::domain(definition.initial()));
        let max_cycles = definition.config().max_cycles;

        Self {
            definition,
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            current,
            run: RunState::new(domain, max_cycles),
            history: StateHistory::new(),
            handling_failure: false,
            batch_open: false,
            batch_start: 0,
            routing_hops: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn current_state(&self) -> &MachineState {
        &self.current
    }

    pub fn is_final(&self) -> bool {
        self.current.is_final()
    }

    pub fn history(&self) -> &StateHistory<MachineState> {
        &self.history
    }

    pub fn run_state(&self) -> &RunState<K, D> {
        &self.run
    }

    pub fn domain(&self) -> &D {
        &self.run.domain
    }

    pub fn completed_actions(&self) -> &[CompletedAction<K>] {
        &self.run.completed_actions
    }

    pub fn error(&self) -> Option<&RunFailure<K>> {
        self.run.error.as_ref()
    }

    pub fn cycle_count(&self) -> u32 {
        self.run.cycle_count
    }

    /// Drive the run until it reaches a final state.
    pub async fn run_to_completion(&mut self, env: &Env) -> Result<&MachineState, EngineError> {
        let span = info_span!(
            "pev_run",
            run_id = %self.id,
            label = %self.definition.config().label
        );

        async {
            info!(initial = %self.current, "Starting run");
            while !self.current.is_final() {
                self.step(env).await?;
            }
            info!(
                final_state = %self.current,
                cycles = self.run.cycle_count,
                completed = self.run.completed_actions.len(),
                verified = self.run.verified_count(),
                "Run finished"
            );
            Ok::<(), EngineError>(())
        }
        .instrument(span)
        .await?;

        Ok(&self.current)
    }

    /// Perform one state's behaviour and transition out of it.
    ///
    /// Batch failures are not errors here: they route the run to a failure
    /// state. `Err` is reserved for fatal configuration problems and for
    /// stepping a run that has already finished.
    pub async fn step(&mut self, env: &Env) -> Result<&MachineState, EngineError> {
        if self.current.is_final() {
            return Err(EngineError::Finished(self.current.name().to_string()));
        }

        match self.current.clone() {
            MachineState::Domain { name, .. } => self.route(&name)?,
            MachineState::Runner(RunnerState::ExecutingQueue) => self.collect_batch(env).await?,
            MachineState::Runner(RunnerState::ExecutingBatch) => self.execute_batch(env).await?,
            MachineState::Runner(RunnerState::PersistingBatch) => self.persist_batch(env).await,
            MachineState::Runner(RunnerState::RefreshingContext) => self.refresh_context(env).await,
            MachineState::Runner(RunnerState::VerifyingBatch) => self.verify_batch(env).await?,
            MachineState::Runner(RunnerState::QueueComplete) => self.complete_queue(env).await?,
            MachineState::Runner(state) => {
                return Err(EngineError::Finished(state.name().to_string()));
            }
        }

        Ok(&self.current)
    }

    /// Consume the finished run into its report.
    pub fn into_report(self) -> RunReport<K, D> {
        RunReport::new(
            self.id,
            self.definition.config().label.clone(),
            self.started_at,
            self.current,
            self.run,
            self.history,
        )
    }

    fn transition_to(&mut self, next: MachineState) {
        debug!(from = %self.current, to = %next, cycle = self.run.cycle_count, "Transition");

        if matches!(next, MachineState::Domain { terminal: false, .. }) {
            self.routing_hops += 1;
        } else {
            self.routing_hops = 0;
        }

        self.history = self.history.record(StateTransition {
            from: self.current.clone(),
            to: next.clone(),
            timestamp: Utc::now(),
            cycle: self.run.cycle_count,
        });
        self.current = next;
    }

    fn route(&mut self, name: &str) -> Result<(), EngineError> {
        let definition = self.definition.clone();
        let state = definition
            .domain_state(name)
            .ok_or_else(|| EngineError::UnknownState(name.to_string()))?;

        let actions = state.enqueue_for(&RouteContext {
            domain: &self.run.domain,
            cycle_count: self.run.cycle_count,
            error: self.run.error.as_ref(),
        });
        if !actions.is_empty() {
            debug!(state = name, count = actions.len(), "Enqueued actions");
        }
        self.run.action_queue.extend(actions);

        let route = first_open_route(name, state.routes(), |guard| {
            definition.check_guard(guard, &self.run)
        })?;

        let next = definition
            .resolve_target(route.target())
            .ok_or_else(|| EngineError::UnknownState(route.target().to_string()))?;

        self.transition_to(next);

        let hops = definition.domain_state_count();
        if self.routing_hops > hops {
            return Err(EngineError::RoutingLoop {
                state: name.to_string(),
                hops,
            });
        }
        Ok(())
    }

    async fn collect_batch(&mut self, env: &Env) -> Result<(), EngineError> {
        if self.run.action_queue.is_empty() {
            self.transition_to(MachineState::Runner(RunnerState::QueueComplete));
            return Ok(());
        }

        let definition = self.definition.clone();
        let actions = std::mem::take(&mut self.run.action_queue);
        let definitions = actions
            .iter()
            .map(|action| {
                definition
                    .registry()
                    .dispatch(action)
                    .map(|entry| entry.definition())
            })
            .collect::<Result<Vec<&ActionDefinition<K, D, Env>>, _>>()?;

        self.open_batch(env, actions.len()).await;

        let snapshot = Arc::new(self.run.domain.clone());
        self.run.queue_predictions = actions
            .into_iter()
            .zip(definitions)
            .map(|(action, action_definition)| QueueEntry {
                prediction: action_definition.prediction_for(&action, &snapshot),
                action,
                pre_snapshot: Arc::clone(&snapshot),
                execute_result: None,
            })
            .collect();

        self.transition_to(MachineState::Runner(RunnerState::ExecutingBatch));
        Ok(())
    }

    async fn execute_batch(&mut self, env: &Env) -> Result<(), EngineError> {
        let definition = self.definition.clone();

        for index in 0..self.run.queue_predictions.len() {
            let entry = &self.run.queue_predictions[index];
            let action = entry.action.clone();
            let effect = definition
                .registry()
                .dispatch(&action)?
                .definition()
                .execution_for(&action, &entry.pre_snapshot);

            debug!(action = %action, index, "Executing action");
            match effect.run(env).await {
                Ok(result) => self.run.queue_predictions[index].execute_result = Some(result),
                Err(err) => {
                    self.run.record_unverified(index);
                    self.fail(
                        RunFailure::Execution {
                            action,
                            message: err.to_string(),
                        },
                        env,
                    )
                    .await;
                    return Ok(());
                }
            }
        }

        self.transition_to(MachineState::Runner(RunnerState::PersistingBatch));
        Ok(())
    }

    async fn persist_batch(&mut self, env: &Env) {
        if let Some(persist) = &self.definition.hooks().persist {
            let effect = persist(&self.run.domain);
            if let Err(err) = effect.run(env).await {
                warn!(error = %err, "Persisting context failed, continuing to refresh");
            }
        }

        self.transition_to(MachineState::Runner(RunnerState::RefreshingContext));
    }

    async fn refresh_context(&mut self, env: &Env) {
        let effect = (self.definition.hooks().refresh)(&self.run.domain);

        match effect.run(env).await {
            Ok(domain) => {
                self.run.domain = domain;
                self.transition_to(MachineState::Runner(RunnerState::VerifyingBatch));
            }
            Err(err) => {
                self.run.record_unverified(self.run.queue_predictions.len());
                self.fail(
                    RunFailure::Refresh {
                        message: err.to_string(),
                    },
                    env,
                )
                .await;
            }
        }
    }

    async fn verify_batch(&mut self, env: &Env) -> Result<(), EngineError> {
        match self.first_failed_entry()? {
            None => {
                let records: Vec<CompletedAction<K>> = self
                    .run
                    .queue_predictions
                    .iter()
                    .map(|entry| CompletedAction::from_entry(entry, true))
                    .collect();
                self.run.completed_actions.extend(records);
                self.run.queue_predictions.clear();
                self.transition_to(MachineState::Runner(RunnerState::QueueComplete));
            }
            Some((index, failure)) => {
                let records: Vec<CompletedAction<K>> = self
                    .run
                    .queue_predictions
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| CompletedAction::from_entry(entry, i < index))
                    .collect();
                self.run.completed_actions.extend(records);
                self.fail(failure, env).await;
            }
        }
        Ok(())
    }

    /// Index and failure of the first entry that does not verify.
    fn first_failed_entry(&self) -> Result<Option<(usize, RunFailure<K>)>, EngineError> {
        let registry = self.definition.registry();

        for (index, entry) in self.run.queue_predictions.iter().enumerate() {
            let checks = entry.prediction.as_ref().map(|p| p.checks.as_slice());
            let evaluation =
                match evaluate_snapshots(checks, entry.pre_snapshot.as_ref(), &self.run.domain) {
                    Ok(evaluation) => evaluation,
                    Err(err) => {
                        return Ok(Some((
                            index,
                            RunFailure::Verification {
                                action: entry.action.clone(),
                                diffs: Vec::new(),
                                message: Some(format!("Snapshot serialization failed: {err}")),
                            },
                        )));
                    }
                };

            let custom = registry
                .dispatch(&entry.action)?
                .definition()
                .custom_verify(&VerifyInput {
                    action: &entry.action,
                    old: entry.pre_snapshot.as_ref(),
                    new: &self.run.domain,
                    prediction: entry.prediction.as_ref(),
                    result: entry.execute_result.as_ref(),
                });
            let custom_pass = custom.as_ref().map_or(true, |outcome| outcome.pass);

            debug!(
                action = %entry.action,
                checks = evaluation.pass,
                custom = custom_pass,
                "Verified action"
            );

            if !evaluation.pass || !custom_pass {
                let message = custom
                    .and_then(|outcome| outcome.message)
                    .or(evaluation.message);
                return Ok(Some((
                    index,
                    RunFailure::Verification {
                        action: entry.action.clone(),
                        diffs: evaluation.diffs,
                        message,
                    },
                )));
            }
        }

        Ok(None)
    }

    async fn complete_queue(&mut self, env: &Env) -> Result<(), EngineError> {
        self.run.cycle_count += 1;
        self.close_batch(env).await;

        let next = if self.handling_failure {
            MachineState::terminal(ACTION_FAILURE)
        } else if self.run.max_cycles_reached() {
            MachineState::Runner(RunnerState::Done)
        } else {
            let initial = self.definition.initial();
            self.definition
                .resolve_target(initial)
                .ok_or_else(|| EngineError::UnknownState(initial.to_string()))?
        };

        self.transition_to(next);
        Ok(())
    }

    /// Record a batch failure and route to the matching failure state.
    async fn fail(&mut self, failure: RunFailure<K>, env: &Env) {
        warn!(error = %failure, "Batch failed");

        if let Some(previous) = self.run.error.replace(failure) {
            warn!(error = %previous, "Failure while handling an earlier failure");
        }
        self.run.action_queue.clear();
        self.run.queue_predictions.clear();
        self.close_batch(env).await;

        let next = match self.run.error.as_ref() {
            Some(_) if self.definition.has_action_failure() && !self.handling_failure => {
                self.handling_failure = true;
                self.definition
                    .resolve_target(ACTION_FAILURE)
                    .unwrap_or_else(|| MachineState::domain(ACTION_FAILURE))
            }
            Some(failure) => MachineState::Runner(failure.terminal_state()),
            None => MachineState::Runner(RunnerState::Done),
        };
        self.transition_to(next);
    }

    async fn open_batch(&mut self, env: &Env, size: usize) {
        self.batch_open = true;
        self.batch_start = self.run.completed_actions.len();
        info!(size, cycle = self.run.cycle_count, "Starting batch");

        if let Some(hook) = &self.definition.hooks().before_queue {
            let effect = hook(&self.run.domain, &self.definition.config().label);
            if let Err(err) = effect.run(env).await {
                warn!(error = %err, "before_queue hook failed");
            }
        }
    }

    async fn close_batch(&mut self, env: &Env) {
        if !self.batch_open {
            return;
        }
        self.batch_open = false;

        let completed = &self.run.completed_actions[self.batch_start..];
        info!(
            completed = completed.len(),
            failed = self.run.error.is_some(),
            "Batch complete"
        );

        if let Some(hook) = &self.definition.hooks().after_queue {
            let effect = hook(&AfterQueue {
                domain: &self.run.domain,
                label: &self.definition.config().label,
                completed,
                error: self.run.error.as_ref(),
            });
            if let Err(err) = effect.run(env).await {
                warn!(error = %err, "after_queue hook failed");
            }
        }
    }
}

/// First route whose guard passes (or that has none), in declaration order.
///
/// A guard name the definition does not know is an error rather than a
/// closed route.
fn first_open_route<'a, F>(state: &str, routes: &'a [Route], check: F) -> Result<&'a Route, EngineError>
where
    F: Fn(&str) -> Option<bool>,
{
    for route in routes {
        let open = match route.guard() {
            Some(guard) => check(guard).ok_or_else(|| EngineError::UnknownGuard {
                state: state.to_string(),
                guard: guard.to_string(),
            })?,
            None => true,
        };
        if open {
            return Ok(route);
        }
    }

    Err(EngineError::NoRoute {
        state: state.to_string(),
    })
}
