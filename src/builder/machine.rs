//! Composition of domain routing states with the batch runner.

use crate::action::{ActionKind, ActionRegistry};
use crate::builder::domain::DomainState;
use crate::builder::error::BuildError;
use crate::config::EngineConfig;
use crate::core::{DomainContext, Environment, Guard};
use crate::report::RunReport;
use crate::runner::{
    AfterQueue, AfterQueueFn, BeforeQueueFn, ContextError, EngineError, Hooks, MachineState,
    PersistFn, PevMachine, RefreshFn, RunState, RunnerState, ACTION_FAILURE, MAX_CYCLES_REACHED,
    QUEUE_EMPTY,
};
use std::collections::HashMap;
use std::sync::Arc;
use stillwater::effect::BoxedEffect;

/// The domain half of a machine: its states, guards and entry point.
pub struct DomainConfig<K: ActionKind, D: DomainContext> {
    pub initial: String,
    pub states: Vec<DomainState<K, D>>,
    pub guards: Vec<(String, Guard<D>)>,
}

/// Compose a domain with the runner in one call.
///
/// Equivalent to feeding every part to a [`MachineBuilder`].
pub fn compose<K, D, Env>(
    domain: DomainConfig<K, D>,
    registry: ActionRegistry<K, D, Env>,
    hooks: Hooks<K, D, Env>,
    config: EngineConfig,
) -> Result<MachineDefinition<K, D, Env>, BuildError>
where
    K: ActionKind,
    D: DomainContext,
    Env: Environment,
{
    let builder = MachineBuilder {
        registry,
        initial: Some(domain.initial),
        states: domain.states,
        guards: domain.guards,
        refresh: Some(hooks.refresh),
        persist: hooks.persist,
        before_queue: hooks.before_queue,
        after_queue: hooks.after_queue,
        config,
    };
    builder.build()
}

/// Builder for composing a domain machine with a fluent API.
pub struct MachineBuilder<K: ActionKind, D: DomainContext, Env: Environment> {
    registry: ActionRegistry<K, D, Env>,
    initial: Option<String>,
    states: Vec<DomainState<K, D>>,
    guards: Vec<(String, Guard<D>)>,
    refresh: Option<RefreshFn<D, Env>>,
    persist: Option<PersistFn<D, Env>>,
    before_queue: Option<BeforeQueueFn<D, Env>>,
    after_queue: Option<AfterQueueFn<K, D, Env>>,
    config: EngineConfig,
}

impl<K: ActionKind, D: DomainContext, Env: Environment> MachineBuilder<K, D, Env> {
    pub fn new(registry: ActionRegistry<K, D, Env>) -> Self {
        Self {
            registry,
            initial: None,
            states: Vec::new(),
            guards: Vec::new(),
            refresh: None,
            persist: None,
            before_queue: None,
            after_queue: None,
            config: EngineConfig::default(),
        }
    }

    /// Set the domain state every cycle starts from (required).
    pub fn initial(mut self, name: impl Into<String>) -> Self {
        self.initial = Some(name.into());
        self
    }

    pub fn state(mut self, state: DomainState<K, D>) -> Self {
        self.states.push(state);
        self
    }

    pub fn states(mut self, states: Vec<DomainState<K, D>>) -> Self {
        self.states.extend(states);
        self
    }

    /// Register a named guard over the domain snapshot.
    pub fn guard<F>(mut self, name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&D) -> bool + Send + Sync + 'static,
    {
        self.guards.push((name.into(), Guard::new(predicate)));
        self
    }

    /// Set the refresh effect (required).
    pub fn refresh<F>(mut self, refresh: F) -> Self
    where
        F: Fn(&D) -> BoxedEffect<D, ContextError, Env> + Send + Sync + 'static,
    {
        self.refresh = Some(Arc::new(refresh));
        self
    }

    pub fn persist<F>(mut self, persist: F) -> Self
    where
        F: Fn(&D) -> BoxedEffect<(), ContextError, Env> + Send + Sync + 'static,
    {
        self.persist = Some(Arc::new(persist));
        self
    }

    pub fn before_queue<F>(mut self, hook: F) -> Self
    where
        F: Fn(&D, &str) -> BoxedEffect<(), ContextError, Env> + Send + Sync + 'static,
    {
        self.before_queue = Some(Arc::new(hook));
        self
    }

    pub fn after_queue<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AfterQueue<'_, K, D>) -> BoxedEffect<(), ContextError, Env> + Send + Sync + 'static,
    {
        self.after_queue = Some(Arc::new(hook));
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_cycles(mut self, max_cycles: u32) -> Self {
        self.config.max_cycles = max_cycles;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.config.label = label.into();
        self
    }

    /// Validate the composition and produce an executable definition.
    pub fn build(self) -> Result<MachineDefinition<K, D, Env>, BuildError> {
        if self.config.max_cycles == 0 {
            return Err(BuildError::InvalidMaxCycles);
        }

        if let Some(kind) = self.registry.missing_kinds().first() {
            return Err(BuildError::UnregisteredAction(kind.name().to_string()));
        }

        let hooks = Hooks {
            refresh: self.refresh.ok_or(BuildError::MissingRefresh)?,
            persist: self.persist,
            before_queue: self.before_queue,
            after_queue: self.after_queue,
        };

        let mut states = HashMap::new();
        for state in self.states {
            let name = state.name().to_string();
            if RunnerState::from_name(&name).is_some() || states.contains_key(&name) {
                return Err(BuildError::DuplicateState(name));
            }
            states.insert(name, state);
        }

        let mut guards = HashMap::new();
        for (name, guard) in self.guards {
            if is_runner_guard(&name) || guards.contains_key(&name) {
                return Err(BuildError::DuplicateGuard(name));
            }
            guards.insert(name, guard);
        }

        for state in states.values() {
            validate_state(state, &states, &guards)?;
        }

        let initial = self.initial.ok_or(BuildError::MissingInitialState)?;
        if !states.contains_key(&initial) {
            return Err(BuildError::UnknownInitialState(initial));
        }

        Ok(MachineDefinition {
            inner: Arc::new(Inner {
                config: self.config,
                initial,
                states,
                guards,
                registry: self.registry,
                hooks,
            }),
        })
    }
}

fn is_runner_guard(name: &str) -> bool {
    name == QUEUE_EMPTY || name == MAX_CYCLES_REACHED
}

fn validate_state<K: ActionKind, D: DomainContext>(
    state: &DomainState<K, D>,
    states: &HashMap<String, DomainState<K, D>>,
    guards: &HashMap<String, Guard<D>>,
) -> Result<(), BuildError> {
    if state.is_terminal() {
        if !state.routes().is_empty() || state.enqueues() {
            return Err(BuildError::TerminalWithRoutes(state.name().to_string()));
        }
        return Ok(());
    }

    if state.routes().is_empty() {
        return Err(BuildError::MissingRoutes(state.name().to_string()));
    }

    for route in state.routes() {
        if let Some(guard) = route.guard() {
            if !is_runner_guard(guard) && !guards.contains_key(guard) {
                return Err(BuildError::UnknownGuard {
                    state: state.name().to_string(),
                    guard: guard.to_string(),
                });
            }
        }

        match RunnerState::from_name(route.target()) {
            Some(runner) if !runner.is_routable() => {
                return Err(BuildError::InvalidTarget {
                    state: state.name().to_string(),
                    target: route.target().to_string(),
                });
            }
            Some(_) => {}
            None if states.contains_key(route.target()) => {}
            None => {
                return Err(BuildError::UnknownTarget {
                    state: state.name().to_string(),
                    target: route.target().to_string(),
                });
            }
        }
    }

    Ok(())
}

struct Inner<K: ActionKind, D: DomainContext, Env: Environment> {
    config: EngineConfig,
    initial: String,
    states: HashMap<String, DomainState<K, D>>,
    guards: HashMap<String, Guard<D>>,
    registry: ActionRegistry<K, D, Env>,
    hooks: Hooks<K, D, Env>,
}

/// A validated, reusable machine. Cloning is cheap.
pub struct MachineDefinition<K: ActionKind, D: DomainContext, Env: Environment> {
    inner: Arc<Inner<K, D, Env>>,
}

impl<K: ActionKind, D: DomainContext, Env: Environment> Clone for MachineDefinition<K, D, Env> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: ActionKind, D: DomainContext, Env: Environment> MachineDefinition<K, D, Env> {
    /// Start a run from an initial domain snapshot.
    pub fn start(&self, domain: D) -> PevMachine<K, D, Env> {
        PevMachine::new(self.clone(), domain)
    }

    /// Start a run and drive it to a final state.
    pub async fn run(&self, domain: D, env: &Env) -> Result<RunReport<K, D>, EngineError> {
        let mut machine = self.start(domain);
        machine.run_to_completion(env).await?;
        Ok(machine.into_report())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &ActionRegistry<K, D, Env> {
        &self.inner.registry
    }

    pub fn hooks(&self) -> &Hooks<K, D, Env> {
        &self.inner.hooks
    }

    pub fn initial(&self) -> &str {
        &self.inner.initial
    }

    pub fn domain_state(&self, name: &str) -> Option<&DomainState<K, D>> {
        self.inner.states.get(name)
    }

    pub fn domain_state_count(&self) -> usize {
        self.inner.states.len()
    }

    /// Whether runner failures route to the domain's `actionFailure` state.
    pub fn has_action_failure(&self) -> bool {
        self.inner.states.contains_key(ACTION_FAILURE)
    }

    /// All state names of the merged namespace, domain states first (sorted).
    pub fn state_names(&self) -> Vec<String> {
        let mut domain: Vec<String> = self.inner.states.keys().cloned().collect();
        domain.sort();
        domain
            .into_iter()
            .chain(RunnerState::ALL.iter().map(|s| s.name().to_string()))
            .collect()
    }

    /// Evaluate a named guard against the run state.
    ///
    /// Returns `None` for names outside the guard table.
    pub fn check_guard(&self, name: &str, run: &RunState<K, D>) -> Option<bool> {
        match name {
            QUEUE_EMPTY => Some(run.action_queue.is_empty()),
            MAX_CYCLES_REACHED => Some(run.max_cycles_reached()),
            other => self.inner.guards.get(other).map(|g| g.check(&run.domain)),
        }
    }

    /// Map a route target to the machine state it denotes.
    pub fn resolve_target(&self, target: &str) -> Option<MachineState> {
        if let Some(runner) = RunnerState::from_name(target) {
            return Some(MachineState::Runner(runner));
        }
        self.inner.states.get(target).map(|state| {
            if state.is_terminal() {
                MachineState::terminal(target)
            } else {
                MachineState::domain(target)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionDefinition;
    use crate::action_kind;
    use serde::Serialize;
    use serde_json::Value;
    use stillwater::prelude::*;

    action_kind! {
        enum TestAction {
            Label,
        }
    }

    #[derive(Clone, Debug, Serialize)]
    struct Issue {
        open: bool,
    }

    fn registry() -> ActionRegistry<TestAction, Issue, ()> {
        ActionRegistry::from_catalog(|kind| match kind {
            TestAction::Label => {
                ActionDefinition::new("Label", |_a, _i: &Issue| pure(Value::Null).boxed())
            }
        })
    }

    fn builder() -> MachineBuilder<TestAction, Issue, ()> {
        MachineBuilder::new(registry())
            .initial("route")
            .refresh(|issue: &Issue| pure(issue.clone()).boxed())
    }

    #[test]
    fn valid_composition_builds() {
        let definition = builder()
            .state(
                DomainState::routing("route")
                    .route_if("isOpen", "executingQueue")
                    .route("closed"),
            )
            .state(DomainState::terminal("closed"))
            .guard("isOpen", |i: &Issue| i.open)
            .build()
            .unwrap();

        assert_eq!(definition.initial(), "route");
        assert!(!definition.has_action_failure());
        assert_eq!(definition.state_names()[..2], ["closed", "route"]);
        assert_eq!(
            definition.resolve_target("closed"),
            Some(MachineState::terminal("closed"))
        );
        assert_eq!(
            definition.resolve_target("done"),
            Some(MachineState::Runner(RunnerState::Done))
        );
    }

    #[test]
    fn builder_requires_initial_state() {
        let result = MachineBuilder::new(registry())
            .refresh(|issue: &Issue| pure(issue.clone()).boxed())
            .state(DomainState::routing("route").route("done"))
            .build();

        assert!(matches!(result, Err(BuildError::MissingInitialState)));
    }

    #[test]
    fn builder_requires_refresh() {
        let result = MachineBuilder::new(registry())
            .initial("route")
            .state(DomainState::routing("route").route("done"))
            .build();

        assert!(matches!(result, Err(BuildError::MissingRefresh)));
    }

    #[test]
    fn domain_state_may_not_shadow_runner_state() {
        let result = builder()
            .state(DomainState::routing("route").route("done"))
            .state(DomainState::routing("executingQueue").route("done"))
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::DuplicateState("executingQueue".to_string()))
        );
    }

    #[test]
    fn duplicate_domain_states_are_rejected() {
        let result = builder()
            .state(DomainState::routing("route").route("done"))
            .state(DomainState::routing("route").route("executingQueue"))
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::DuplicateState("route".to_string()))
        );
    }

    #[test]
    fn domain_guard_may_not_shadow_runner_guard() {
        let result = builder()
            .state(DomainState::routing("route").route("done"))
            .guard(QUEUE_EMPTY, |_i: &Issue| true)
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::DuplicateGuard("queueEmpty".to_string()))
        );
    }

    #[test]
    fn routes_are_validated() {
        let unknown_guard = builder()
            .state(DomainState::routing("route").route_if("isStale", "done"))
            .build();
        assert!(matches!(unknown_guard, Err(BuildError::UnknownGuard { .. })));

        let unknown_target = builder()
            .state(DomainState::routing("route").route("nowhere"))
            .build();
        assert!(matches!(unknown_target, Err(BuildError::UnknownTarget { .. })));

        let internal_target = builder()
            .state(DomainState::routing("route").route("verifyingBatch"))
            .build();
        assert!(matches!(internal_target, Err(BuildError::InvalidTarget { .. })));

        let no_routes = builder().state(DomainState::routing("route")).build();
        assert_eq!(
            no_routes.err(),
            Some(BuildError::MissingRoutes("route".to_string()))
        );
    }

    #[test]
    fn runner_guards_are_always_available() {
        let result = builder()
            .state(
                DomainState::routing("route")
                    .route_if(MAX_CYCLES_REACHED, "done")
                    .route_if(QUEUE_EMPTY, "done")
                    .route("executingQueue"),
            )
            .build();

        assert!(result.is_ok());
    }

    #[test]
    fn zero_cycles_is_rejected() {
        let result = builder()
            .state(DomainState::routing("route").route("done"))
            .max_cycles(0)
            .build();

        assert_eq!(result.err(), Some(BuildError::InvalidMaxCycles));
    }

    #[test]
    fn incomplete_registry_is_rejected() {
        let partial: ActionRegistry<TestAction, Issue, ()> =
            ActionRegistry::with_definitions(Vec::new()).unwrap();
        let result = MachineBuilder::new(partial)
            .initial("route")
            .refresh(|issue: &Issue| pure(issue.clone()).boxed())
            .state(DomainState::routing("route").route("done"))
            .build();

        assert_eq!(
            result.err(),
            Some(BuildError::UnregisteredAction("Label".to_string()))
        );
    }

    #[test]
    fn compose_matches_builder() {
        let definition = compose(
            DomainConfig {
                initial: "route".to_string(),
                states: vec![DomainState::routing("route").route("done")],
                guards: vec![("isOpen".to_string(), Guard::new(|i: &Issue| i.open))],
            },
            registry(),
            Hooks::new(|issue: &Issue| pure(issue.clone()).boxed()),
            EngineConfig::default().label("triage"),
        )
        .unwrap();

        assert_eq!(definition.config().label, "triage");
        let run = RunState::new(Issue { open: true }, 1);
        assert_eq!(definition.check_guard("isOpen", &run), Some(true));
        assert_eq!(definition.check_guard(QUEUE_EMPTY, &run), Some(true));
        assert_eq!(definition.check_guard("missing", &run), None);
    }
}
