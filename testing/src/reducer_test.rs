//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use std::fmt::Debug;
use ticketchain_core::reducer::Reducer;

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for outcome assertion functions
type OutcomeAssertion<O, E> = Box<dyn FnOnce(&Result<O, E>)>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use ticketchain_testing::ReducerTest;
///
/// ReducerTest::new(SettlementReducer)
///     .with_env(CallContext { caller: organizer(), at: test_clock().now() })
///     .given_state(deployed())
///     .when_action(LedgerCall::CreateEvent(event_draft()))
///     .then_output(|applied| {
///         assert_eq!(applied.output, CallOutput::EventCreated(EventId::new(1)));
///     })
///     .then_state(|state| {
///         assert!(state.event(EventId::new(1)).is_some());
///     })
///     .run();
/// ```
pub struct ReducerTest<R>
where
    R: Reducer,
{
    reducer: R,
    environment: Option<R::Environment>,
    initial_state: Option<R::State>,
    action: Option<R::Action>,
    state_assertions: Vec<StateAssertion<R::State>>,
    outcome_assertions: Vec<OutcomeAssertion<R::Output, R::Error>>,
}

impl<R> ReducerTest<R>
where
    R: Reducer,
    R::Output: Debug + 'static,
    R::Error: Debug + PartialEq + 'static,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            action: None,
            state_assertions: Vec::new(),
            outcome_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: R::Environment) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Set the action to test (When)
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::State) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Expect the action to be applied and inspect its output (Then)
    #[must_use]
    #[allow(clippy::panic)] // Test assertion
    pub fn then_output<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&R::Output) + 'static,
    {
        self.outcome_assertions
            .push(Box::new(move |outcome: &Result<R::Output, R::Error>| {
                match outcome {
                    Ok(output) => assertion(output),
                    Err(error) => panic!("Expected the action to apply, but it was rejected: {error:?}"),
                }
            }));
        self
    }

    /// Expect the action to be rejected with exactly `expected` (Then)
    #[must_use]
    #[allow(clippy::panic)] // Test assertion
    pub fn then_rejected(mut self, expected: R::Error) -> Self {
        self.outcome_assertions
            .push(Box::new(move |outcome: &Result<R::Output, R::Error>| {
                match outcome {
                    Ok(output) => panic!("Expected rejection {expected:?}, but got {output:?}"),
                    Err(error) => assert_eq!(error, &expected),
                }
            }));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        let action = self.action.expect("Action must be set with when_action()");

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        // Execute reducer
        let outcome = self.reducer.reduce(&mut state, action, &env);

        // Run outcome assertions
        for assertion in self.outcome_assertions {
            assertion(&outcome);
        }

        // Run state assertions
        for assertion in self.state_assertions {
            assertion(&state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Overflow;

    struct CounterReducer;

    impl Reducer for CounterReducer {
        type State = u8;
        type Action = u8;
        type Environment = ();
        type Output = u8;
        type Error = Overflow;

        fn reduce(&self, state: &mut u8, by: u8, _env: &()) -> Result<u8, Overflow> {
            *state = state.checked_add(by).ok_or(Overflow)?;
            Ok(*state)
        }
    }

    #[test]
    fn test_applied_action() {
        ReducerTest::new(CounterReducer)
            .with_env(())
            .given_state(1)
            .when_action(2)
            .then_output(|output| assert_eq!(*output, 3))
            .then_state(|state| assert_eq!(*state, 3))
            .run();
    }

    #[test]
    fn test_rejected_action_keeps_state() {
        ReducerTest::new(CounterReducer)
            .with_env(())
            .given_state(250)
            .when_action(10)
            .then_rejected(Overflow)
            .then_state(|state| assert_eq!(*state, 250))
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected rejection")]
    fn test_unexpected_success_fails() {
        ReducerTest::new(CounterReducer)
            .with_env(())
            .given_state(0)
            .when_action(1)
            .then_rejected(Overflow)
            .run();
    }
}
