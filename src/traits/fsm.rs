/// A state machine driven one input at a time.
///
/// Transitions consume the current state and must not perform I/O; any side
/// effects are limited to the supplied context.
pub trait FiniteStateMachine {
    type Input;
    type Context;

    #[must_use]
    fn transition(self, input: Self::Input, context: &mut Self::Context) -> Self;
}
