// Composition root.
//
// Responsibilities:
// - Read config from environment.
// - Instantiate concrete infrastructure implementations.
// - Wire implementations into handlers and the router.

pub mod http;
pub mod state;
