//! The Gift/Challenge Lifecycle Engine.
//!
//! - [`GiftLifecycle`]: the state machine. Creates gifts, applies
//!   submissions, and performs sender actions and the expiry sweep.
//! - [`ApprovalWorkflow`]: the photo/video human review sub-flow.
//! - [`InboundRouter`]: matches inbound SMS to one active challenge and
//!   produces the reply.
//!
//! Persistence, notification providers, and the event bus are injected
//! through [`LifecycleContext`].

pub mod approval;
pub mod context;
pub mod error;
pub mod expiry;
pub mod inbound;
pub mod state_machine;
pub mod tracking;

pub use approval::{ApprovalWorkflow, ReviewOutcome};
pub use context::{LifecycleContext, LifecycleSettings};
pub use error::{LifecycleError, LifecycleResult};
pub use inbound::{InboundMessage, InboundReply, InboundRouter};
pub use state_machine::{
    CreateGiftInput, CreatedGift, GiftLifecycle, SenderIdentity, SubmissionOrigin,
    SubmissionOutcome,
};
pub use tracking::{TrackingSubmission, TrackingView};
