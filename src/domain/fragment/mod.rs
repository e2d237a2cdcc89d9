//! Fragment domain - Dynamic regions inside cached pages

mod directive;
mod protocol;
mod registry;

pub use directive::{DirectiveKind, FragmentDirective, FragmentPayload, END_MARKER};
pub use protocol::{FragmentProtocol, Rehydrated};
pub use registry::{FragmentFn, FragmentRegistry};
