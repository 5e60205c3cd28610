pub mod editor;
pub mod identity;
pub mod interrupt;
pub mod session;
pub mod workspace;

pub use editor::Editor;
pub use identity::resolve_identities;
pub use interrupt::{Interrupt, Interrupted};
pub use session::{EditOutcome, SecretSession};
pub use workspace::Workspace;
