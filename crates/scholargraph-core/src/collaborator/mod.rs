//! External AI collaborator
//!
//! The workspace talks to the collaborator through [`ResearchCollaborator`].
//! [`LlmCollaborator`] calls a chat completion API; [`ScriptedCollaborator`]
//! replays canned replies for tests and offline use.

mod llm;
mod scripted;
mod traits;

pub use llm::LlmCollaborator;
pub use scripted::{CollaboratorCall, ScriptedCollaborator};
pub use traits::{
    DocumentElement, DocumentSource, ImageSource, ParsedDocument, ResearchCollaborator,
};
