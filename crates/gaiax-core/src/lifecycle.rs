use std::fmt;

use crate::error::CoreError;

/// The states of a Self-Description document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum DocumentState {
    /// Inputs are being collected, nothing has been produced yet.
    Draft,
    /// Unsigned document built from a service descriptor.
    Assembled,
    /// A trust-anchor proof has been attached.
    Signed,
    /// A conformity record from a clearing house has been merged.
    ConformityEnriched,
    /// Written to disk. Final state.
    Persisted,
}

impl DocumentState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Persisted)
    }

    /// Whether a validator may run on a document in this state.
    pub fn is_validatable(&self) -> bool {
        !matches!(self, Self::Draft)
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Draft => write!(f, "Draft"),
            Self::Assembled => write!(f, "Assembled"),
            Self::Signed => write!(f, "Signed"),
            Self::ConformityEnriched => write!(f, "ConformityEnriched"),
            Self::Persisted => write!(f, "Persisted"),
        }
    }
}

/// Events that move a document through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The assembler produced an unsigned document.
    Assemble,
    /// The proof signer attached a proof.
    Sign,
    /// A conformity record was merged.
    Enrich,
    /// The document was written out.
    Persist,
}

/// Enforces the document lifecycle.
///
/// Valid transitions:
/// - Draft → Assembled (Assemble)
/// - Assembled → Signed (Sign)
/// - Signed → ConformityEnriched (Enrich)
/// - Signed → Persisted (Persist)
/// - ConformityEnriched → Persisted (Persist)
pub struct DocumentLifecycle;

impl DocumentLifecycle {
    /// Attempt a state transition based on an event.
    pub fn transition(
        current: DocumentState,
        event: DocumentEvent,
    ) -> Result<DocumentState, CoreError> {
        let new_state = match (current, event) {
            (DocumentState::Draft, DocumentEvent::Assemble) => DocumentState::Assembled,
            (DocumentState::Assembled, DocumentEvent::Sign) => DocumentState::Signed,
            (DocumentState::Signed, DocumentEvent::Enrich) => DocumentState::ConformityEnriched,
            (DocumentState::Signed, DocumentEvent::Persist)
            | (DocumentState::ConformityEnriched, DocumentEvent::Persist) => {
                DocumentState::Persisted
            }
            _ => {
                let target = match event {
                    DocumentEvent::Assemble => DocumentState::Assembled,
                    DocumentEvent::Sign => DocumentState::Signed,
                    DocumentEvent::Enrich => DocumentState::ConformityEnriched,
                    DocumentEvent::Persist => DocumentState::Persisted,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "document state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: DocumentState, event: DocumentEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
